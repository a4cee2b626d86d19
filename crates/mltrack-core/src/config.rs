//! Client configuration: defaults, optional YAML file, environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

pub const DEFAULT_HOST: &str = "https://dagshub.com";
pub const DEFAULT_EXPERIMENT_ID: &str = "0";

pub const ENV_HOST: &str = "DAGSHUB_CLIENT_HOST";
pub const ENV_USER_TOKEN: &str = "DAGSHUB_USER_TOKEN";
pub const ENV_EXPERIMENT_ID: &str = "MLFLOW_EXPERIMENT_ID";
pub const ENV_RUN_NAME: &str = "MLFLOW_RUN_NAME";
pub const ENV_TRACKING_TOKEN: &str = "MLFLOW_TRACKING_TOKEN";
pub const ENV_TRACKING_USERNAME: &str = "MLFLOW_TRACKING_USERNAME";
pub const ENV_TRACKING_PASSWORD: &str = "MLFLOW_TRACKING_PASSWORD";
pub const ENV_TOKEN_CACHE: &str = "MLTRACK_TOKEN_CACHE";

/// Configuration for a [`TrackingClient`](crate::TrackingClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Repository host (e.g. "https://dagshub.com")
    pub host: String,
    /// MLflow experiment new runs are created in (default: "0")
    pub experiment_id: String,
    /// Display name for new runs (server picks one if None)
    pub run_name: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Bearer token
    pub token: Option<String>,
    /// Basic-auth username, used together with `password`
    pub username: Option<String>,
    pub password: Option<String>,
    /// YAML token cache to fall back on (default: ~/.cache/dagshub/tokens)
    pub token_cache: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            experiment_id: DEFAULT_EXPERIMENT_ID.to_string(),
            run_name: None,
            timeout_secs: 30,
            token: None,
            username: None,
            password: None,
            token_cache: None,
        }
    }
}

impl TrackingConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a YAML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Override fields from the process environment. Unset or empty
    /// variables leave the current value alone.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.host = host;
        }
        if let Some(id) = get(ENV_EXPERIMENT_ID) {
            self.experiment_id = id;
        }
        if let Some(name) = get(ENV_RUN_NAME) {
            self.run_name = Some(name);
        }
        // The hosting service's own token wins over the generic MLflow one.
        if let Some(token) = get(ENV_USER_TOKEN).or_else(|| get(ENV_TRACKING_TOKEN)) {
            self.token = Some(token);
        }
        if let Some(user) = get(ENV_TRACKING_USERNAME) {
            self.username = Some(user);
        }
        if let Some(pass) = get(ENV_TRACKING_PASSWORD) {
            self.password = Some(pass);
        }
        if let Some(cache) = get(ENV_TOKEN_CACHE) {
            self.token_cache = Some(PathBuf::from(cache));
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_experiment_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_id = id.into();
        self
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = Some(run_name.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Host without a trailing slash.
    pub fn host(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TrackingError::Config("host must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(TrackingError::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}
