//! Credential resolution: explicit token, basic auth, then the on-disk token
//! cache written by the hosting service's login flow.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::TrackingConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Basic { username: String, password: String },
    Anonymous,
}

#[derive(Debug, Deserialize)]
struct CachedToken {
    access_token: String,
}

impl Credentials {
    /// Resolve credentials for `config.host`. Never fails on a missing
    /// cache file; an unreadable or malformed one is an error.
    pub fn resolve(config: &TrackingConfig) -> Result<Self> {
        if let Some(token) = &config.token {
            return Ok(Credentials::Token(token.clone()));
        }
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            return Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        let cache = config.token_cache.clone().or_else(default_token_cache);
        if let Some(path) = cache {
            if let Some(token) = load_cached_token(&path, config.host())? {
                debug!(cache = %path.display(), "Using cached token");
                return Ok(Credentials::Token(token));
            }
        }
        Ok(Credentials::Anonymous)
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Anonymous => request,
        }
    }

    /// Username to record on new runs, when one is known.
    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::Basic { username, .. } => Some(username),
            _ => None,
        }
    }
}

/// `$XDG_CACHE_HOME/dagshub/tokens`, else `$HOME/.cache/dagshub/tokens`.
pub fn default_token_cache() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))?;
    Some(base.join("dagshub").join("tokens"))
}

/// The cache maps a host to a list of tokens; the first one is used. Other
/// top-level keys (e.g. `version`) are ignored.
fn load_cached_token(path: &Path, host: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let cache: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)?;
    let entry = match cache.get(host).or_else(|| cache.get(&format!("{}/", host))) {
        Some(entry) => entry.clone(),
        None => return Ok(None),
    };
    let tokens: Vec<CachedToken> = serde_yaml::from_value(entry)?;
    Ok(tokens.into_iter().next().map(|t| t.access_token))
}
