//! Synchronous tracking client.
//!
//! `TrackingClient::new()` builds a dedicated tokio runtime; every public call
//! drives one async request on it with `block_on` and returns when the server
//! has answered. The client owns the "current tracking endpoint", which
//! `init()` and `set_tracking_uri()` overwrite (last write wins).

use std::future::Future;

use chrono::Utc;
use tokio::runtime::Runtime;
use tracing::info;
use url::Url;

use crate::api::{RestApi, RunTag};
use crate::config::TrackingConfig;
use crate::credentials::Credentials;
use crate::error::{Result, TrackingError};
use crate::models::{RepoIdentity, RunInfo, RunStatus};
use crate::session::ActiveRun;

pub const TAG_SOURCE_NAME: &str = "mlflow.source.name";
pub const TAG_SOURCE_TYPE: &str = "mlflow.source.type";
pub const TAG_USER: &str = "mlflow.user";

pub struct TrackingClient {
    api: RestApi,
    runtime: Runtime,
    config: TrackingConfig,
    repo: Option<RepoIdentity>,
    tracking_uri: Option<Url>,
}

impl TrackingClient {
    /// Create a client for the given config. Resolves credentials but makes
    /// no network calls.
    pub fn new(config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        let credentials = Credentials::resolve(&config)?;
        let api = RestApi::new(&config, credentials)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mltrack-io")
            .enable_all()
            .build()
            .map_err(|e| TrackingError::Runtime(e.to_string()))?;

        Ok(Self {
            api,
            runtime,
            config,
            repo: None,
            tracking_uri: None,
        })
    }

    /// Register the repository with the client: verify it exists on the host
    /// and point the client at its tracking endpoint.
    pub fn init(&mut self, repo: &RepoIdentity) -> Result<Url> {
        if repo.owner.trim().is_empty() {
            return Err(TrackingError::InvalidIdentity(
                "repository owner must not be empty".into(),
            ));
        }
        if repo.name.trim().is_empty() {
            return Err(TrackingError::InvalidIdentity(
                "repository name must not be empty".into(),
            ));
        }

        let host = self.config.host().to_string();
        self.block_on(self.api.check_repo(&host, repo))?;

        let uri = repo.tracking_uri(&host)?;
        if let Some(previous) = &self.repo {
            if previous != repo {
                info!(previous = %previous, repo = %repo, "Re-initializing with a different repository");
            }
        }
        info!(repo = %repo, uri = %uri, "Repository initialized");
        self.repo = Some(repo.clone());
        self.tracking_uri = Some(uri.clone());
        Ok(uri)
    }

    /// Point the client at an explicit tracking endpoint.
    pub fn set_tracking_uri(&mut self, uri: &str) -> Result<Url> {
        let uri = Url::parse(uri)?;
        info!(uri = %uri, "Tracking URI set");
        self.tracking_uri = Some(uri.clone());
        Ok(uri)
    }

    pub fn tracking_uri(&self) -> Option<&Url> {
        self.tracking_uri.as_ref()
    }

    pub fn repo(&self) -> Option<&RepoIdentity> {
        self.repo.as_ref()
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Open a run on the current endpoint. The returned guard closes the run
    /// when it goes out of scope.
    pub fn start_run(&self) -> Result<ActiveRun<'_>> {
        let uri = self
            .tracking_uri
            .clone()
            .ok_or(TrackingError::NotInitialized)?;

        let tags = self.default_tags();
        let info = self.block_on(self.api.create_run(
            &uri,
            &self.config.experiment_id,
            self.config.run_name.as_deref(),
            Utc::now().timestamp_millis(),
            &tags,
        ))?;

        info!(run_id = %info.run_id, experiment = %info.experiment_id, "Run started");
        Ok(ActiveRun::new(self, uri, info))
    }

    /// Run `f` inside a run. The run ends `FINISHED` when `f` returns `Ok`
    /// and `FAILED` when it returns `Err` or panics; either way it is ended
    /// exactly once. Returns `f`'s value together with the final run info.
    pub fn with_run<T, F>(&self, f: F) -> Result<(T, RunInfo)>
    where
        F: FnOnce(&ActiveRun<'_>) -> Result<T>,
    {
        let run = self.start_run()?;
        match f(&run) {
            Ok(value) => {
                let info = run.end(RunStatus::Finished)?;
                Ok((value, info))
            }
            Err(e) => {
                if let Err(end_err) = run.end(RunStatus::Failed) {
                    tracing::error!("Failed to end run after error: {}", end_err);
                }
                Err(e)
            }
        }
    }

    pub(crate) fn api(&self) -> &RestApi {
        &self.api
    }

    /// Drive `fut` to completion on the client's runtime. Refuses to nest
    /// inside another runtime instead of panicking.
    pub(crate) fn block_on<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(TrackingError::Runtime(
                "TrackingClient cannot be used from inside an async runtime".into(),
            ));
        }
        self.runtime.block_on(fut)
    }

    fn default_tags(&self) -> Vec<RunTag> {
        let mut tags = vec![RunTag::new(TAG_SOURCE_TYPE, "LOCAL")];
        if let Some(program) = std::env::args().next() {
            tags.push(RunTag::new(TAG_SOURCE_NAME, program));
        }
        let user = self
            .api
            .credentials()
            .username()
            .map(str::to_string)
            .or_else(|| std::env::var("USER").ok());
        if let Some(user) = user {
            tags.push(RunTag::new(TAG_USER, user));
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> TrackingClient {
        let config = TrackingConfig::default()
            .with_host("http://127.0.0.1:9")
            .with_token("test");
        TrackingClient::new(config).unwrap()
    }

    #[test]
    fn starts_uninitialized() {
        let client = offline_client();
        assert!(client.tracking_uri().is_none());
        assert!(matches!(
            client.start_run(),
            Err(TrackingError::NotInitialized)
        ));
    }

    #[test]
    fn set_tracking_uri_last_write_wins() {
        let mut client = offline_client();
        client
            .set_tracking_uri("https://dagshub.com/first/MLOperation.mlflow")
            .unwrap();
        client
            .set_tracking_uri("https://dagshub.com/second/MLOperation.mlflow")
            .unwrap();
        assert_eq!(
            client.tracking_uri().unwrap().as_str(),
            "https://dagshub.com/second/MLOperation.mlflow"
        );
    }

    #[test]
    fn set_tracking_uri_rejects_garbage() {
        let mut client = offline_client();
        assert!(matches!(
            client.set_tracking_uri("not a uri"),
            Err(TrackingError::InvalidUri(_))
        ));
        assert!(client.tracking_uri().is_none());
    }

    #[test]
    fn init_rejects_empty_identity_without_network() {
        let mut client = offline_client();
        for (owner, name) in [("", "MLOperation"), ("owner", "  ")] {
            let err = client.init(&RepoIdentity::new(owner, name)).unwrap_err();
            assert!(matches!(err, TrackingError::InvalidIdentity(_)));
        }
        assert!(client.tracking_uri().is_none());
    }

    #[tokio::test]
    async fn refuses_to_block_inside_a_runtime() {
        let client = tokio::task::spawn_blocking(offline_client).await.unwrap();
        let err = client.block_on(async { Ok(()) }).unwrap_err();
        assert!(matches!(err, TrackingError::Runtime(_)));
        // Runtime must not be dropped inside an async context.
        tokio::task::spawn_blocking(move || drop(client)).await.unwrap();
    }
}
