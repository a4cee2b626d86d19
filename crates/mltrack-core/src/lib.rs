//! mltrack-core: client for DagsHub-hosted MLflow tracking servers.
//!
//! `TrackingClient::init()` registers a repository and points the client at
//! its tracking endpoint. `start_run()` hands out an `ActiveRun` guard that
//! ends the run exactly once, whether the caller finishes, fails or panics.

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod session;
pub mod setup;

pub use client::TrackingClient;
pub use config::TrackingConfig;
pub use credentials::Credentials;
pub use error::TrackingError;
pub use models::{Metric, Param, RepoIdentity, RunInfo, RunStatus, SessionState};
pub use session::ActiveRun;
