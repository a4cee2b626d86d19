//! Error types for mltrack-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracking server error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Invalid repository identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid tracking URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    #[error("No tracking URI set; call init() or set_tracking_uri() first")]
    NotInitialized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, TrackingError>;
