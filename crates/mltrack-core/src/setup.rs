//! The setup routine: connect to the repository's tracking server and log a
//! first run holding one placeholder parameter and one placeholder metric.

use tracing::info;

use crate::client::TrackingClient;
use crate::error::Result;
use crate::models::{RepoIdentity, RunInfo};

pub const DEFAULT_OWNER: &str = "mewawalaabdeali";
pub const DEFAULT_REPO: &str = "MLOperation";

pub const PARAM_KEY: &str = "parameter name";
pub const PARAM_VALUE: &str = "value";
pub const METRIC_KEY: &str = "metric name";
pub const METRIC_VALUE: f64 = 1.0;

pub fn default_identity() -> RepoIdentity {
    RepoIdentity::new(DEFAULT_OWNER, DEFAULT_REPO)
}

/// Initialize `repo`, set its tracking URI and log one run. Errors from the
/// client are returned unchanged.
pub fn run(client: &mut TrackingClient, repo: &RepoIdentity) -> Result<RunInfo> {
    client.init(repo)?;

    let uri = repo.tracking_uri(client.config().host())?;
    client.set_tracking_uri(uri.as_str())?;

    let ((), info) = client.with_run(|run| {
        run.log_param(PARAM_KEY, PARAM_VALUE)?;
        run.log_metric(METRIC_KEY, METRIC_VALUE)?;
        Ok(())
    })?;

    info!(run_id = %info.run_id, uri = %uri, "Setup run logged");
    Ok(info)
}
