//! Scoped logging session.
//!
//! An `ActiveRun` is only obtained from [`TrackingClient::start_run`] and
//! ends its run exactly once: explicitly through [`ActiveRun::end`], or on
//! drop.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{error, info, warn};
use url::Url;

use crate::api::RunTag;
use crate::client::TrackingClient;
use crate::error::Result;
use crate::models::{Metric, Param, RunInfo, RunStatus, SessionState};

pub struct ActiveRun<'a> {
    client: &'a TrackingClient,
    tracking_uri: Url,
    info: RunInfo,
    state: SessionState,
}

impl<'a> ActiveRun<'a> {
    pub(crate) fn new(client: &'a TrackingClient, tracking_uri: Url, info: RunInfo) -> Self {
        Self {
            client,
            tracking_uri,
            info,
            state: SessionState::Open,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Endpoint the run was opened on. Later `set_tracking_uri` calls on the
    /// client do not move an open run.
    pub fn tracking_uri(&self) -> &Url {
        &self.tracking_uri
    }

    pub fn log_param(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let param = Param::new(key, value);
        self.client
            .block_on(self.client.api().log_param(&self.tracking_uri, self.run_id(), &param))
    }

    pub fn log_metric(&self, key: impl Into<String>, value: f64) -> Result<()> {
        self.log_metric_at(key, value, 0)
    }

    pub fn log_metric_at(&self, key: impl Into<String>, value: f64, step: i64) -> Result<()> {
        let metric = Metric::new(key, value, step);
        self.client
            .block_on(self.client.api().log_metric(&self.tracking_uri, self.run_id(), &metric))
    }

    /// Log several params in one request. Nothing is sent for an empty map.
    pub fn log_params(&self, params: HashMap<String, String>) -> Result<()> {
        if params.is_empty() {
            return Ok(());
        }
        let mut params: Vec<Param> = params.into_iter().map(|(k, v)| Param::new(k, v)).collect();
        params.sort_by(|a, b| a.key.cmp(&b.key));
        self.client.block_on(
            self.client
                .api()
                .log_batch(&self.tracking_uri, self.run_id(), &params, &[]),
        )
    }

    /// Log several metrics at the same step in one request.
    pub fn log_metrics(&self, metrics: HashMap<String, f64>, step: Option<i64>) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let step = step.unwrap_or(0);
        let mut metrics: Vec<Metric> = metrics
            .into_iter()
            .map(|(k, v)| Metric::new(k, v, step))
            .collect();
        metrics.sort_by(|a, b| a.key.cmp(&b.key));
        self.client.block_on(
            self.client
                .api()
                .log_batch(&self.tracking_uri, self.run_id(), &[], &metrics),
        )
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let tag = RunTag::new(key, value);
        self.client
            .block_on(self.client.api().set_tag(&self.tracking_uri, self.run_id(), &tag))
    }

    /// End the run with `status`. Consumes the guard, so the run cannot be
    /// ended twice.
    pub fn end(mut self, status: RunStatus) -> Result<RunInfo> {
        self.finalize(status)
    }

    // Marks the session closed before the request goes out: a failed
    // update is not retried from Drop.
    fn finalize(&mut self, status: RunStatus) -> Result<RunInfo> {
        self.state = SessionState::Closed;
        let end_time = Utc::now().timestamp_millis();
        let info = self.client.block_on(self.client.api().update_run(
            &self.tracking_uri,
            &self.info.run_id,
            status,
            end_time,
        ))?;
        info!(run_id = %info.run_id, status = %info.status, "Run ended");
        self.info = info.clone();
        Ok(info)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let status = if std::thread::panicking() {
            warn!(run_id = %self.info.run_id, "Ending run after panic");
            RunStatus::Failed
        } else {
            RunStatus::Finished
        };
        if let Err(e) = self.finalize(status) {
            error!("Failed to end run {}: {}", self.info.run_id, e);
        }
    }
}
