//! Async REST calls: the repository host's API and the MLflow tracking API.
//!
//! Every call is a single request with no retries. Status codes are
//! classified into [`TrackingError`] variants, everything else is passed
//! through as [`TrackingError::Api`].

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::TrackingConfig;
use crate::credentials::Credentials;
use crate::error::{Result, TrackingError};
use crate::models::{Metric, Param, RepoIdentity, RunInfo, RunStatus};

const MLFLOW_API: &str = "api/2.0/mlflow";

/// A run tag as the tracking server expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

impl RunTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunEnvelope,
}

#[derive(Deserialize)]
struct RunEnvelope {
    info: RunInfo,
}

#[derive(Deserialize)]
struct UpdateRunResponse {
    run_info: RunInfo,
}

/// HTTP client shared by all calls, with credentials attached per request.
pub struct RestApi {
    http: Client,
    credentials: Credentials,
}

impl RestApi {
    pub fn new(config: &TrackingConfig, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("mltrack/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credentials })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `GET {host}/api/v1/repos/{owner}/{name}`: succeeds when the repository
    /// exists and is visible with the current credentials.
    pub async fn check_repo(&self, host: &str, repo: &RepoIdentity) -> Result<()> {
        let url = repo_api_url(host, repo);
        debug!(%url, "Checking repository");
        let request = self.credentials.apply(self.http.get(&url));
        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TrackingError::RepoNotFound(repo.to_string())),
            _ => check(response).await.map(|_| ()),
        }
    }

    pub async fn create_run(
        &self,
        tracking_uri: &Url,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &[RunTag],
    ) -> Result<RunInfo> {
        let mut body = json!({
            "experiment_id": experiment_id,
            "start_time": start_time,
            "tags": tags,
        });
        if let Some(name) = run_name {
            body["run_name"] = json!(name);
        }
        let resp: CreateRunResponse = self.post_json(tracking_uri, "runs/create", &body).await?;
        Ok(resp.run.info)
    }

    pub async fn update_run(
        &self,
        tracking_uri: &Url,
        run_id: &str,
        status: RunStatus,
        end_time: i64,
    ) -> Result<RunInfo> {
        let body = json!({
            "run_id": run_id,
            "status": status,
            "end_time": end_time,
        });
        let resp: UpdateRunResponse = self.post_json(tracking_uri, "runs/update", &body).await?;
        Ok(resp.run_info)
    }

    pub async fn log_param(&self, tracking_uri: &Url, run_id: &str, param: &Param) -> Result<()> {
        let body = json!({
            "run_id": run_id,
            "key": param.key,
            "value": param.value,
        });
        self.post(tracking_uri, "runs/log-parameter", &body).await
    }

    pub async fn log_metric(&self, tracking_uri: &Url, run_id: &str, metric: &Metric) -> Result<()> {
        let body = json!({
            "run_id": run_id,
            "key": metric.key,
            "value": metric.value,
            "timestamp": metric.timestamp_ms,
            "step": metric.step,
        });
        self.post(tracking_uri, "runs/log-metric", &body).await
    }

    pub async fn log_batch(
        &self,
        tracking_uri: &Url,
        run_id: &str,
        params: &[Param],
        metrics: &[Metric],
    ) -> Result<()> {
        let body = json!({
            "run_id": run_id,
            "params": params,
            "metrics": metrics,
            "tags": [],
        });
        self.post(tracking_uri, "runs/log-batch", &body).await
    }

    pub async fn set_tag(&self, tracking_uri: &Url, run_id: &str, tag: &RunTag) -> Result<()> {
        let body = json!({
            "run_id": run_id,
            "key": tag.key,
            "value": tag.value,
        });
        self.post(tracking_uri, "runs/set-tag", &body).await
    }

    async fn post(&self, tracking_uri: &Url, endpoint: &str, body: &serde_json::Value) -> Result<()> {
        self.send(tracking_uri, endpoint, body).await.map(|_| ())
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        tracking_uri: &Url,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self.send(tracking_uri, endpoint, body).await?;
        Ok(response.json().await?)
    }

    async fn send(&self, tracking_uri: &Url, endpoint: &str, body: &serde_json::Value) -> Result<Response> {
        let url = endpoint_url(tracking_uri, endpoint);
        debug!(%url, "POST");
        let request = self.credentials.apply(self.http.post(&url)).json(body);
        let response = request.send().await?;
        check(response).await
    }
}

/// `{host}/api/v1/repos/{owner}/{name}` with encoded segments.
pub fn repo_api_url(host: &str, repo: &RepoIdentity) -> String {
    let (owner, name) = repo.encoded();
    format!("{}/api/v1/repos/{}/{}", host.trim_end_matches('/'), owner, name)
}

/// `{tracking_uri}/api/2.0/mlflow/{endpoint}`.
pub fn endpoint_url(tracking_uri: &Url, endpoint: &str) -> String {
    format!(
        "{}/{}/{}",
        tracking_uri.as_str().trim_end_matches('/'),
        MLFLOW_API,
        endpoint
    )
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(TrackingError::Auth(format!("{}: {}", status, body)))
        }
        _ => Err(TrackingError::Api {
            status: status.as_u16(),
            body,
        }),
    }
}
