//! wiremock stub of a repository host with an MLflow tracking server.
//!
//! The client under test is synchronous and owns its own runtime, so the
//! stub keeps a separate runtime for mounting mocks and reading back the
//! requests it received.

#![allow(dead_code)]

use mltrack_core::{TrackingClient, TrackingConfig};
use serde_json::{json, Value};
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const RUN_ID: &str = "run-0001";

pub struct Stub {
    pub server: MockServer,
    rt: Runtime,
}

impl Stub {
    pub fn start() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn client(&self) -> TrackingClient {
        let config = TrackingConfig::default()
            .with_host(self.uri())
            .with_token("mock-test-token");
        TrackingClient::new(config).unwrap()
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    /// `GET /api/v1/repos/{owner}/{name}` answering `status`.
    pub fn repo(&self, owner: &str, name: &str, status: u16) {
        self.mount(
            Mock::given(method("GET"))
                .and(path(format!("/api/v1/repos/{}/{}", owner, name)))
                .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                    "owner": { "username": owner },
                    "name": name,
                }))),
        );
    }

    /// Mount the run endpoints for `{owner}/{name}.mlflow`, all succeeding.
    pub fn tracking(&self, owner: &str, name: &str) {
        self.create_run(owner, name);
        self.update_run(owner, name);
        for endpoint in ["log-parameter", "log-metric", "log-batch", "set-tag"] {
            self.ok(owner, name, endpoint);
        }
    }

    pub fn create_run(&self, owner: &str, name: &str) {
        self.mount(
            Mock::given(method("POST"))
                .and(path(mlflow_path(owner, name, "runs/create")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "run": {
                        "info": run_info("RUNNING", None),
                        "data": {},
                    }
                }))),
        );
    }

    pub fn update_run(&self, owner: &str, name: &str) {
        self.mount(
            Mock::given(method("POST"))
                .and(path(mlflow_path(owner, name, "runs/update")))
                .respond_with(EchoUpdate),
        );
    }

    pub fn ok(&self, owner: &str, name: &str, endpoint: &str) {
        self.mount(
            Mock::given(method("POST"))
                .and(path(mlflow_path(owner, name, &format!("runs/{}", endpoint))))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({}))),
        );
    }

    pub fn fail(&self, owner: &str, name: &str, endpoint: &str, status: u16) {
        self.mount(
            Mock::given(method("POST"))
                .and(path(mlflow_path(owner, name, &format!("runs/{}", endpoint))))
                .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                    "error_code": "INTERNAL_ERROR",
                    "message": "boom",
                }))),
        );
    }

    pub fn requests(&self) -> Vec<Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    /// JSON bodies of the requests received on `endpoint` (e.g. "runs/update").
    pub fn bodies(&self, endpoint: &str) -> Vec<Value> {
        let suffix = format!("/api/2.0/mlflow/{}", endpoint);
        self.requests()
            .into_iter()
            .filter(|r| r.url.path().ends_with(&suffix))
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
            .collect()
    }
}

pub fn mlflow_path(owner: &str, name: &str, endpoint: &str) -> String {
    format!("/{}/{}.mlflow/api/2.0/mlflow/{}", owner, name, endpoint)
}

fn run_info(status: &str, end_time: Option<i64>) -> Value {
    let mut info = json!({
        "run_id": RUN_ID,
        "run_uuid": RUN_ID,
        "run_name": "stub-run",
        "experiment_id": "0",
        "status": status,
        "start_time": 1_700_000_000_000i64,
        "artifact_uri": "mlflow-artifacts:/0/run-0001/artifacts",
        "lifecycle_stage": "active",
    });
    if let Some(end) = end_time {
        info["end_time"] = json!(end);
    }
    info
}

/// Answers `runs/update` with the status and end time it was sent.
struct EchoUpdate;

impl Respond for EchoUpdate {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let status = body["status"].as_str().unwrap_or("FINISHED");
        let end_time = body["end_time"].as_i64();
        ResponseTemplate::new(200).set_body_json(json!({ "run_info": run_info(status, end_time) }))
    }
}
