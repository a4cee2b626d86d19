//! Example of using mltrack-core directly from Rust.

use mltrack_core::{RepoIdentity, TrackingClient, TrackingConfig};
use std::collections::HashMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration from the environment (token, host, experiment)
    let config = TrackingConfig::from_env().with_run_name("rust_example");

    // 2. Register the repository and point the client at its tracking server
    let mut client = TrackingClient::new(config)?;
    let uri = client.init(&RepoIdentity::new("mewawalaabdeali", "MLOperation"))?;
    println!("Tracking to {}", uri);

    // 3. Log inside a run; it is ended when the closure returns
    let ((), info) = client.with_run(|run| {
        let mut params = HashMap::new();
        params.insert("language".to_string(), "Rust".to_string());
        run.log_params(params)?;

        for step in 0..10 {
            run.log_metric_at("sine", (step as f64 * 0.1).sin(), step)?;
        }
        Ok(())
    })?;

    println!("Run {} ended {}", info.run_id, info.status);
    Ok(())
}
