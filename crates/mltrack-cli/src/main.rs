//! mltrack CLI: connect a repository to its MLflow tracking server and log a
//! first run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mltrack_core::setup::{self, DEFAULT_OWNER, DEFAULT_REPO};
use mltrack_core::{RepoIdentity, RunInfo, TrackingClient, TrackingConfig};

#[derive(Parser)]
#[command(
    name = "mltrack",
    about = "Connect a DagsHub repository to MLflow tracking and log a first run",
    version,
    author,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments for the default `setup` command
    #[command(flatten)]
    setup: SetupArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the repository and log the placeholder run (default)
    Setup(SetupArgs),
    /// Print the tracking URI for a repository without contacting it
    Uri {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args, Clone)]
struct SetupArgs {
    #[command(flatten)]
    target: Target,
    /// YAML config file (host, experiment_id, run_name, credentials)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct Target {
    /// Repository owner
    #[arg(long, env = "MLTRACK_OWNER", default_value = DEFAULT_OWNER)]
    owner: String,
    /// Repository name
    #[arg(long, env = "MLTRACK_REPO", default_value = DEFAULT_REPO)]
    repo: String,
    /// Repository host (overrides config file and environment)
    #[arg(long)]
    host: Option<String>,
}

impl Target {
    fn identity(&self) -> RepoIdentity {
        RepoIdentity::new(&self.owner, &self.repo)
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Setup(args)) => cmd_setup(args)?,
        Some(Commands::Uri { target }) => cmd_uri(target)?,
        None => cmd_setup(cli.setup)?,
    }

    Ok(())
}

// ─── Command implementations ──────────────────────────────────────────────────

fn load_config(path: Option<PathBuf>, host: Option<String>) -> Result<TrackingConfig> {
    let mut config = match path {
        Some(path) => TrackingConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TrackingConfig::default(),
    };
    config.apply_env();
    if let Some(host) = host {
        config.host = host;
    }
    Ok(config)
}

fn cmd_setup(args: SetupArgs) -> Result<()> {
    let SetupArgs { target, config } = args;
    let config = load_config(config, target.host.clone())?;
    let repo = target.identity();
    info!(repo = %repo, host = %config.host(), "Running setup");
    let mut client = TrackingClient::new(config)?;

    let info = setup::run(&mut client, &repo)
        .with_context(|| format!("Setup failed for {}", repo))?;

    let uri = client
        .tracking_uri()
        .map(|u| u.to_string())
        .unwrap_or_default();
    print_run(&repo, &uri, &info);
    Ok(())
}

fn cmd_uri(target: Target) -> Result<()> {
    let config = load_config(None, target.host.clone())?;
    let uri = target.identity().tracking_uri(config.host())?;
    println!("{}", uri);
    Ok(())
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn print_run(repo: &RepoIdentity, uri: &str, info: &RunInfo) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Field", "Value"]);
    table.add_row(["Repository", repo.to_string().as_str()]);
    table.add_row(["Tracking URI", uri]);
    table.add_row(["Run", info.run_id.as_str()]);
    table.add_row(["Experiment", info.experiment_id.as_str()]);
    table.add_row(["Status", info.status.to_string().as_str()]);
    let started = info
        .started_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    table.add_row(["Started", started.as_str()]);
    let duration = info
        .duration_secs()
        .map(|d| format!("{:.1}s", d))
        .unwrap_or_else(|| "-".to_string());
    table.add_row(["Duration", duration.as_str()]);
    println!("{}", table);
}
