//! tierd — the Tiergate daemon.
//!
//! Single binary that assembles all Tiergate subsystems:
//! - State store (redb): active tier + session bindings
//! - Capacity planner: scale-up / scale-down watch loops
//! - Routing REST API (axum)
//!
//! Request-plane log events are written to a file inside the monitored
//! log directory; that file is the load signal the capacity planner
//! samples. Control-plane events go to stdout only, so the planner never
//! reads its own output as traffic.
//!
//! # Usage
//!
//! ```text
//! tierd serve --port 8000 --data-dir ./data --log-dir .logs
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tiergate_api::{ApiState, build_router};
use tiergate_capacity::{CapacityConfig, CapacityPlanner};
use tiergate_state::StateStore;

#[derive(Parser)]
#[command(name = "tierd", about = "Tiergate daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the routing API and the capacity planner in one process.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Directory for request logs (the capacity planner's signal source).
        #[arg(long, default_value = ".logs")]
        log_dir: PathBuf,

        /// Optional capacity config file (toml).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            log_dir,
            config,
        } => run_serve(port, data_dir, log_dir, config).await,
    }
}

/// Install the layered subscriber: everything to stdout, request-plane
/// events additionally into the monitored log directory.
fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    let request_log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("requests.log"))?;

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,tierd=debug,tiergate=debug".parse().unwrap()),
    );

    let request_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(request_log))
        .with_filter(Targets::new().with_target("tiergate_api", tracing::Level::INFO));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(request_layer)
        .init();
    Ok(())
}

async fn run_serve(
    port: u16,
    data_dir: PathBuf,
    log_dir: PathBuf,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&log_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    init_tracing(&log_dir)?;

    info!("tierd starting");

    let mut capacity_config = match &config {
        Some(path) => CapacityConfig::from_file(path)?,
        None => CapacityConfig::default(),
    };
    capacity_config.log_dir = log_dir.clone();

    // ── Initialize subsystems ──────────────────────────────────

    let store = StateStore::open(&data_dir.join("tiergate.redb"))?;
    if !store.health_check() {
        anyhow::bail!("state store failed its health check; refusing to start");
    }
    info!(path = ?data_dir.join("tiergate.redb"), "state store opened");

    let planner = Arc::new(CapacityPlanner::new(store.clone(), &capacity_config));
    planner.start().await;

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState::new(store, planner.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });

    server.await?;

    planner.stop().await;
    info!("tierd stopped");
    Ok(())
}
