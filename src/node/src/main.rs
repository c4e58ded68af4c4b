//! Vigil agent node - main binary
//!
//! One fabric member: detector, case coordinator, peer endpoint, trust
//! engine and durability layer over a static peer set.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

mod config;
mod node;
mod scanner;

use config::NodeSettings;
use node::NodeRuntime;

/// Vigil agent node CLI
#[derive(Parser)]
#[command(name = "vigil-node")]
#[command(about = "Vigil - cooperative host-security fabric node")]
#[command(version)]
struct Cli {
    /// This node's stable name
    #[arg(long, env = "NODE_NAME")]
    node_name: String,

    /// Comma-separated peer names
    #[arg(long, env = "PEERS", default_value = "")]
    peers: String,

    /// Peer endpoint port
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Directory for the checkpoint and WAL
    #[arg(long, env = "DATA_DIR", default_value = "/data")]
    data_dir: PathBuf,

    /// Enable the adversarial test profile
    #[arg(long, env = "ATTACK_MODE", default_value = "false")]
    attack_mode: bool,

    /// Administrative controller base URL
    #[arg(long, env = "CONTROLLER_URL")]
    controller_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{log_level},vigil=debug").into()),
        )
        .with_target(true)
        .init();

    info!("starting vigil node v{}", env!("CARGO_PKG_VERSION"));

    let settings = NodeSettings {
        name: cli.node_name,
        peers: NodeSettings::parse_peers(&cli.peers),
        port: cli.port,
        data_dir: cli.data_dir,
        attack_mode: cli.attack_mode,
        controller_url: cli.controller_url,
    };
    settings.validate()?;

    let mut runtime = NodeRuntime::new(settings)?;

    let outcome = tokio::select! {
        result = runtime.run() => result,
        _ = signal::ctrl_c() => {
            info!("received shutdown signal (Ctrl+C)");
            Ok(())
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal (SIGTERM)");
            Ok(())
        }
    };
    runtime.shutdown();
    outcome?;

    info!("node stopped");
    Ok(())
}

/// Cross-platform shutdown signal handling
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    sigterm.recv().await;
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    std::future::pending::<()>().await
}
