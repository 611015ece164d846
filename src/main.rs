use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use netwarden::admission::{spawn_sweeper, AdmissionEngine, AdmissionPolicy};
use netwarden::config::NetwardenConfig;
use netwarden::http::HttpServer;

/// Per-network admission control in front of an HTTP service.
#[derive(Parser, Debug)]
#[command(name = "netwarden", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the file and environment
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Netwarden Admission Control Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = NetwardenConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    info!(
        listen_addr = %config.server.listen_addr,
        limit_per_minute = config.limits.limit_per_minute,
        cooldown_minutes = config.limits.cooldown_minutes,
        clean_period_minutes = config.limits.clean_period_minutes,
        netmask = config.limits.netmask,
        "Configuration loaded"
    );

    let engine = Arc::new(AdmissionEngine::new(AdmissionPolicy::from(&config.limits)));

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        Arc::clone(&engine),
        config.limits.clean_period(),
        shutdown.clone(),
    );

    let server = HttpServer::bind(config.server.listen_addr, engine).await?;
    let result = server.serve_with_shutdown(shutdown_signal()).await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!(error = %e, "Sweeper task failed");
    }

    result?;
    info!("Netwarden Admission Control Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
