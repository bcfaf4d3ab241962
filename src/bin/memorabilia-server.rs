//! Memorabilia Server Binary
//!
//! In-memory key-value server with scheduled TTL cleanup.

use clap::Parser;
use memorabilia::schedule::validate_interval;
use memorabilia::server::{Config, Server, DEFAULT_CLEANUP_INTERVAL};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Memorabilia Server - In-Memory Key-Value Store
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "MEMORABILIA_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port number
    #[arg(short, long, env = "MEMORABILIA_PORT", default_value_t = 50051)]
    port: u16,

    /// Interval between expired-key sweeps, e.g. 4s, 1m30s, 2h
    #[arg(long, env = "MEMORABILIA_CLEANUP_INTERVAL", default_value = DEFAULT_CLEANUP_INTERVAL)]
    cleanup_interval: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("memorabilia=info".parse()?))
        .init();

    let args = Args::parse();
    validate_interval(&args.cleanup_interval)?;

    let config = Config::default()
        .with_bind(&args.bind)
        .with_port(args.port)
        .with_cleanup_interval(&args.cleanup_interval);

    info!(
        "Starting Memorabilia server on {}:{}",
        args.bind, args.port
    );

    Server::new(config).run(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
