use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use contactgate::config::ContactGateConfig;
use contactgate::contact::{build_mailer, ContactService};
use contactgate::http::HttpServer;
use contactgate::ratelimit::{BackoffRateLimiter, CleanupTask};

/// Contact form backend with incremental-backoff rate limiting.
#[derive(Parser, Debug)]
#[command(name = "contactgate", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Contactgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = ContactGateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    info!(
        http_addr = %config.server.http_addr,
        mail_provider = ?config.mail.provider,
        "Configuration loaded"
    );

    // Initialize the rate limiter
    let policy = config.rate_limiting.policy()?;
    info!(
        max_attempts = policy.max_attempts,
        base_window_ms = policy.base_window.as_millis() as u64,
        max_backoff_ms = policy.max_backoff.as_millis() as u64,
        "Rate limiter initialized"
    );
    let rate_limiter = Arc::new(BackoffRateLimiter::new(policy));
    let cleanup = CleanupTask::spawn(Arc::clone(&rate_limiter), config.server.cleanup_interval());

    let mailer = build_mailer(&config.mail)?;
    let service = Arc::new(ContactService::new(
        rate_limiter,
        mailer,
        config.mail.from.clone(),
        config.mail.to.clone(),
    ));

    let server = HttpServer::new(config.server.http_addr, service);
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    cleanup.shutdown().await;
    served?;

    info!("Contactgate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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
