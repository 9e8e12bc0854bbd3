//! pov-verify - Photo Verification Microservice
//!
//! Checks that a submitted photo was taken at the claimed place by
//! comparing its location and content against a reference photo.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pov_common::config::{load_config, Environment};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use pov_verify::config::{default_log_filter, Overrides, VerifyConfig, CONFIG_FILE_NAME};
use pov_verify::{build_router, AppState};

/// Command-line arguments for pov-verify
#[derive(Parser, Debug)]
#[command(name = "pov-verify")]
#[command(about = "Photo location verification microservice")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Runtime environment (production | development)
    #[arg(short, long, env = "POV_ENV")]
    environment: Option<Environment>,

    /// Default verification radius in meters
    #[arg(short, long, env = "GPS_VERIFICATION_RADIUS")]
    radius: Option<f64>,

    /// Path to the TOML config file
    #[arg(short, long, env = "POV_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "POV_BIND_ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TOML file may still switch the environment, so the default
    // filter stays reloadable until the config is resolved
    let rust_log = EnvFilter::try_from_default_env().ok();
    let explicit_filter = rust_log.is_some();
    let initial_filter = rust_log.unwrap_or_else(|| {
        default_log_filter(args.environment.unwrap_or_default()).into()
    });
    let (filter, filter_handle) = reload::Layer::new(initial_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting pov-verify v{} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    );

    let toml_config = load_config(args.config.as_deref(), CONFIG_FILE_NAME)
        .context("Failed to load configuration")?;
    let config = VerifyConfig::resolve(
        toml_config,
        Overrides {
            port: args.port,
            environment: args.environment,
            bind_addr: args.bind,
            default_radius_m: args.radius,
        },
    )
    .context("Invalid configuration")?;

    if !explicit_filter {
        filter_handle
            .reload(EnvFilter::new(default_log_filter(config.environment)))
            .context("Failed to apply log filter")?;
    }

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr))?;
    let environment = config.environment;

    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{} ({})", addr, environment);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
