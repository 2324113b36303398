//! dayfeed-server - daily feed service for care-recipient tablets
//!
//! Serves `GET /feed` and `POST /feed/acknowledge` on the configured bind
//! address. Configuration is read from TOML (see `dayfeed_common::config`).

use anyhow::{Context, Result};
use clap::Parser;
use dayfeed_common::api::TimestampWindow;
use dayfeed_common::config::{resolve_root_folder, FeedConfig};
use dayfeed_common::db::{init_database, DATABASE_FILE_NAME};
use dayfeed_server::weather::spawn_weather_refresher;
use dayfeed_server::{build_router, build_services, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "dayfeed-server", version, about = "Daily feed service")]
struct Args {
    /// Configuration file (overrides DAYFEED_CONFIG and platform defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding the database (overrides DAYFEED_ROOT_FOLDER and root_folder)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5740
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so the configured level applies; errors are reported after init
    let config = FeedConfig::load(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting dayfeed-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    info!("Configured clients: {}", config.clients.len());

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = root_folder.join(DATABASE_FILE_NAME);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("✓ Database ready");

    if config.shared_secret == 0 {
        info!("API authentication disabled (shared_secret = 0)");
    } else {
        info!("✓ API authentication enabled");
    }

    let auth_window = TimestampWindow {
        max_past_ms: config.auth.max_past_ms,
        max_future_ms: config.auth.max_future_ms,
    };
    let shared_secret = config.shared_secret;
    let bind = config.bind.clone();
    let refresh_every = Duration::from_secs(config.weather.refresh_interval_secs.max(60));
    let locations: Vec<String> = config
        .clients
        .iter()
        .filter_map(|c| c.location.clone())
        .collect();

    let services = build_services(Arc::new(config), pool)?;
    let _refresher = spawn_weather_refresher(services.weather.clone(), locations, refresh_every);

    let state = AppState::new(services.assembler, shared_secret, auth_window);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("dayfeed-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
