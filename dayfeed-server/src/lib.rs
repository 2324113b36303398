//! dayfeed-server library
//!
//! Serves the daily feed for care-recipient clients: deterministic
//! content rotation with tiered fallback stores, weather conditioning,
//! and an idempotent task acknowledgment ledger behind a small axum API.

use axum::Router;
use dayfeed_common::api::TimestampWindow;
use dayfeed_common::config::FeedConfig;
use dayfeed_common::time::millis_to_duration;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod api;
pub mod assembler;
pub mod content;
pub mod error;
pub mod ledger;
pub mod tasks;
pub mod weather;

pub use assembler::FeedAssembler;

use content::{
    ContentPoolResolver, ContentStore, HttpMediaProbe, MediaProbe, SpreadsheetContentStore,
    SqliteContentStore, TieredProbe, TrustAllProbe,
};
use ledger::AcknowledgmentLedger;
use weather::{OpenWeatherClient, WeatherCache, WeatherProvider, WeatherService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<FeedAssembler>,
    /// Shared secret for API authentication (0 disables auth)
    pub shared_secret: i64,
    /// Accepted request timestamp skew
    pub auth_window: TimestampWindow,
}

impl AppState {
    pub fn new(assembler: Arc<FeedAssembler>, shared_secret: i64, auth_window: TimestampWindow) -> Self {
        Self {
            assembler,
            shared_secret,
            auth_window,
        }
    }
}

/// Long-lived services built from configuration
pub struct Services {
    pub assembler: Arc<FeedAssembler>,
    pub weather: Arc<WeatherService>,
}

/// Wire stores, probe, weather provider and ledger into an assembler
///
/// Optional collaborators that are not configured are simply absent; the
/// feed degrades around them.
pub fn build_services(config: Arc<FeedConfig>, db: SqlitePool) -> dayfeed_common::Result<Services> {
    let primary: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(db.clone()));

    let fallback: Option<Arc<dyn ContentStore>> = match &config.fallback_store.url {
        Some(url) if !url.trim().is_empty() => {
            info!("Fallback content store: {}", url);
            Some(Arc::new(SpreadsheetContentStore::new(
                url.trim(),
                millis_to_duration(config.fallback_store.timeout_ms),
            )?))
        }
        _ => {
            info!("No fallback content store configured");
            None
        }
    };

    // Own media is verified; legacy spreadsheet links are shown unverified
    let primary_probe: Arc<dyn MediaProbe> = if config.probe.namespaces.is_empty() {
        Arc::new(TrustAllProbe)
    } else {
        Arc::new(HttpMediaProbe::new(
            config.probe.namespaces.clone(),
            millis_to_duration(config.probe.timeout_ms),
        )?)
    };
    let probe: Arc<dyn MediaProbe> =
        Arc::new(TieredProbe::new(primary_probe, Arc::new(TrustAllProbe)));

    let provider: Option<Arc<dyn WeatherProvider>> = match &config.weather.base_url {
        Some(base_url) if !base_url.trim().is_empty() => {
            info!("Weather provider: {}", base_url);
            Some(Arc::new(OpenWeatherClient::new(
                base_url.trim(),
                config.weather.api_key.clone().unwrap_or_default(),
                config.weather.language.clone(),
                millis_to_duration(config.weather.timeout_ms),
            )?))
        }
        _ => {
            info!("No weather provider configured, feed uses neutral weather");
            None
        }
    };

    let weather = Arc::new(WeatherService::new(
        provider,
        WeatherCache::new(),
        millis_to_duration(config.weather.timeout_ms),
        Duration::from_secs(config.weather.max_age_secs),
    ));

    let assembler = Arc::new(FeedAssembler::new(
        config,
        ContentPoolResolver::new(Some(primary), fallback),
        probe,
        weather.clone(),
        AcknowledgmentLedger::new(db),
    ));

    Ok(Services { assembler, weather })
}

/// Build application router
///
/// `/health` is public; every feed route requires authentication.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/feed", get(api::get_feed))
        .route("/feed/acknowledge", post(api::acknowledge))
        .route("/feed/acknowledgments", get(api::get_acknowledgments))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
