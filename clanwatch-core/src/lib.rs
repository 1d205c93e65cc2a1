//! clanwatch library interface
//!
//! Clan member tenure and performance scoring over a rate-limited upstream
//! game API. Exposed as a library so integration tests can drive the
//! aggregator and router against a scripted upstream.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod normalize;
pub mod scoring;
pub mod source;
pub mod tenure;
pub mod types;

pub use crate::aggregator::{AggregateError, Aggregator};
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use clanwatch_common::config::{CliOverrides, TomlConfig};
use client::ClanApi;
use scoring::ScoringWeights;
use source::CachedSource;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            startup_time: Utc::now(),
        }
    }
}

/// Resolve configuration with `bootstrap` as the active subscriber
///
/// The service subscriber is filtered by `logging.level` and only exists
/// after resolution; `bootstrap` receives the resolution logs until then.
pub fn resolve_config<S>(
    overrides: &CliOverrides,
    bootstrap: S,
) -> clanwatch_common::Result<TomlConfig>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(bootstrap, || TomlConfig::resolve(overrides))
}

/// Wire the cache, aggregator and scoring weights from resolved configuration
pub fn build_aggregator(api: Arc<dyn ClanApi>, config: &TomlConfig) -> Aggregator {
    let source = CachedSource::new(api, config.cache_ttl(), config.negative_cache_ttl());
    Aggregator::new(
        source,
        config.aggregation_timeout(),
        ScoringWeights::from(&config.scoring),
    )
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::clan_routes())
        .merge(api::player_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
