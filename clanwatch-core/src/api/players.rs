//! Player queries

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use clanwatch_common::Tag;
use serde::Deserialize;

use crate::aggregator::PlayerPeriodStats;
use crate::api::extract::{ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::types::PlayerProfile;
use crate::AppState;

/// Range of completed periods, `from` being the older end
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: u32,
    #[serde(default = "default_to")]
    pub to: u32,
}

fn default_to() -> u32 {
    1
}

/// GET /api/players/:tag
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
) -> ApiResult<Json<PlayerProfile>> {
    let player = Tag::parse(&tag)?;
    let profile = state.aggregator.get_player_profile(&player).await?;
    Ok(Json(PlayerProfile::clone(&profile)))
}

/// GET /api/players/:tag/stats?from&to
pub async fn get_period_stats(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> ApiResult<Json<PlayerPeriodStats>> {
    let player = Tag::parse(&tag)?;
    let stats = state
        .aggregator
        .get_player_period_stats(&player, query.from, query.to)
        .await?;
    Ok(Json(stats))
}

pub fn player_routes() -> Router<AppState> {
    Router::new()
        .route("/api/players/:tag", get(get_profile))
        .route("/api/players/:tag/stats", get(get_period_stats))
}
