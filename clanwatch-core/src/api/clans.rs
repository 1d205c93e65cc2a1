//! Clan queries

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use clanwatch_common::Tag;
use serde::{Deserialize, Serialize};

use crate::aggregator::{ClanReport, CurrentPeriodReport, TenureEntry};
use crate::api::extract::{ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::scoring::{MemberRecord, Ranking};
use crate::types::PeriodKind;
use crate::AppState;

/// Default number of members in a ranking
pub const DEFAULT_RANKING_LIMIT: usize = 10;
/// Default depth of a clan report
pub const DEFAULT_REPORT_PERIODS: u32 = 10;

#[derive(Debug, Serialize)]
pub struct ScoresResponse {
    pub clan: Tag,
    pub members: Vec<MemberRecord>,
}

#[derive(Debug, Serialize)]
pub struct TenureResponse {
    pub clan: Tag,
    pub members: Vec<TenureEntry>,
}

#[derive(Debug, Serialize)]
pub struct RewardResponse {
    pub clan: Tag,
    pub member: Tag,
    pub period: u32,
    pub kind: PeriodKind,
    /// False when absent from the period or the period has no data
    pub present: bool,
    pub reward: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    #[serde(default = "default_ranking_limit")]
    pub limit: usize,
    /// Defaults to false for removal and true for promotion
    pub exclude_leadership: Option<bool>,
}

fn default_ranking_limit() -> usize {
    DEFAULT_RANKING_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default = "default_report_periods")]
    pub periods: u32,
}

fn default_report_periods() -> u32 {
    DEFAULT_REPORT_PERIODS
}

/// GET /api/clans/:tag/scores
pub async fn get_scores(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
) -> ApiResult<Json<ScoresResponse>> {
    let clan = Tag::parse(&tag)?;
    let members = state.aggregator.get_member_scores(&clan).await?;
    Ok(Json(ScoresResponse { clan, members }))
}

/// GET /api/clans/:tag/tenure
pub async fn get_tenure(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
) -> ApiResult<Json<TenureResponse>> {
    let clan = Tag::parse(&tag)?;
    let members = state.aggregator.get_tenure(&clan).await?;
    Ok(Json(TenureResponse { clan, members }))
}

/// GET /api/clans/:tag/members/:member/periods/:n
///
/// Period 0 is the live period.
pub async fn get_reward_at_period(
    State(state): State<AppState>,
    ApiPath((tag, member, period)): ApiPath<(String, String, u32)>,
) -> ApiResult<Json<RewardResponse>> {
    let clan = Tag::parse(&tag)?;
    let member = Tag::parse(&member)?;
    let reward = state
        .aggregator
        .get_reward_at_period(&clan, &member, period)
        .await?;

    Ok(Json(RewardResponse {
        clan,
        member,
        period,
        kind: if period == 0 {
            PeriodKind::Live
        } else {
            PeriodKind::Completed
        },
        present: reward.is_some(),
        reward,
    }))
}

/// GET /api/clans/:tag/rankings/kick
pub async fn get_removal_ranking(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<RankingQuery>,
) -> ApiResult<Json<Ranking>> {
    let clan = Tag::parse(&tag)?;
    let ranking = state
        .aggregator
        .rank_for_removal(&clan, query.limit, query.exclude_leadership.unwrap_or(false))
        .await?;
    Ok(Json(ranking))
}

/// GET /api/clans/:tag/rankings/promote
pub async fn get_promotion_ranking(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<RankingQuery>,
) -> ApiResult<Json<Ranking>> {
    let clan = Tag::parse(&tag)?;
    let ranking = state
        .aggregator
        .rank_for_promotion(&clan, query.limit, query.exclude_leadership.unwrap_or(true))
        .await?;
    Ok(Json(ranking))
}

/// GET /api/clans/:tag/current
pub async fn get_current_period(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
) -> ApiResult<Json<CurrentPeriodReport>> {
    let clan = Tag::parse(&tag)?;
    Ok(Json(state.aggregator.get_current_period(&clan).await?))
}

/// GET /api/clans/:tag/report
pub async fn get_report(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<ClanReport>> {
    let clan = Tag::parse(&tag)?;
    Ok(Json(
        state.aggregator.get_clan_report(&clan, query.periods).await?,
    ))
}

pub fn clan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clans/:tag/scores", get(get_scores))
        .route("/api/clans/:tag/tenure", get(get_tenure))
        .route(
            "/api/clans/:tag/members/:member/periods/:n",
            get(get_reward_at_period),
        )
        .route("/api/clans/:tag/rankings/kick", get(get_removal_ranking))
        .route("/api/clans/:tag/rankings/promote", get(get_promotion_ranking))
        .route("/api/clans/:tag/current", get(get_current_period))
        .route("/api/clans/:tag/report", get(get_report))
}
