//! Aggregation orchestrator
//!
//! Entry point for every query. Each operation fetches the roster, fans out
//! one tenure scan per member and joins them. The fan-out futures are polled
//! inside the caller's task (never spawned), so when the operation timeout
//! fires the whole tree is dropped and no further upstream calls are made.
//! A timed-out call returns [`AggregateError::Timeout`], never partial data.

use crate::scoring::{
    self, MemberRecord, RankOrder, Ranking, ScoringWeights, SeriesStats, StatsError,
};
use crate::source::{CachedSource, Missing};
use crate::tenure::{self, TenureScan};
use crate::types::{ClanSnapshot, PlayerProfile, ProfileClan, Role, Roster, RosterMember};
use clanwatch_common::Tag;
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Deepest period the range operations will look at
pub const MAX_LOOKBACK_PERIODS: u32 = 20;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("still gathering data, try again in a moment (gave up after {}s)", .0.as_secs())]
    Timeout(Duration),

    #[error("clan {0} not found")]
    ClanNotFound(Tag),

    #[error("player {0} not found")]
    PlayerNotFound(Tag),

    #[error("player {0} is not in a clan")]
    PlayerNotInClan(Tag),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl AggregateError {
    /// Worth retrying later with the same arguments
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AggregateError::Timeout(_) | AggregateError::UpstreamUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AggregateError>;

/// How long a member has been continuously taking part
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenureEntry {
    pub tag: Tag,
    pub name: String,
    pub role: Role,
    pub weeks_ago: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReward {
    pub period: u32,
    /// `None` when the player was absent or the period has no data
    pub reward: Option<u32>,
}

/// A player's rewards over a range of completed periods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPeriodStats {
    pub tag: Tag,
    pub name: String,
    pub clan: ProfileClan,
    pub from: u32,
    pub to: u32,
    /// Most recent first
    pub periods: Vec<PeriodReward>,
    /// Periods the player actually took part in
    pub participated: usize,
    /// Computed with absent periods counted as zero
    pub stats: SeriesStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Member,
    /// On the roster, absent from the last completed period
    New,
    /// Taking part in the live period but no longer on the roster
    Former,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStanding {
    pub tag: Tag,
    pub name: String,
    pub reward: u32,
    pub attempts_used: u32,
    pub attempts_used_today: u32,
    pub status: MemberStatus,
}

/// Live period standings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPeriodReport {
    pub clan_tag: Tag,
    pub clan_name: String,
    /// False when upstream had no live period data
    pub available: bool,
    /// Highest reward first
    pub standings: Vec<CurrentStanding>,
}

/// Clan-wide totals for one completed period, over current roster members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: u32,
    pub available: bool,
    /// Roster members who used at least one attempt
    pub participants: usize,
    pub total: u64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberConsistency {
    pub tag: Tag,
    pub name: String,
    pub participated: usize,
    pub stats: Option<SeriesStats>,
    pub consistency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClanReport {
    pub clan_tag: Tag,
    pub clan_name: String,
    pub periods: u32,
    pub summaries: Vec<PeriodSummary>,
    /// Most consistent first
    pub members: Vec<MemberConsistency>,
}

pub struct Aggregator {
    source: CachedSource,
    timeout: Duration,
    weights: ScoringWeights,
}

impl Aggregator {
    pub fn new(source: CachedSource, timeout: Duration, weights: ScoringWeights) -> Self {
        Self {
            source,
            timeout,
            weights,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Score every current member of `clan`
    pub async fn get_member_scores(&self, clan: &Tag) -> Result<Vec<MemberRecord>> {
        self.bounded("member_scores", self.member_records(clan))
            .await
    }

    /// Tenure of every current member of `clan`
    pub async fn get_tenure(&self, clan: &Tag) -> Result<Vec<TenureEntry>> {
        self.bounded("tenure", async {
            let roster = self.roster(clan).await?;
            let scans = self.scan_members(&roster).await;

            Ok(roster
                .members
                .iter()
                .zip(scans)
                .map(|(member, scan)| TenureEntry {
                    tag: member.tag.clone(),
                    name: member.name.clone(),
                    role: member.role,
                    weeks_ago: scan.weeks,
                })
                .collect())
        })
        .await
    }

    /// Reward of `member` in period `n` (0 = live)
    ///
    /// `None` means absent or no data; `Some(0)` means present with no reward.
    /// A clan upstream does not know is `ClanNotFound`.
    pub async fn get_reward_at_period(
        &self,
        clan: &Tag,
        member: &Tag,
        n: u32,
    ) -> Result<Option<u32>> {
        if n > MAX_LOOKBACK_PERIODS {
            return Err(AggregateError::InvalidInput(format!(
                "period must be at most {}",
                MAX_LOOKBACK_PERIODS
            )));
        }

        self.bounded("reward_at_period", async {
            let snapshot = if n == 0 {
                self.source.current_period(clan).await
            } else {
                self.source.period_log(clan, n).await
            };
            match snapshot {
                Ok(snapshot) => Ok(snapshot.participant(member).map(|p| p.reward)),
                Err(Missing::NotFound) => Err(AggregateError::ClanNotFound(clan.clone())),
                Err(Missing::Unavailable) => Ok(None),
            }
        })
        .await
    }

    /// Lowest scores first
    pub async fn rank_for_removal(
        &self,
        clan: &Tag,
        limit: usize,
        exclude_leadership: bool,
    ) -> Result<Ranking> {
        self.rank(clan, RankOrder::Removal, limit, exclude_leadership)
            .await
    }

    /// Highest scores first
    pub async fn rank_for_promotion(
        &self,
        clan: &Tag,
        limit: usize,
        exclude_leadership: bool,
    ) -> Result<Ranking> {
        self.rank(clan, RankOrder::Promotion, limit, exclude_leadership)
            .await
    }

    /// Reward statistics for periods `to..=from` of the player's current clan
    pub async fn get_player_period_stats(
        &self,
        player: &Tag,
        from: u32,
        to: u32,
    ) -> Result<PlayerPeriodStats> {
        validate_range(from, to)?;

        self.bounded("player_period_stats", async {
            let profile = self.profile(player).await?;
            let clan = profile
                .clan
                .clone()
                .ok_or_else(|| AggregateError::PlayerNotInClan(player.clone()))?;

            let source = &self.source;
            let clan_tag = &clan.tag;
            let periods = join_all((to..=from).map(move |n| async move {
                let reward = source
                    .period_log(clan_tag, n)
                    .await
                    .ok()
                    .and_then(|s| s.participant(player).map(|p| p.reward));
                PeriodReward { period: n, reward }
            }))
            .await;

            let values: Vec<f64> = periods
                .iter()
                .map(|p| p.reward.unwrap_or(0) as f64)
                .collect();
            let stats = SeriesStats::from_values(&values)?;
            let participated = periods.iter().filter(|p| p.reward.is_some()).count();

            Ok(PlayerPeriodStats {
                tag: profile.tag.clone(),
                name: profile.name.clone(),
                clan,
                from,
                to,
                periods,
                participated,
                stats,
            })
        })
        .await
    }

    /// Live standings with former and new members flagged
    pub async fn get_current_period(&self, clan: &Tag) -> Result<CurrentPeriodReport> {
        self.bounded("current_period", async {
            let roster = self.roster(clan).await?;
            let (live, last) = futures::join!(
                self.source.current_period(clan),
                self.source.period_log(clan, 1)
            );
            let (live, last) = (live.ok(), last.ok());

            let status = |tag: &Tag| {
                if !roster.contains(tag) {
                    MemberStatus::Former
                } else if last.as_deref().and_then(|s| s.participant(tag)).is_none() {
                    MemberStatus::New
                } else {
                    MemberStatus::Member
                }
            };

            let mut standings: Vec<CurrentStanding> = live
                .as_deref()
                .map(|snapshot| {
                    snapshot
                        .members
                        .iter()
                        .map(|p| CurrentStanding {
                            tag: p.tag.clone(),
                            name: p.name.clone(),
                            reward: p.reward,
                            attempts_used: p.attempts_used,
                            attempts_used_today: p.attempts_used_today,
                            status: status(&p.tag),
                        })
                        .collect()
                })
                .unwrap_or_default();
            standings.sort_by(|a, b| b.reward.cmp(&a.reward).then_with(|| a.tag.cmp(&b.tag)));

            Ok(CurrentPeriodReport {
                clan_tag: roster.clan_tag.clone(),
                clan_name: roster.clan_name.clone(),
                available: live.is_some(),
                standings,
            })
        })
        .await
    }

    /// Per-period totals and per-member consistency over periods `1..=periods`
    pub async fn get_clan_report(&self, clan: &Tag, periods: u32) -> Result<ClanReport> {
        if periods == 0 || periods > MAX_LOOKBACK_PERIODS {
            return Err(AggregateError::InvalidInput(format!(
                "periods must be between 1 and {}",
                MAX_LOOKBACK_PERIODS
            )));
        }

        self.bounded("clan_report", async {
            let roster = self.roster(clan).await?;

            let source = &self.source;
            let clan_tag = &roster.clan_tag;
            let snapshots = join_all((1..=periods).map(move |n| async move {
                (n, source.period_log(clan_tag, n).await.ok())
            }))
            .await;

            let summaries = snapshots
                .iter()
                .map(|(n, snapshot)| summarize_period(*n, &roster, snapshot.as_deref()))
                .collect();

            let available: Vec<&ClanSnapshot> =
                snapshots.iter().filter_map(|(_, s)| s.as_deref()).collect();
            let mut members: Vec<MemberConsistency> = roster
                .members
                .iter()
                .map(|member| member_consistency(member, &available))
                .collect();
            members.sort_by(|a, b| {
                descending(a.consistency, b.consistency).then_with(|| a.tag.cmp(&b.tag))
            });

            Ok(ClanReport {
                clan_tag: roster.clan_tag.clone(),
                clan_name: roster.clan_name.clone(),
                periods,
                summaries,
                members,
            })
        })
        .await
    }

    pub async fn get_player_profile(&self, player: &Tag) -> Result<Arc<PlayerProfile>> {
        self.bounded("player_profile", self.profile(player)).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "Aggregation timed out, dropping in-flight fetches"
                );
                Err(AggregateError::Timeout(self.timeout))
            }
        }
    }

    async fn rank(
        &self,
        clan: &Tag,
        order: RankOrder,
        limit: usize,
        exclude_leadership: bool,
    ) -> Result<Ranking> {
        self.bounded("ranking", async {
            let records = self.member_records(clan).await?;
            Ok(scoring::rank(&records, order, exclude_leadership, limit))
        })
        .await
    }

    async fn member_records(&self, clan: &Tag) -> Result<Vec<MemberRecord>> {
        let roster = self.roster(clan).await?;
        let (live, scans) = futures::join!(
            self.source.current_period(clan),
            self.scan_members(&roster)
        );
        let live = live.ok();

        let records: Vec<MemberRecord> = roster
            .members
            .iter()
            .zip(scans)
            .map(|(member, scan)| self.record(member, scan, live.as_deref()))
            .collect();

        debug!(
            clan = %clan,
            members = records.len(),
            unscored = records.iter().filter(|r| r.score.is_none()).count(),
            "Scored members"
        );
        Ok(records)
    }

    fn record(
        &self,
        member: &RosterMember,
        scan: TenureScan,
        live: Option<&ClanSnapshot>,
    ) -> MemberRecord {
        let rewards = scan.rewards();
        let score = if scan.is_new() {
            None
        } else {
            scoring::score_history(&rewards, self.weights).ok()
        };

        MemberRecord {
            tag: member.tag.clone(),
            name: member.name.clone(),
            role: member.role,
            tenure_weeks: scan.weeks,
            reward_history: rewards,
            current_reward: live
                .and_then(|s| s.participant(&member.tag))
                .map(|p| p.reward),
            score,
        }
    }

    /// One backward scan per member, all running concurrently
    async fn scan_members(&self, roster: &Roster) -> Vec<TenureScan> {
        let source = &self.source;
        let clan = &roster.clan_tag;
        join_all(
            roster
                .members
                .iter()
                .map(move |m| {
                    tenure::scan(&m.tag, move |n| async move {
                        source.period_log(clan, n).await.ok()
                    })
                }),
        )
        .await
    }

    async fn roster(&self, clan: &Tag) -> Result<Arc<Roster>> {
        self.source.roster(clan).await.map_err(|missing| match missing {
            Missing::NotFound => AggregateError::ClanNotFound(clan.clone()),
            Missing::Unavailable => {
                AggregateError::UpstreamUnavailable(format!("roster of clan {}", clan))
            }
        })
    }

    async fn profile(&self, player: &Tag) -> Result<Arc<PlayerProfile>> {
        self.source.profile(player).await.map_err(|missing| match missing {
            Missing::NotFound => AggregateError::PlayerNotFound(player.clone()),
            Missing::Unavailable => {
                AggregateError::UpstreamUnavailable(format!("profile of player {}", player))
            }
        })
    }
}

/// `from` is the older end of the range and must be strictly older than `to`
fn validate_range(from: u32, to: u32) -> Result<()> {
    if to < 1 {
        return Err(AggregateError::InvalidInput(
            "period numbers start at 1".to_string(),
        ));
    }
    if from <= to {
        return Err(AggregateError::InvalidInput(
            "'from' must be greater than 'to' (it counts further back)".to_string(),
        ));
    }
    if from > MAX_LOOKBACK_PERIODS {
        return Err(AggregateError::InvalidInput(format!(
            "'from' must be at most {}",
            MAX_LOOKBACK_PERIODS
        )));
    }
    Ok(())
}

fn summarize_period(period: u32, roster: &Roster, snapshot: Option<&ClanSnapshot>) -> PeriodSummary {
    let Some(snapshot) = snapshot else {
        return PeriodSummary {
            period,
            available: false,
            participants: 0,
            total: 0,
            mean: None,
            median: None,
        };
    };

    let entries: Vec<_> = roster
        .members
        .iter()
        .map(|m| snapshot.participant(&m.tag))
        .collect();
    let values: Vec<f64> = entries
        .iter()
        .map(|p| p.map_or(0.0, |p| p.reward as f64))
        .collect();
    let stats = SeriesStats::from_values(&values).ok();

    PeriodSummary {
        period,
        available: true,
        participants: entries
            .iter()
            .filter(|p| p.is_some_and(|p| p.attempts_used > 0))
            .count(),
        total: entries
            .iter()
            .map(|p| p.map_or(0, |p| p.reward as u64))
            .sum(),
        mean: stats.as_ref().map(|s| s.mean),
        median: stats.as_ref().map(|s| s.median),
    }
}

fn member_consistency(member: &RosterMember, periods: &[&ClanSnapshot]) -> MemberConsistency {
    let entries: Vec<_> = periods.iter().map(|s| s.participant(&member.tag)).collect();
    let values: Vec<f64> = entries
        .iter()
        .map(|p| p.map_or(0.0, |p| p.reward as f64))
        .collect();
    let participated = entries
        .iter()
        .filter(|p| p.is_some_and(|p| p.attempts_used > 0))
        .count();

    let stats = SeriesStats::from_values(&values).ok();
    let consistency = stats
        .as_ref()
        .map(|s| scoring::consistency(s, participated as f64 / periods.len() as f64));

    MemberConsistency {
        tag: member.tag.clone(),
        name: member.name.clone(),
        participated,
        stats,
        consistency,
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.unwrap_or(f64::NEG_INFINITY)
        .total_cmp(&a.unwrap_or(f64::NEG_INFINITY))
}
