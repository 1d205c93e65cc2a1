//! Scoring engine
//!
//! Score = average reward + trend score + commitment, where
//! - average reward is the mean over the member's tenure,
//! - trend score maps the least-squares slope of reward over time onto
//!   [0, 20] with a slowly saturating log curve (10 = flat),
//! - commitment is the tenure in periods (at most 10).
//!
//! The components are not normalized: rewards are in the thousands, so the
//! average dominates. Weights default to 1.0 and can be tuned in config.

use crate::types::Role;
use clanwatch_common::config::ScoringConfig;
use clanwatch_common::Tag;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use thiserror::Error;

/// Reward scale that the trend curve is normalized against
pub const REWARD_SCALE: f64 = 3600.0;
/// Base of the trend curve's logarithm
const TREND_LOG_BASE: f64 = 1.03;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("statistic requested over zero data points")]
    EmptyInput,
}

/// Arithmetic mean; refuses empty input
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Trend of a reward history, positive when recent periods are better
///
/// `rewards[0]` is period 1 (most recent). Fits reward against period index
/// by ordinary least squares and negates the coefficient, because the index
/// counts backward in time. Fewer than two points is a flat trend.
pub fn trend_slope(rewards: &[u32]) -> f64 {
    if rewards.len() < 2 {
        return 0.0;
    }

    let n = rewards.len() as f64;
    let x_mean = (n + 1.0) / 2.0;
    let y_mean = rewards.iter().map(|&r| r as f64).sum::<f64>() / n;

    let (covariance, x_variance) = rewards
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, &r)| {
            let dx = (i + 1) as f64 - x_mean;
            (cov + dx * (r as f64 - y_mean), var + dx * dx)
        });

    let coefficient = covariance / x_variance;
    if coefficient == 0.0 {
        0.0
    } else {
        -coefficient
    }
}

/// Map a slope onto [0, 20], 10 for a flat trend
///
/// Monotonic and bounded, so one anomalous period cannot dominate.
pub fn slope_score(slope: f64) -> f64 {
    if slope == 0.0 {
        return 10.0;
    }

    let damped = (1.0 + slope.abs() / REWARD_SCALE).log(TREND_LOG_BASE);
    let magnitude = 10.0 * (1.0 - 1.0 / (1.0 + damped));

    if slope > 0.0 {
        10.0 + magnitude
    } else {
        10.0 - magnitude
    }
}

/// Multipliers for the three score components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub reward: f64,
    pub trend: f64,
    pub commitment: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            reward: 1.0,
            trend: 1.0,
            commitment: 1.0,
        }
    }
}

impl From<&ScoringConfig> for ScoringWeights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            reward: config.reward_weight,
            trend: config.trend_weight,
            commitment: config.commitment_weight,
        }
    }
}

/// Score breakdown for a member with tenure > 0
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberScore {
    pub average_reward: f64,
    pub trend_slope: f64,
    pub slope_score: f64,
    pub commitment_score: f64,
    pub total: f64,
}

/// Score a reward history covering the member's whole tenure
pub fn score_history(rewards: &[u32], weights: ScoringWeights) -> Result<MemberScore, StatsError> {
    let values: Vec<f64> = rewards.iter().map(|&r| r as f64).collect();
    let average_reward = mean(&values)?;
    let trend = trend_slope(rewards);
    let trend_score = slope_score(trend);
    let commitment_score = rewards.len() as f64;

    Ok(MemberScore {
        average_reward,
        trend_slope: trend,
        slope_score: trend_score,
        commitment_score,
        total: weights.reward * average_reward
            + weights.trend * trend_score
            + weights.commitment * commitment_score,
    })
}

/// Computed view of one roster member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRecord {
    pub tag: Tag,
    pub name: String,
    pub role: Role,
    pub tenure_weeks: u32,
    /// Rewards for periods 1..=tenure_weeks, most recent first
    pub reward_history: Vec<u32>,
    /// Reward so far in the live period, `None` if not taking part
    pub current_reward: Option<u32>,
    /// `None` (serialized as "N/A") exactly when tenure is 0
    #[serde(serialize_with = "score_or_na")]
    pub score: Option<MemberScore>,
}

impl MemberRecord {
    pub fn total(&self) -> Option<f64> {
        self.score.as_ref().map(|s| s.total)
    }
}

fn score_or_na<S: Serializer>(score: &Option<MemberScore>, serializer: S) -> Result<S::Ok, S::Error> {
    match score {
        Some(score) => score.serialize(serializer),
        None => serializer.serialize_str("N/A"),
    }
}

/// Direction of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Lowest score first
    Removal,
    /// Highest score first
    Promotion,
}

/// A member left out of a ranking because they have no score yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unranked {
    pub tag: Tag,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub order: RankOrder,
    pub ranked: Vec<MemberRecord>,
    /// Members with scores before `limit` was applied
    pub eligible: usize,
    /// New members (tenure 0), never ranked
    pub unranked: Vec<Unranked>,
}

/// Rank scored members for removal or promotion
///
/// Unscored members are listed separately. With `exclude_leadership`,
/// leaders and co-leaders are left out entirely. Ties break on tag.
pub fn rank(
    records: &[MemberRecord],
    order: RankOrder,
    exclude_leadership: bool,
    limit: usize,
) -> Ranking {
    let considered = records
        .iter()
        .filter(|r| !(exclude_leadership && r.role.is_leadership()));

    let (mut scored, unscored): (Vec<&MemberRecord>, Vec<&MemberRecord>) =
        considered.partition(|r| r.score.is_some());

    scored.sort_by(|a, b| {
        let by_score = compare_totals(a, b);
        let by_score = match order {
            RankOrder::Removal => by_score,
            RankOrder::Promotion => by_score.reverse(),
        };
        by_score.then_with(|| a.tag.cmp(&b.tag))
    });

    let eligible = scored.len();
    Ranking {
        order,
        ranked: scored.into_iter().take(limit).cloned().collect(),
        eligible,
        unranked: unscored
            .into_iter()
            .map(|r| Unranked {
                tag: r.tag.clone(),
                name: r.name.clone(),
            })
            .collect(),
    }
}

fn compare_totals(a: &MemberRecord, b: &MemberRecord) -> Ordering {
    let a = a.total().unwrap_or(f64::NEG_INFINITY);
    let b = b.total().unwrap_or(f64::NEG_INFINITY);
    a.total_cmp(&b)
}

/// Descriptive statistics over a series of rewards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation, 0 for a single value
    pub std_dev: f64,
    /// Sample variance, 0 for a single value
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    pub fn from_values(values: &[f64]) -> Result<Self, StatsError> {
        let mean = mean(values)?;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let variance = if values.len() > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
        } else {
            0.0
        };

        Ok(Self {
            count: values.len(),
            mean,
            median,
            std_dev: variance.sqrt(),
            variance,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Reliability of a member's output: high mean, low spread, regular presence
///
/// `participation` is the fraction of periods attended, in [0, 1].
pub fn consistency(stats: &SeriesStats, participation: f64) -> f64 {
    (stats.mean / (stats.std_dev + 1.0)) * participation
}
