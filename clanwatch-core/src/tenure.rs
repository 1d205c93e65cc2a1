//! Tenure inference
//!
//! Tenure is the length of a member's unbroken run of participation counted
//! backward from the most recent completed period. The first period the
//! member is missing from (or the first period with no data) ends the scan,
//! so a member present in periods 1, 2 and 4 has tenure 2.
//!
//! Each step depends on the previous one, so a single member's scan is
//! sequential; scans for different members run concurrently.

use crate::types::{ClanSnapshot, MemberParticipation};
use clanwatch_common::Tag;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// How far back a scan looks
pub const MAX_TENURE_PERIODS: u32 = 10;

/// Result of one member's backward scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenureScan {
    /// Consecutive most-recent periods with participation, 0..=MAX_TENURE_PERIODS
    pub weeks: u32,
    /// Participation for periods 1..=weeks; `history[0]` is period 1
    pub history: Vec<MemberParticipation>,
}

impl TenureScan {
    /// Tenure 0: no completed period yet
    pub fn is_new(&self) -> bool {
        self.weeks == 0
    }

    /// Rewards in period order, most recent first
    pub fn rewards(&self) -> Vec<u32> {
        self.history.iter().map(|p| p.reward).collect()
    }
}

/// Walk periods 1..=MAX_TENURE_PERIODS for `member`
///
/// `period` yields the snapshot for a period index, or `None` when there is
/// no data for it.
pub async fn scan<F, Fut>(member: &Tag, mut period: F) -> TenureScan
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<Arc<ClanSnapshot>>>,
{
    let mut history = Vec::new();

    for n in 1..=MAX_TENURE_PERIODS {
        let Some(snapshot) = period(n).await else {
            break;
        };

        match snapshot.participant(member) {
            Some(participation) => history.push(participation.clone()),
            None => break,
        }
    }

    TenureScan {
        weeks: history.len() as u32,
        history,
    }
}
