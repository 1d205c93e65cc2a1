//! Remote data client
//!
//! [`ClanApi`] is the seam between the aggregation engine and the upstream
//! service. [`HttpClanApi`] is the production implementation; tests drive the
//! engine with scripted implementations.

pub mod http;
pub mod wire;

pub use http::HttpClanApi;

use async_trait::async_trait;
use clanwatch_common::Tag;
use thiserror::Error;
use wire::{ClanInfo, CurrentRace, MemberList, Player, RaceLog};

/// Upstream client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Read-only view of the upstream service
#[async_trait]
pub trait ClanApi: Send + Sync {
    /// Clan header (name)
    async fn clan(&self, clan: &Tag) -> Result<ClanInfo, ClientError>;

    /// Current member list
    async fn members(&self, clan: &Tag) -> Result<MemberList, ClientError>;

    /// The live, possibly in-progress period
    async fn current_race(&self, clan: &Tag) -> Result<CurrentRace, ClientError>;

    /// Up to `limit` most recent completed periods, in upstream order
    async fn race_log(&self, clan: &Tag, limit: u32) -> Result<RaceLog, ClientError>;

    /// Player profile
    async fn player(&self, player: &Tag) -> Result<Player, ClientError>;
}
