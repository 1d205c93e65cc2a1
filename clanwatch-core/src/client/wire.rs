//! Upstream JSON shapes
//!
//! Every field is defaulted, so upstream drift degrades to zero rewards and
//! empty lists instead of failed requests. A record missing its tag parses
//! with an empty tag and is dropped during normalization.

use serde::Deserialize;

/// `GET /clans/{tag}`
#[derive(Debug, Clone, Deserialize)]
pub struct ClanInfo {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
}

/// `GET /clans/{tag}/members`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberList {
    #[serde(default)]
    pub items: Vec<ClanMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClanMember {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// One period participant, shared by the live and the log shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fame: u32,
    #[serde(default)]
    pub decks_used: u32,
    #[serde(default)]
    pub decks_used_today: u32,
}

/// A clan with its participants, as nested in both period shapes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceClan {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// `GET /clans/{tag}/currentriverrace`: participants directly under the clan
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentRace {
    #[serde(default)]
    pub clan: RaceClan,
}

/// `GET /clans/{tag}/riverracelog?limit=n`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceLog {
    #[serde(default)]
    pub items: Vec<RaceLogEntry>,
}

/// One completed period: participants nested under per-clan standings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceLogEntry {
    #[serde(default)]
    pub season_id: u32,
    #[serde(default)]
    pub section_index: u32,
    #[serde(default)]
    pub standings: Vec<Standing>,
}

impl RaceLogEntry {
    /// Recency ordering key; smaller is older
    pub fn recency_key(&self) -> (u32, u32) {
        (self.season_id, self.section_index)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Standing {
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub clan: RaceClan,
}

/// `GET /players/{tag}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exp_level: u32,
    #[serde(default)]
    pub trophies: u32,
    #[serde(default)]
    pub best_trophies: u32,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub clan: Option<PlayerClan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerClan {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
}
