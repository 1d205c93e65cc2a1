//! Test Helper Utilities
//!
//! Scripted in-memory upstream for driving the aggregator and router.

#![allow(dead_code)]

pub mod log_capture;

use async_trait::async_trait;
use clanwatch_common::config::TomlConfig;
use clanwatch_common::Tag;
use clanwatch_core::client::wire::{
    ClanInfo, ClanMember, CurrentRace, MemberList, Participant, Player, PlayerClan, RaceClan,
    RaceLog, RaceLogEntry, Standing,
};
use clanwatch_core::client::{ClanApi, ClientError};
use clanwatch_core::{build_aggregator, Aggregator};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// (tag, reward) for one participant; attempts are 4 when reward > 0, else 0
pub type Entry<'a> = (&'a str, u32);

#[derive(Default)]
struct FakeClan {
    name: String,
    members: Vec<ClanMember>,
    live: Vec<Participant>,
    /// `history[0]` is the most recent completed period
    history: Vec<Vec<Participant>>,
}

/// Upstream fake with per-endpoint call counters
#[derive(Default)]
pub struct FakeApi {
    clans: HashMap<Tag, FakeClan>,
    players: HashMap<Tag, Player>,
    hang: AtomicBool,
    roster_down: AtomicBool,
    failing_periods: HashSet<u32>,
    roster_calls: AtomicUsize,
    live_calls: AtomicUsize,
    log_calls: AtomicUsize,
    player_calls: AtomicUsize,
}

fn tag(raw: &str) -> Tag {
    Tag::parse(raw).unwrap()
}

fn participants(entries: &[Entry]) -> Vec<Participant> {
    entries
        .iter()
        .map(|&(t, reward)| Participant {
            tag: format!("#{}", t),
            name: format!("name-{}", t),
            fame: reward,
            decks_used: if reward > 0 { 4 } else { 0 },
            decks_used_today: 0,
        })
        .collect()
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clan with `(tag, name, role)` members
    pub fn with_clan(mut self, clan: &str, name: &str, members: &[(&str, &str, &str)]) -> Self {
        let entry = self.clans.entry(tag(clan)).or_default();
        entry.name = name.to_string();
        entry.members = members
            .iter()
            .map(|&(t, n, role)| ClanMember {
                tag: format!("#{}", t),
                name: n.to_string(),
                role: role.to_string(),
            })
            .collect();
        self
    }

    /// Append the next older completed period
    pub fn with_period(mut self, clan: &str, entries: &[Entry]) -> Self {
        self.clans
            .entry(tag(clan))
            .or_default()
            .history
            .push(participants(entries));
        self
    }

    pub fn with_live(mut self, clan: &str, entries: &[Entry]) -> Self {
        self.clans.entry(tag(clan)).or_default().live = participants(entries);
        self
    }

    pub fn with_player(mut self, player: &str, name: &str, clan: Option<&str>) -> Self {
        self.players.insert(
            tag(player),
            Player {
                tag: format!("#{}", player),
                name: name.to_string(),
                exp_level: 50,
                trophies: 7000,
                best_trophies: 7500,
                role: Some("member".to_string()),
                clan: clan.map(|c| PlayerClan {
                    tag: format!("#{}", c),
                    name: format!("clan-{}", c),
                }),
            },
        );
        self
    }

    /// Every call is counted and then never completes
    pub fn hanging(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    /// Clan and member lookups fail with a 503
    pub fn roster_down(self) -> Self {
        self.roster_down.store(true, Ordering::SeqCst);
        self
    }

    /// Log requests for exactly `n` periods fail at the network level
    pub fn failing_period(mut self, n: u32) -> Self {
        self.failing_periods.insert(n);
        self
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    pub fn player_calls(&self) -> usize {
        self.player_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.roster_calls() + self.live_calls() + self.log_calls() + self.player_calls()
    }

    async fn enter(&self, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
    }

    fn roster_data(&self, clan: &Tag) -> Result<&FakeClan, ClientError> {
        if self.roster_down.load(Ordering::SeqCst) {
            return Err(ClientError::Status(503, "maintenance".to_string()));
        }
        self.clan_data(clan)
    }

    fn clan_data(&self, clan: &Tag) -> Result<&FakeClan, ClientError> {
        self.clans
            .get(clan)
            .ok_or_else(|| ClientError::NotFound(clan.to_string()))
    }
}

#[async_trait]
impl ClanApi for FakeApi {
    async fn clan(&self, clan: &Tag) -> Result<ClanInfo, ClientError> {
        self.enter(&self.roster_calls).await;
        let data = self.roster_data(clan)?;
        Ok(ClanInfo {
            tag: clan.to_string(),
            name: data.name.clone(),
        })
    }

    async fn members(&self, clan: &Tag) -> Result<MemberList, ClientError> {
        self.enter(&self.roster_calls).await;
        let data = self.roster_data(clan)?;
        Ok(MemberList {
            items: data.members.clone(),
        })
    }

    async fn current_race(&self, clan: &Tag) -> Result<CurrentRace, ClientError> {
        self.enter(&self.live_calls).await;
        let data = self.clan_data(clan)?;
        Ok(CurrentRace {
            clan: RaceClan {
                tag: clan.to_string(),
                name: data.name.clone(),
                participants: data.live.clone(),
            },
        })
    }

    async fn race_log(&self, clan: &Tag, limit: u32) -> Result<RaceLog, ClientError> {
        self.enter(&self.log_calls).await;
        if self.failing_periods.contains(&limit) {
            return Err(ClientError::Network("connection reset".to_string()));
        }
        let data = self.clan_data(clan)?;

        // Upstream order, most recent first; a rival standing precedes ours
        let items = data
            .history
            .iter()
            .take(limit as usize)
            .enumerate()
            .map(|(age, period)| RaceLogEntry {
                season_id: 100,
                section_index: 50 - age as u32,
                standings: vec![
                    Standing {
                        rank: 1,
                        clan: RaceClan {
                            tag: "#RIVAL".to_string(),
                            name: "Rival".to_string(),
                            participants: participants(&[("RIVAL1", 9999)]),
                        },
                    },
                    Standing {
                        rank: 2,
                        clan: RaceClan {
                            tag: clan.to_string(),
                            name: data.name.clone(),
                            participants: period.clone(),
                        },
                    },
                ],
            })
            .collect();

        Ok(RaceLog { items })
    }

    async fn player(&self, player: &Tag) -> Result<Player, ClientError> {
        self.enter(&self.player_calls).await;
        self.players
            .get(player)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(player.to_string()))
    }
}

/// Aggregator over `api` with default configuration (TTL 60s, timeout 15s)
pub fn aggregator(api: &Arc<FakeApi>) -> Aggregator {
    let upstream: Arc<dyn ClanApi> = api.clone();
    build_aggregator(upstream, &TomlConfig::default())
}

/// Clan ABC123: X has [4000, 3800, 4200] then drops out, Y is new, L leads
pub fn abc123() -> FakeApi {
    FakeApi::new()
        .with_clan(
            "ABC123",
            "Alpha",
            &[
                ("X1", "Xan", "member"),
                ("Y1", "Yun", "member"),
                ("L1", "Lee", "leader"),
                ("E1", "Eli", "elder"),
            ],
        )
        .with_live("ABC123", &[("X1", 1200), ("Y1", 900), ("F1", 300)])
        .with_period(
            "ABC123",
            &[("X1", 4000), ("L1", 1000), ("E1", 2500), ("F1", 100)],
        )
        .with_period("ABC123", &[("X1", 3800), ("L1", 1000), ("E1", 0)])
        .with_period("ABC123", &[("X1", 4200), ("L1", 1000)])
        .with_period("ABC123", &[("L1", 1000), ("Y1", 500)])
}
