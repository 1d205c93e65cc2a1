//! Snapshot normalizer
//!
//! Reconciles the two upstream period shapes into [`ClanSnapshot`]:
//! - live period: participants directly under the clan
//! - completed period: participants under each clan of a list of standings
//!
//! Also converts roster and profile responses into domain types.

use crate::client::wire::{
    ClanInfo, CurrentRace, MemberList, Participant, Player, RaceLog, RaceLogEntry,
};
use crate::types::{
    ClanSnapshot, MemberParticipation, PeriodKind, PlayerProfile, ProfileClan, Role, Roster,
    RosterMember,
};
use clanwatch_common::Tag;
use tracing::warn;

/// Normalize the live period of `clan`
pub fn from_current_race(clan: &Tag, race: CurrentRace) -> ClanSnapshot {
    ClanSnapshot {
        clan_tag: clan.clone(),
        clan_name: race.clan.name,
        period_index: 0,
        kind: PeriodKind::Live,
        members: participations(race.clan.participants),
    }
}

/// Pick the log entry representing "exactly n periods ago"
///
/// A log requested with `limit = n` holds the n most recent periods; the
/// oldest of them by `(season_id, section_index)` is period n.
pub fn oldest_entry(log: RaceLog) -> Option<RaceLogEntry> {
    log.items.into_iter().min_by_key(RaceLogEntry::recency_key)
}

/// Normalize one completed period of `clan` as period `period_index`
///
/// Uses the standing belonging to `clan`. If no standing carries the clan's
/// tag, the participants of every standing are merged.
pub fn from_log_entry(clan: &Tag, period_index: u32, entry: RaceLogEntry) -> ClanSnapshot {
    let mut standings = entry.standings;
    let own = standings
        .iter()
        .position(|s| Tag::parse(&s.clan.tag).ok().as_ref() == Some(clan));

    let (clan_name, participants) = match own {
        Some(idx) => {
            let standing = standings.swap_remove(idx);
            (standing.clan.name, standing.clan.participants)
        }
        None => {
            if !standings.is_empty() {
                warn!(
                    clan = %clan,
                    period = period_index,
                    "No standing matches clan, merging all standings"
                );
            }
            let participants = standings
                .into_iter()
                .flat_map(|s| s.clan.participants)
                .collect();
            (String::new(), participants)
        }
    };

    ClanSnapshot {
        clan_tag: clan.clone(),
        clan_name,
        period_index,
        kind: PeriodKind::Completed,
        members: participations(participants),
    }
}

/// Combine the clan header and member list into a roster
pub fn roster(clan: &Tag, info: ClanInfo, members: MemberList) -> Roster {
    let members = members
        .items
        .into_iter()
        .filter_map(|m| match Tag::parse(&m.tag) {
            Ok(tag) => Some(RosterMember {
                tag,
                name: m.name,
                role: Role::from_upstream(&m.role),
            }),
            Err(_) => {
                warn!(clan = %clan, tag = %m.tag, "Skipping roster entry with malformed tag");
                None
            }
        })
        .collect();

    Roster {
        clan_tag: clan.clone(),
        clan_name: info.name,
        members,
    }
}

/// Convert a player response, keeping the requested tag as identity
pub fn profile(requested: &Tag, player: Player) -> PlayerProfile {
    let clan = player.clan.and_then(|c| {
        Tag::parse(&c.tag)
            .ok()
            .map(|tag| ProfileClan { tag, name: c.name })
    });

    PlayerProfile {
        tag: requested.clone(),
        name: player.name,
        exp_level: player.exp_level,
        trophies: player.trophies,
        best_trophies: player.best_trophies,
        role: player.role.as_deref().map(Role::from_upstream),
        clan,
    }
}

fn participations(participants: Vec<Participant>) -> Vec<MemberParticipation> {
    participants
        .into_iter()
        .filter_map(|p| match Tag::parse(&p.tag) {
            Ok(tag) => Some(MemberParticipation {
                tag,
                name: p.name,
                reward: p.fame,
                attempts_used: p.decks_used,
                attempts_used_today: p.decks_used_today,
            }),
            Err(_) => {
                warn!(tag = %p.tag, "Skipping participant with malformed tag");
                None
            }
        })
        .collect()
}
