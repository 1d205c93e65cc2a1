//! Normalized domain types
//!
//! Everything the aggregation works with after the upstream shapes have been
//! reconciled. None of these are persisted.

use clanwatch_common::Tag;
use serde::Serialize;

/// Position of a member in the clan hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Member,
    Elder,
    CoLeader,
    Leader,
    Unknown,
}

impl Role {
    pub fn from_upstream(raw: &str) -> Self {
        match raw {
            "member" => Role::Member,
            "elder" => Role::Elder,
            "coLeader" => Role::CoLeader,
            "leader" => Role::Leader,
            _ => Role::Unknown,
        }
    }

    /// The top two roles, optionally left out of rankings
    pub fn is_leadership(self) -> bool {
        matches!(self, Role::Leader | Role::CoLeader)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterMember {
    pub tag: Tag,
    pub name: String,
    pub role: Role,
}

/// Current membership of a clan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roster {
    pub clan_tag: Tag,
    pub clan_name: String,
    pub members: Vec<RosterMember>,
}

impl Roster {
    pub fn contains(&self, tag: &Tag) -> bool {
        self.members.iter().any(|m| &m.tag == tag)
    }

    pub fn member(&self, tag: &Tag) -> Option<&RosterMember> {
        self.members.iter().find(|m| &m.tag == tag)
    }
}

/// Which upstream shape a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// In-progress period (index 0)
    Live,
    /// Completed period from the log (index >= 1)
    Completed,
}

/// One member's activity in one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberParticipation {
    pub tag: Tag,
    pub name: String,
    pub reward: u32,
    pub attempts_used: u32,
    /// Only meaningful for the live period
    pub attempts_used_today: u32,
}

/// All participants of one clan in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClanSnapshot {
    pub clan_tag: Tag,
    pub clan_name: String,
    /// 0 = live, 1 = most recent completed, increasing = older
    pub period_index: u32,
    pub kind: PeriodKind,
    pub members: Vec<MemberParticipation>,
}

impl ClanSnapshot {
    /// The member's participation, or `None` if they were absent
    ///
    /// Absence and a zero reward are different answers.
    pub fn participant(&self, tag: &Tag) -> Option<&MemberParticipation> {
        self.members.iter().find(|m| &m.tag == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileClan {
    pub tag: Tag,
    pub name: String,
}

/// Player profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub tag: Tag,
    pub name: String,
    pub exp_level: u32,
    pub trophies: u32,
    pub best_trophies: u32,
    pub role: Option<Role>,
    pub clan: Option<ProfileClan>,
}
