//! Clan and player tags
//!
//! Upstream identities are short alphanumeric codes shown to users with a
//! leading `#`. The upstream alphabet has no letter `O`, so a typed `O` is
//! always meant to be the digit `0`.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Normalized clan or player tag (stored without the leading `#`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Parse user or upstream input into a tag
    ///
    /// Trims whitespace, strips one leading `#`, upper-cases, and maps `O` to `0`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidTag(input.to_string()));
        }

        let normalized = body
            .chars()
            .map(|c| match c.to_ascii_uppercase() {
                'O' => '0',
                other => other,
            })
            .collect();

        Ok(Self(normalized))
    }

    /// Tag without the leading `#`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag as an upstream URL path segment (`%23` + body)
    pub fn path_segment(&self) -> String {
        format!("%23{}", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tag::parse(s)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tag::parse(&raw).map_err(serde::de::Error::custom)
    }
}
