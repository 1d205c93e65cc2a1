//! Cache-guarded data source
//!
//! Every upstream read goes through [`CachedSource`]. Responses are cached
//! under a structured [`CacheKey`] so lookups keyed by `(clan, period)` are
//! shared by every member that needs them. Failed lookups are remembered for
//! a shorter time so a known-down endpoint is not hammered.
//!
//! Concurrent misses on the same key wait for the first caller's fetch
//! instead of issuing their own.

use crate::cache::TtlCache;
use crate::client::{ClanApi, ClientError};
use crate::normalize;
use crate::types::{ClanSnapshot, PlayerProfile, Roster};
use clanwatch_common::Tag;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Identity of one upstream query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Roster(Tag),
    CurrentPeriod(Tag),
    PeriodLog(Tag, u32),
    Profile(Tag),
}

/// Why a lookup produced no data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Upstream says the entity does not exist
    NotFound,
    /// Upstream failed, timed out, or returned nothing usable
    Unavailable,
}

impl From<&ClientError> for Missing {
    fn from(err: &ClientError) -> Self {
        if err.is_not_found() {
            Missing::NotFound
        } else {
            Missing::Unavailable
        }
    }
}

#[derive(Clone)]
enum Cached {
    Roster(Arc<Roster>),
    Snapshot(Arc<ClanSnapshot>),
    Profile(Arc<PlayerProfile>),
}

/// Upstream reads with TTL caching, negative caching and single-flight
pub struct CachedSource {
    api: Arc<dyn ClanApi>,
    hits: TtlCache<CacheKey, Cached>,
    misses: TtlCache<CacheKey, Missing>,
    inflight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl CachedSource {
    pub fn new(api: Arc<dyn ClanApi>, ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            api,
            hits: TtlCache::new(ttl),
            misses: TtlCache::new(negative_ttl),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Clan name and current members
    pub async fn roster(&self, clan: &Tag) -> Result<Arc<Roster>, Missing> {
        let key = CacheKey::Roster(clan.clone());
        let loaded = self
            .load(key, || async {
                let (info, members) =
                    futures::join!(self.api.clan(clan), self.api.members(clan));
                let info = info.map_err(|e| absorb(clan, "roster", &e))?;
                let members = members.map_err(|e| absorb(clan, "roster", &e))?;
                Ok(Cached::Roster(Arc::new(normalize::roster(clan, info, members))))
            })
            .await?;

        match loaded {
            Cached::Roster(roster) => Ok(roster),
            _ => Err(Missing::Unavailable),
        }
    }

    /// The live period
    pub async fn current_period(&self, clan: &Tag) -> Result<Arc<ClanSnapshot>, Missing> {
        let key = CacheKey::CurrentPeriod(clan.clone());
        let loaded = self
            .load(key, || async {
                let race = self
                    .api
                    .current_race(clan)
                    .await
                    .map_err(|e| absorb(clan, "current period", &e))?;
                Ok(Cached::Snapshot(Arc::new(normalize::from_current_race(
                    clan, race,
                ))))
            })
            .await?;

        snapshot(loaded)
    }

    /// The completed period `n` periods ago (n >= 1)
    ///
    /// Requests the `n` most recent periods and keeps the oldest. A log
    /// shorter than `n` means period `n` does not exist, which is reported as
    /// `Unavailable`; `NotFound` is reserved for an unknown clan.
    pub async fn period_log(&self, clan: &Tag, n: u32) -> Result<Arc<ClanSnapshot>, Missing> {
        if n == 0 {
            return Err(Missing::Unavailable);
        }

        let key = CacheKey::PeriodLog(clan.clone(), n);
        let loaded = self
            .load(key, || async {
                let log = self
                    .api
                    .race_log(clan, n)
                    .await
                    .map_err(|e| absorb(clan, "period log", &e))?;

                if log.items.len() < n as usize {
                    debug!(clan = %clan, period = n, available = log.items.len(), "Period log too short");
                    return Err(Missing::Unavailable);
                }

                let entry = normalize::oldest_entry(log).ok_or(Missing::Unavailable)?;
                Ok(Cached::Snapshot(Arc::new(normalize::from_log_entry(
                    clan, n, entry,
                ))))
            })
            .await?;

        snapshot(loaded)
    }

    /// Player profile
    pub async fn profile(&self, player: &Tag) -> Result<Arc<PlayerProfile>, Missing> {
        let key = CacheKey::Profile(player.clone());
        let loaded = self
            .load(key, || async {
                let raw = self
                    .api
                    .player(player)
                    .await
                    .map_err(|e| absorb(player, "profile", &e))?;
                Ok(Cached::Profile(Arc::new(normalize::profile(player, raw))))
            })
            .await?;

        match loaded {
            Cached::Profile(profile) => Ok(profile),
            _ => Err(Missing::Unavailable),
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Result<Cached, Missing>> {
        if let Some(hit) = self.hits.get(key).await {
            return Some(Ok(hit));
        }
        self.misses.get(key).await.map(Err)
    }

    async fn load<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached, Missing>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Cached, Missing>>,
    {
        if let Some(cached) = self.lookup(&key).await {
            return cached;
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let _guard = gate.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(cached) = self.lookup(&key).await {
            return cached;
        }

        let result = fetch().await;
        match &result {
            Ok(value) => self.hits.set(key.clone(), value.clone()).await,
            Err(missing) => self.misses.set(key.clone(), *missing).await,
        }

        self.inflight.lock().await.remove(&key);
        result
    }
}

fn snapshot(loaded: Cached) -> Result<Arc<ClanSnapshot>, Missing> {
    match loaded {
        Cached::Snapshot(snapshot) => Ok(snapshot),
        _ => Err(Missing::Unavailable),
    }
}

fn absorb(tag: &Tag, what: &str, err: &ClientError) -> Missing {
    let missing = Missing::from(err);
    match missing {
        Missing::NotFound => debug!(tag = %tag, query = what, "Upstream reports not found"),
        Missing::Unavailable => {
            warn!(tag = %tag, query = what, error = %err, "Upstream query failed, treating as no data")
        }
    }
    missing
}
