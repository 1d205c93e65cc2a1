//! Cached source tests
//!
//! Caching, negative caching and single-flight behaviour against the
//! scripted upstream.

mod helpers;

use clanwatch_common::Tag;
use clanwatch_core::client::ClanApi;
use clanwatch_core::source::{CachedSource, Missing};
use helpers::{abc123, FakeApi};
use std::sync::Arc;
use std::time::Duration;

fn tag(s: &str) -> Tag {
    Tag::parse(s).unwrap()
}

fn source(api: &Arc<FakeApi>) -> CachedSource {
    let upstream: Arc<dyn ClanApi> = api.clone();
    CachedSource::new(upstream, Duration::from_secs(60), Duration::from_secs(10))
}

// ============================================================================
// Positive caching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_roster_cached_within_ttl() {
    let api = Arc::new(abc123());
    let source = source(&api);
    let clan = tag("ABC123");

    let first = source.roster(&clan).await.unwrap();
    assert_eq!(first.clan_name, "Alpha");
    assert_eq!(first.members.len(), 4);
    assert_eq!(api.roster_calls(), 2);

    tokio::time::advance(Duration::from_secs(59)).await;
    source.roster(&clan).await.unwrap();
    assert_eq!(api.roster_calls(), 2, "hit within TTL must not reach upstream");

    tokio::time::advance(Duration::from_secs(2)).await;
    source.roster(&clan).await.unwrap();
    assert_eq!(api.roster_calls(), 4, "expired entry must be refetched");
}

#[tokio::test(start_paused = true)]
async fn test_period_log_keyed_by_clan_and_period() {
    let api = Arc::new(abc123());
    let source = source(&api);
    let clan = tag("ABC123");

    let one = source.period_log(&clan, 1).await.unwrap();
    let two = source.period_log(&clan, 2).await.unwrap();
    source.period_log(&clan, 1).await.unwrap();

    assert_eq!(one.period_index, 1);
    assert_eq!(two.period_index, 2);
    assert_eq!(one.participant(&tag("X1")).unwrap().reward, 4000);
    assert_eq!(two.participant(&tag("X1")).unwrap().reward, 3800);
    assert_eq!(api.log_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_period_log_uses_own_standing() {
    let api = Arc::new(abc123());
    let source = source(&api);

    let snapshot = source.period_log(&tag("ABC123"), 1).await.unwrap();
    assert!(snapshot.participant(&tag("RIVAL1")).is_none());
    assert_eq!(snapshot.clan_name, "Alpha");
}

#[tokio::test(start_paused = true)]
async fn test_period_zero_and_beyond_log_are_empty() {
    let api = Arc::new(abc123());
    let source = source(&api);
    let clan = tag("ABC123");

    assert_eq!(source.period_log(&clan, 0).await.unwrap_err(), Missing::Unavailable);
    assert_eq!(api.log_calls(), 0);

    // Only four completed periods exist
    assert_eq!(source.period_log(&clan, 5).await.unwrap_err(), Missing::Unavailable);
    assert!(source.period_log(&clan, 4).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_current_period_is_live_snapshot() {
    let api = Arc::new(abc123());
    let source = source(&api);

    let live = source.current_period(&tag("ABC123")).await.unwrap();
    assert_eq!(live.period_index, 0);
    assert_eq!(live.participant(&tag("F1")).unwrap().reward, 300);
}

// ============================================================================
// Negative caching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unknown_clan_is_not_found_and_remembered() {
    let api = Arc::new(FakeApi::new());
    let source = source(&api);
    let clan = tag("NNN111");

    assert_eq!(source.roster(&clan).await.unwrap_err(), Missing::NotFound);
    let calls = api.roster_calls();
    assert!(calls > 0);

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(source.roster(&clan).await.unwrap_err(), Missing::NotFound);
    assert_eq!(api.roster_calls(), calls);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(source.roster(&clan).await.is_err());
    assert!(api.roster_calls() > calls);
}

#[tokio::test(start_paused = true)]
async fn test_short_log_is_negatively_cached() {
    let api = Arc::new(abc123());
    let source = source(&api);
    let clan = tag("ABC123");

    assert!(source.period_log(&clan, 7).await.is_err());
    assert!(source.period_log(&clan, 7).await.is_err());
    assert_eq!(api.log_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_is_negatively_cached() {
    let api = Arc::new(abc123().failing_period(2));
    let source = source(&api);
    let clan = tag("ABC123");

    assert_eq!(source.period_log(&clan, 2).await.unwrap_err(), Missing::Unavailable);
    assert_eq!(api.log_calls(), 1);

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(source.period_log(&clan, 2).await.unwrap_err(), Missing::Unavailable);
    assert_eq!(api.log_calls(), 1, "failure must be remembered");

    // Other periods are unaffected
    assert!(source.period_log(&clan, 1).await.is_ok());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(source.period_log(&clan, 2).await.is_err());
    assert_eq!(api.log_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_negatively_cached() {
    let api = Arc::new(abc123().roster_down());
    let source = source(&api);
    let clan = tag("ABC123");

    assert_eq!(source.roster(&clan).await.unwrap_err(), Missing::Unavailable);
    assert_eq!(api.roster_calls(), 2);

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(source.roster(&clan).await.unwrap_err(), Missing::Unavailable);
    assert_eq!(api.roster_calls(), 2);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(source.roster(&clan).await.is_err());
    assert_eq!(api.roster_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_clan_period_is_not_found() {
    let api = Arc::new(FakeApi::new());
    let source = source(&api);
    let clan = tag("NNN999");

    assert_eq!(source.period_log(&clan, 1).await.unwrap_err(), Missing::NotFound);
    assert_eq!(source.current_period(&clan).await.unwrap_err(), Missing::NotFound);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_player_profile() {
    let api = Arc::new(FakeApi::new().with_player("P1", "Pat", None));
    let source = source(&api);

    assert_eq!(
        source.profile(&tag("P2")).await.unwrap_err(),
        Missing::NotFound
    );
    let profile = source.profile(&tag("P1")).await.unwrap();
    assert_eq!(profile.name, "Pat");
    assert!(profile.clan.is_none());
}

// ============================================================================
// Single-flight
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_share_one_fetch() {
    let api = Arc::new(abc123());
    let source = source(&api);
    let clan = tag("ABC123");

    let lookups = (0..8).map(|_| source.period_log(&clan, 3));
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(api.log_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_roster_lookups_share_one_fetch() {
    let api = Arc::new(abc123());
    let source = Arc::new(source(&api));
    let clan = tag("ABC123");

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..5 {
        let source = Arc::clone(&source);
        let clan = clan.clone();
        tasks.spawn(async move { source.roster(&clan).await.is_ok() });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap());
    }
    assert_eq!(api.roster_calls(), 2);
}
