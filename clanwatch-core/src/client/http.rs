//! HTTP implementation of [`ClanApi`]
//!
//! Bearer-authenticated GETs against the upstream REST API, throttled by a
//! token bucket so fan-out from the aggregator never exceeds the configured
//! request budget.

use super::wire::{ClanInfo, CurrentRace, MemberList, Player, RaceLog};
use super::{ClanApi, ClientError};
use async_trait::async_trait;
use clanwatch_common::config::UpstreamConfig;
use clanwatch_common::Tag;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;

const USER_AGENT: &str = concat!("clanwatch/", env!("CARGO_PKG_VERSION"));

/// Upstream API client
pub struct HttpClanApi {
    /// HTTP client with configured timeouts
    client: Client,
    /// Base URL, no trailing slash
    base_url: String,
    /// Bearer credential
    api_key: String,
    /// Page size for member list requests
    roster_limit: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpClanApi {
    pub fn new(config: &UpstreamConfig, api_key: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            roster_limit: config.roster_limit,
            rate_limiter,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        // Wait for a permit before touching the network
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying upstream API");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(path.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Status(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ClanApi for HttpClanApi {
    async fn clan(&self, clan: &Tag) -> Result<ClanInfo, ClientError> {
        self.get_json(&format!("/clans/{}", clan.path_segment()))
            .await
    }

    async fn members(&self, clan: &Tag) -> Result<MemberList, ClientError> {
        self.get_json(&format!(
            "/clans/{}/members?limit={}",
            clan.path_segment(),
            self.roster_limit
        ))
        .await
    }

    async fn current_race(&self, clan: &Tag) -> Result<CurrentRace, ClientError> {
        self.get_json(&format!("/clans/{}/currentriverrace", clan.path_segment()))
            .await
    }

    async fn race_log(&self, clan: &Tag, limit: u32) -> Result<RaceLog, ClientError> {
        self.get_json(&format!(
            "/clans/{}/riverracelog?limit={}",
            clan.path_segment(),
            limit
        ))
        .await
    }

    async fn player(&self, player: &Tag) -> Result<Player, ClientError> {
        self.get_json(&format!("/players/{}", player.path_segment()))
            .await
    }
}
