// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-10 world leaderboard retrieval for a single map.

use serde::Deserialize;

use crate::auth::store::TokenStore;
use crate::auth::Audience;
use crate::error::WatchError;

const LIVE_BASE_URL: &str = "https://live-services.trackmania.nadeo.live";

/// Fixed page contract with the upstream API: top 10, world zone only,
/// offset 0.
fn leaderboard_url(base_url: &str, map_uid: &str) -> String {
    format!(
        "{base_url}/api/token/leaderboard/group/Personal_Best/map/{map_uid}/top?length=10&onlyWorld=true&offset=0"
    )
}

#[derive(Debug, Deserialize)]
struct Leaderboard {
    #[serde(default)]
    tops: Vec<LeaderboardZone>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardZone {
    #[serde(default)]
    top: Vec<LeaderboardItem>,
}

/// One leaderboard row. `score` is the run time in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardItem {
    pub account_id: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub score: u64,
}

/// Fetches leaderboard pages using whatever live-services token is currently
/// valid.
pub struct LeaderboardFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl LeaderboardFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, base_url: LIVE_BASE_URL.to_owned() }
    }

    /// Fetch the world top-10 for one map. Entries of the first (world) zone
    /// only; the endpoint returns no other zones for this query.
    pub async fn fetch_top(
        &self,
        map_uid: &str,
        tokens: &mut TokenStore,
    ) -> Result<Vec<LeaderboardItem>, WatchError> {
        let access_token = tokens.valid_access_token(Audience::NadeoLiveServices).await?;

        let resp = self
            .client
            .get(leaderboard_url(&self.base_url, map_uid))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("nadeo_v1 t={access_token}"),
            )
            .send()
            .await
            .map_err(|e| {
                WatchError::fetch(format!("leaderboard request for {map_uid} failed: {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(WatchError::fetch(format!(
                "leaderboard request for {map_uid} returned {}",
                resp.status()
            )));
        }

        let board: Leaderboard = resp.json().await.map_err(|e| {
            WatchError::fetch(format!("malformed leaderboard response for {map_uid}: {e}"))
        })?;

        Ok(board.tops.into_iter().next().map(|zone| zone.top).unwrap_or_default())
    }
}
