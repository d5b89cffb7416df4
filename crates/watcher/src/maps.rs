// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Map list retrieval from the exchange site's API.
//!
//! The search endpoint pages with an `after=<lastId>` cursor and a `More`
//! flag; one call per page until the flag clears.

use serde::Deserialize;

use crate::error::WatchError;

const EXCHANGE_BASE_URL: &str = "https://trackmania.exchange";

/// Fields requested from the search endpoint; everything else is dead weight.
const MAP_FIELDS: &[&str] = &[
    "MapId",
    "Name",
    "MapUid",
    "GbxMapName",
    "Medals.Author",
    "UploadedAt",
    "UpdatedAt",
];

/// One map row as the exchange API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeMap {
    #[serde(rename = "MapId")]
    pub map_id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MapUid")]
    pub map_uid: String,
    #[serde(rename = "GbxMapName", default)]
    pub gbx_name: String,
    #[serde(rename = "Medals", default)]
    pub medals: Medals,
    #[serde(rename = "UploadedAt", default)]
    pub uploaded_at: String,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Medals {
    #[serde(rename = "Author", default)]
    pub author: u64,
}

#[derive(Debug, Deserialize)]
struct MapPage {
    #[serde(rename = "Results", default)]
    results: Vec<ExchangeMap>,
    #[serde(rename = "More", default)]
    more: bool,
}

/// Client for one author's map list.
pub struct MapListClient {
    client: reqwest::Client,
    base_url: String,
    author_user_id: u64,
}

impl MapListClient {
    pub fn new(client: reqwest::Client, author_user_id: u64) -> Self {
        Self { client, base_url: EXCHANGE_BASE_URL.to_owned(), author_user_id }
    }

    /// Fetch every page of the author's maps.
    pub async fn fetch_all(&self) -> Result<Vec<ExchangeMap>, WatchError> {
        let mut results = Vec::new();
        let mut after = None;

        loop {
            let page = self.fetch_page(after).await?;
            let page_len = page.results.len();
            results.extend(page.results);
            // An empty page cannot advance the cursor; stop even if More is set.
            if !page.more || page_len == 0 {
                break;
            }
            after = results.last().map(|m: &ExchangeMap| m.map_id);
        }

        tracing::info!(count = results.len(), "retrieved map list");
        Ok(results)
    }

    async fn fetch_page(&self, after: Option<u64>) -> Result<MapPage, WatchError> {
        let url = format!("{}/api/maps", self.base_url);
        let fields = MAP_FIELDS.join(",");
        let author = self.author_user_id.to_string();
        let mut query: Vec<(&str, String)> =
            vec![("fields", fields), ("authoruserid", author)];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| WatchError::fetch(format!("map list request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WatchError::fetch(format!(
                "map list request returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| WatchError::fetch(format!("malformed map list response: {e}")))
    }
}
