// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display-name resolution against the OAuth-protected name service.
//!
//! The name service is a separate system from the session/audience chain:
//! it uses a plain client-credentials grant with its own token lifecycle.
//! Resolved names are cached for the process lifetime; names change rarely
//! enough that staleness is an accepted tradeoff.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::auth::{epoch_ms, is_close_to_expiry};
use crate::error::WatchError;

const TOKEN_URL: &str = "https://api.trackmania.com/api/access_token";
const NAMES_URL: &str = "https://api.trackmania.com/api/display-names";

/// Upstream hard limit on ids per batch lookup.
pub const NAME_BATCH_LIMIT: usize = 50;

/// Placeholder used for players whose name could not be resolved.
pub const UNKNOWN_NAME: &str = "unknown";

/// Client-credentials pair for the name service.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug)]
struct OauthToken {
    access_token: String,
    expires_at_ms: u64,
}

#[derive(Debug, Deserialize)]
struct OauthTokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Batched account-id → display-name lookups with a permanent cache.
pub struct DisplayNameResolver {
    client: reqwest::Client,
    token_url: String,
    names_url: String,
    credentials: ClientCredentials,
    token: Option<OauthToken>,
    cache: HashMap<String, String>,
}

impl DisplayNameResolver {
    pub fn new(client: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self {
            client,
            token_url: TOKEN_URL.to_owned(),
            names_url: NAMES_URL.to_owned(),
            credentials,
            token: None,
            cache: HashMap::new(),
        }
    }

    /// Resolve account ids to display names, cache-first.
    ///
    /// Only uncached ids hit the network, in batches of at most
    /// [`NAME_BATCH_LIMIT`]. The returned mapping covers every id the
    /// service knows; callers substitute [`UNKNOWN_NAME`] for the rest.
    pub async fn resolve(
        &mut self,
        account_ids: &[String],
    ) -> Result<HashMap<String, String>, WatchError> {
        let mut resolved: HashMap<String, String> = account_ids
            .iter()
            .filter_map(|id| self.cache.get(id).map(|name| (id.clone(), name.clone())))
            .collect();

        for batch in self.batch_plan(account_ids) {
            self.ensure_token().await?;
            let names = self.fetch_batch(&batch).await?;
            for (id, name) in names {
                self.cache.insert(id.clone(), name.clone());
                resolved.insert(id, name);
            }
        }

        Ok(resolved)
    }

    /// Batches of uncached ids: deduplicated, input order preserved, at most
    /// [`NAME_BATCH_LIMIT`] per batch.
    fn batch_plan(&self, account_ids: &[String]) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        let uncached: Vec<String> = account_ids
            .iter()
            .filter(|id| !self.cache.contains_key(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();
        uncached.chunks(NAME_BATCH_LIMIT).map(<[String]>::to_vec).collect()
    }

    async fn ensure_token(&mut self) -> Result<(), WatchError> {
        if let Some(token) = &self.token {
            if !is_close_to_expiry(token.expires_at_ms, epoch_ms()) {
                return Ok(());
            }
        }

        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WatchError::resolution(format!("name-service token request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WatchError::resolution(format!(
                "name-service token request returned {}",
                resp.status()
            )));
        }

        let body: OauthTokenResponse = resp.json().await.map_err(|e| {
            WatchError::resolution(format!("malformed name-service token response: {e}"))
        })?;
        if body.access_token.is_empty() {
            return Err(WatchError::resolution("name-service token response missing access token"));
        }

        tracing::debug!(expires_in = body.expires_in, "obtained name-service token");
        self.token = Some(OauthToken {
            access_token: body.access_token,
            expires_at_ms: epoch_ms() + body.expires_in.saturating_mul(1000),
        });
        Ok(())
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<HashMap<String, String>, WatchError> {
        let Some(token) = &self.token else {
            return Err(WatchError::resolution("name lookup without a token"));
        };

        let query: Vec<(&str, &str)> =
            ids.iter().map(|id| ("accountId[]", id.as_str())).collect();
        let resp = self
            .client
            .get(&self.names_url)
            .query(&query)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| {
                WatchError::resolution(format!("display-name lookup failed: {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(WatchError::resolution(format!(
                "display-name lookup returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| WatchError::resolution(format!("malformed display-name response: {e}")))
    }
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
