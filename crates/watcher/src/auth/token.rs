// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audience token issue and refresh against the core auth service.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::auth::{Audience, AudienceToken, Session};
use crate::error::WatchError;

const ISSUE_URL: &str =
    "https://prod.trackmania.core.nadeo.online/v2/authentication/token/ubiservices";
const REFRESH_URL: &str =
    "https://prod.trackmania.core.nadeo.online/v2/authentication/token/refresh";

/// Access/refresh pair as returned by both the issue and refresh endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

/// Decode the `exp` claim (epoch seconds) from a signed token's payload
/// segment, as epoch milliseconds.
///
/// Returns 0 when the token is malformed or the claim is absent, which makes
/// the token look expired and forces a renewal on first use.
pub fn token_expiry_ms(token: &str) -> u64 {
    #[derive(Deserialize)]
    struct Claims {
        #[serde(default)]
        exp: u64,
    }

    let Some(payload) = token.split('.').nth(1) else {
        return 0;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload) else {
        return 0;
    };
    match serde_json::from_slice::<Claims>(&bytes) {
        Ok(claims) => claims.exp.saturating_mul(1000),
        Err(_) => 0,
    }
}

fn into_audience_token(
    resp: TokenPairResponse,
    audience: Audience,
) -> Result<AudienceToken, WatchError> {
    if resp.access_token.is_empty() {
        return Err(WatchError::authentication(format!(
            "token response for {audience} missing access token"
        )));
    }
    Ok(AudienceToken {
        access_expires_at_ms: token_expiry_ms(&resp.access_token),
        refresh_expires_at_ms: token_expiry_ms(&resp.refresh_token),
        access_token: resp.access_token,
        refresh_token: resp.refresh_token,
    })
}

/// Exchanges a session ticket for an audience-scoped token pair.
pub struct AudienceTokenIssuer {
    client: reqwest::Client,
    url: String,
}

impl AudienceTokenIssuer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, url: ISSUE_URL.to_owned() }
    }

    /// Full re-authentication for one audience from the current session.
    pub async fn issue(
        &self,
        session: &Session,
        audience: Audience,
    ) -> Result<AudienceToken, WatchError> {
        let resp = self
            .client
            .post(&self.url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("ubi_v1 t={}", session.ticket),
            )
            .json(&serde_json::json!({ "audience": audience.as_str() }))
            .send()
            .await
            .map_err(|e| {
                WatchError::authentication(format!("token request for {audience} failed: {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(WatchError::authentication(format!(
                "token request for {audience} returned {}",
                resp.status()
            )));
        }

        let pair: TokenPairResponse = resp.json().await.map_err(|e| {
            WatchError::authentication(format!("malformed token response for {audience}: {e}"))
        })?;
        into_audience_token(pair, audience)
    }
}

/// Exchanges a refresh token for a new pair without touching the session.
pub struct TokenRefresher {
    client: reqwest::Client,
    url: String,
}

impl TokenRefresher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, url: REFRESH_URL.to_owned() }
    }

    /// One refresh exchange. Never retried here; a failure escalates to the
    /// caller's backoff loop.
    pub async fn refresh(
        &self,
        previous: &AudienceToken,
        audience: Audience,
    ) -> Result<AudienceToken, WatchError> {
        tracing::debug!(%audience, "refreshing audience token");
        let resp = self
            .client
            .post(&self.url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("nadeo_v1 t={}", previous.refresh_token),
            )
            .json(&serde_json::json!({ "audience": audience.as_str() }))
            .send()
            .await
            .map_err(|e| {
                WatchError::authentication(format!("refresh for {audience} failed: {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(WatchError::authentication(format!(
                "refresh for {audience} returned {}",
                resp.status()
            )));
        }

        let pair: TokenPairResponse = resp.json().await.map_err(|e| {
            WatchError::authentication(format!("malformed refresh response for {audience}: {e}"))
        })?;
        into_audience_token(pair, audience)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
