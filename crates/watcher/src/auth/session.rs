// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session ticket acquisition from basic credentials.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::auth::{Credentials, Session};
use crate::error::WatchError;

const SESSION_URL: &str = "https://public-ubiservices.ubi.com/v3/profiles/sessions";

/// Fixed application id the session endpoint requires alongside the
/// basic credentials.
const UBI_APP_ID: &str = "86263886-327a-4328-ac69-527f0d20a237";

const MAX_ATTEMPTS: u32 = 5;

/// Fields of the session response the watcher consumes. The endpoint returns
/// many more (profile, platform, session keys); they are ignored.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    ticket: String,
    /// RFC 3339 timestamp.
    expiration: String,
}

/// Mints session tickets from basic credentials.
pub struct SessionAuthenticator {
    client: reqwest::Client,
    url: String,
}

impl SessionAuthenticator {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, url: SESSION_URL.to_owned() }
    }

    /// Authenticate with retries.
    ///
    /// Transient failures (transport, non-2xx, malformed payload) are retried
    /// with a short doubling delay up to [`MAX_ATTEMPTS`]; after that the last
    /// error escalates as an authentication failure.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, WatchError> {
        let mut delay = Duration::from_secs(1);
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self.request_session(credentials).await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    tracing::warn!(attempt, err = %e, "session request failed");
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_secs(30));
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| WatchError::authentication("session retries exhausted")))
    }

    async fn request_session(&self, credentials: &Credentials) -> Result<Session, WatchError> {
        let basic =
            STANDARD.encode(format!("{}:{}", credentials.email, credentials.password));
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("Ubi-AppId", UBI_APP_ID)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {basic}"))
            .send()
            .await
            .map_err(|e| WatchError::authentication(format!("session request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WatchError::authentication(format!(
                "session request returned {}",
                resp.status()
            )));
        }

        let body: SessionResponse = resp
            .json()
            .await
            .map_err(|e| WatchError::authentication(format!("malformed session response: {e}")))?;

        let expires_at_ms = chrono::DateTime::parse_from_rfc3339(&body.expiration)
            .map_err(|e| {
                WatchError::authentication(format!(
                    "unparseable session expiration {:?}: {e}",
                    body.expiration
                ))
            })?
            .timestamp_millis() as u64;

        Ok(Session { ticket: body.ticket, expires_at_ms })
    }
}
