// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Get-or-refresh token state for the chained auth services.
//!
//! Holds at most one live session and one live token pair per audience.
//! Renewal decisions are pure functions over (state, now) so they can be
//! tested with plain timestamps.

use std::collections::HashMap;

use crate::auth::session::SessionAuthenticator;
use crate::auth::token::{AudienceTokenIssuer, TokenRefresher};
use crate::auth::{epoch_ms, is_close_to_expiry, Audience, AudienceToken, Credentials, Session};
use crate::error::WatchError;

/// What to do for an audience's token pair this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenAction {
    /// No pair, or the refresh token is near expiry: full re-issue from the
    /// session ticket.
    Issue,
    /// Access token near expiry but refresh token still good: refresh
    /// exchange, session untouched.
    Refresh,
    /// Cached pair is still valid.
    Keep,
}

/// A new session is needed when none exists or the current one is close to
/// expiry.
pub(crate) fn session_needs_renewal(session: Option<&Session>, now_ms: u64) -> bool {
    match session {
        None => true,
        Some(s) => is_close_to_expiry(s.expires_at_ms, now_ms),
    }
}

pub(crate) fn token_action(token: Option<&AudienceToken>, now_ms: u64) -> TokenAction {
    match token {
        None => TokenAction::Issue,
        Some(t) if is_close_to_expiry(t.refresh_expires_at_ms, now_ms) => TokenAction::Issue,
        Some(t) if is_close_to_expiry(t.access_expires_at_ms, now_ms) => TokenAction::Refresh,
        Some(_) => TokenAction::Keep,
    }
}

/// Chained credential state, injected into the polling loop.
///
/// Not safe for concurrent use; the loop runs at most one cycle at a time
/// and holds the store mutably for its duration.
pub struct TokenStore {
    credentials: Credentials,
    authenticator: SessionAuthenticator,
    issuer: AudienceTokenIssuer,
    refresher: TokenRefresher,
    session: Option<Session>,
    tokens: HashMap<Audience, AudienceToken>,
}

impl TokenStore {
    pub fn new(
        credentials: Credentials,
        authenticator: SessionAuthenticator,
        issuer: AudienceTokenIssuer,
        refresher: TokenRefresher,
    ) -> Self {
        Self {
            credentials,
            authenticator,
            issuer,
            refresher,
            session: None,
            tokens: HashMap::new(),
        }
    }

    /// Return an access token for `audience` that will outlive the next
    /// request, minting or renewing whichever links of the chain are stale.
    pub async fn valid_access_token(&mut self, audience: Audience) -> Result<String, WatchError> {
        let now = epoch_ms();

        if session_needs_renewal(self.session.as_ref(), now) {
            let session = self.authenticator.authenticate(&self.credentials).await?;
            tracing::info!(expires_at_ms = session.expires_at_ms, "minted new session");
            self.session = Some(session);
        }
        let Some(session) = self.session.as_ref() else {
            return Err(WatchError::authentication("session unavailable after renewal"));
        };

        match token_action(self.tokens.get(&audience), now) {
            TokenAction::Issue => {
                let token = self.issuer.issue(session, audience).await?;
                tracing::info!(%audience, "issued audience token");
                self.tokens.insert(audience, token);
            }
            TokenAction::Refresh => {
                // Remove first: the near-expiry pair is dead either way, and
                // the store must never hold two pairs for one audience.
                if let Some(previous) = self.tokens.remove(&audience) {
                    let token = self.refresher.refresh(&previous, audience).await?;
                    tracing::info!(%audience, "refreshed audience token");
                    self.tokens.insert(audience, token);
                }
            }
            TokenAction::Keep => {}
        }

        match self.tokens.get(&audience) {
            Some(token) => Ok(token.access_token.clone()),
            None => Err(WatchError::authentication(format!(
                "no token for {audience} after renewal"
            ))),
        }
    }

    /// Drop all cached credentials so the next call re-authenticates from
    /// scratch. Called by the backoff path after any cycle failure.
    pub fn clear(&mut self) {
        self.session = None;
        self.tokens.clear();
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
