// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::auth::EXPIRY_LOOKAHEAD_MS;

const NOW: u64 = 1_700_000_000_000;

const DAY_MS: u64 = 86_400_000;

fn token(access_in_ms: u64, refresh_in_ms: u64) -> AudienceToken {
    AudienceToken {
        access_token: "access".into(),
        access_expires_at_ms: NOW + access_in_ms,
        refresh_token: "refresh".into(),
        refresh_expires_at_ms: NOW + refresh_in_ms,
    }
}

fn session(expires_in_ms: u64) -> Session {
    Session { ticket: "ticket".into(), expires_at_ms: NOW + expires_in_ms }
}

// -- session renewal ----------------------------------------------------------

#[test]
fn missing_session_needs_renewal() {
    assert!(session_needs_renewal(None, NOW));
}

#[test]
fn near_expiry_session_needs_renewal() {
    assert!(session_needs_renewal(Some(&session(30_000)), NOW));
}

#[test]
fn valid_session_is_kept() {
    assert!(!session_needs_renewal(Some(&session(2 * EXPIRY_LOOKAHEAD_MS)), NOW));
}

// -- token pair decisions -----------------------------------------------------

#[test]
fn missing_pair_triggers_full_issue() {
    assert_eq!(token_action(None, NOW), TokenAction::Issue);
}

#[test]
fn access_near_expiry_with_valid_refresh_triggers_refresh_only() {
    // Access expires in 30s, refresh valid for a day: refresh exchange, not
    // a re-issue and not a new session.
    let t = token(30_000, DAY_MS);
    assert_eq!(token_action(Some(&t), NOW), TokenAction::Refresh);
}

#[test]
fn refresh_near_expiry_triggers_full_issue_even_with_valid_access() {
    let t = token(DAY_MS, 30_000);
    assert_eq!(token_action(Some(&t), NOW), TokenAction::Issue);
}

#[test]
fn valid_pair_is_kept() {
    let t = token(DAY_MS, 2 * DAY_MS);
    assert_eq!(token_action(Some(&t), NOW), TokenAction::Keep);
}

#[test]
fn undecodable_expiries_force_immediate_issue() {
    // Expiry 0 is the fail-safe for tokens whose claims did not decode.
    let t = AudienceToken {
        access_token: "access".into(),
        access_expires_at_ms: 0,
        refresh_token: "refresh".into(),
        refresh_expires_at_ms: 0,
    };
    assert_eq!(token_action(Some(&t), NOW), TokenAction::Issue);
}

#[yare::parameterized(
    one_ms_inside  = { EXPIRY_LOOKAHEAD_MS - 1, TokenAction::Refresh },
    exact_boundary = { EXPIRY_LOOKAHEAD_MS, TokenAction::Keep },
)]
fn access_expiry_boundary(access_in_ms: u64, expected: TokenAction) {
    let t = token(access_in_ms, DAY_MS);
    assert_eq!(token_action(Some(&t), NOW), expected);
}

// -- clear --------------------------------------------------------------------

#[test]
fn clear_discards_session_and_tokens() {
    let client = reqwest::Client::new();
    let mut store = TokenStore::new(
        Credentials { email: "a@b.c".into(), password: "pw".into() },
        SessionAuthenticator::new(client.clone()),
        AudienceTokenIssuer::new(client.clone()),
        TokenRefresher::new(client),
    );
    store.session = Some(session(DAY_MS));
    store.tokens.insert(Audience::NadeoLiveServices, token(DAY_MS, 2 * DAY_MS));

    store.clear();

    assert!(store.session.is_none());
    assert!(store.tokens.is_empty());
}
