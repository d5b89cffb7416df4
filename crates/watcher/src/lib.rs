// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmwatch: polls a map author's leaderboards, persists best-known records,
//! and notifies when new records appear.

pub mod auth;
pub mod config;
pub mod diff;
pub mod error;
pub mod leaderboard;
pub mod maps;
pub mod names;
pub mod notify;
pub mod persist;
pub mod poller;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::session::SessionAuthenticator;
use crate::auth::store::TokenStore;
use crate::auth::token::{AudienceTokenIssuer, TokenRefresher};
use crate::config::Config;
use crate::diff::DiffEngine;
use crate::leaderboard::LeaderboardFetcher;
use crate::maps::MapListClient;
use crate::names::DisplayNameResolver;
use crate::notify::{Notifier, NtfyClient};
use crate::persist::JsonStore;
use crate::poller::PollContext;

/// Run the watcher until the shutdown token fires.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(30))
        .build()?;

    let tokens = TokenStore::new(
        config.credentials.clone(),
        SessionAuthenticator::new(client.clone()),
        AudienceTokenIssuer::new(client.clone()),
        TokenRefresher::new(client.clone()),
    );
    let resolver = DisplayNameResolver::new(client.clone(), config.oauth.clone());
    let store = JsonStore::open(&config.state_file)?;

    let notifier = match &config.notifications.ntfy {
        Some(ntfy) => Notifier::Ntfy(NtfyClient::new(
            client.clone(),
            ntfy.base_url.clone(),
            ntfy.topic.clone(),
            ntfy.length_limit,
        )),
        None => {
            tracing::info!("ntfy not configured, notifications go to the log only");
            Notifier::Log
        }
    };

    let ctx = PollContext {
        maps: MapListClient::new(client.clone(), config.author_user_id),
        leaderboard: LeaderboardFetcher::new(client),
        tokens,
        resolver,
        store,
        notifier,
        diff: DiffEngine::new(config.notifications.empty_count_before_notify),
        poll: config.poll.clone(),
    };

    poller::run_poll_loop(ctx, shutdown).await;
    Ok(())
}
