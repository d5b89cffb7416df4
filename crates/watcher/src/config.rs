// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup configuration: the CLI surface plus the JSON config file.
//!
//! The file deserializes into [`FileConfig`] (everything optional), then
//! [`FileConfig::validate`] checks required-field rules eagerly and reports
//! every missing field at once rather than failing on the first.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::auth::Credentials;
use crate::names::ClientCredentials;

const DEFAULT_STATE_FILE: &str = "records.json";
const DEFAULT_EMPTY_COUNT_BEFORE_NOTIFY: u32 = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_INITIAL_BACKOFF_SECS: u64 = 30;
const DEFAULT_MAX_BACKOFF_SECS: u64 = 24 * 60 * 60;

/// Watches a map author's leaderboards and notifies on new records.
#[derive(Debug, Parser)]
#[command(name = "tmwatch", version, about)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, env = "TMWATCH_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Validate the configuration and exit without polling.
    #[arg(long)]
    pub check: bool,
}

/// Raw configuration as read from the file. All fields optional so that
/// validation can report every problem in one pass.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub user_agent: Option<String>,
    pub session: Option<SessionSection>,
    pub exchange: Option<ExchangeSection>,
    pub oauth: Option<OauthSection>,
    #[serde(default)]
    pub notifications: NotificationsSection,
    #[serde(default)]
    pub poll: PollSection,
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExchangeSection {
    pub author_user_id: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OauthSection {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NotificationsSection {
    pub ntfy: Option<NtfySection>,
    pub empty_count_before_notify: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NtfySection {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub topic: String,
    pub length_limit: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PollSection {
    pub interval_secs: Option<u64>,
    pub initial_backoff_secs: Option<u64>,
    pub max_backoff_secs: Option<u64>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub user_agent: String,
    pub credentials: Credentials,
    pub author_user_id: u64,
    pub oauth: ClientCredentials,
    pub notifications: NotificationsConfig,
    pub poll: PollConfig,
    pub state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    pub ntfy: Option<NtfyConfig>,
    pub empty_count_before_notify: u32,
}

#[derive(Debug, Clone)]
pub struct NtfyConfig {
    pub base_url: String,
    pub topic: String,
    pub length_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Check required-field rules and resolve defaults.
    ///
    /// Reports every missing field in one error so a fresh deployment can be
    /// fixed in one edit.
    pub fn validate(self) -> anyhow::Result<Config> {
        let mut missing = Vec::new();

        let required = |missing: &mut Vec<&str>, field: &'static str, value: &str| {
            if value.is_empty() {
                missing.push(field);
            }
        };

        required(&mut missing, "user_agent", self.user_agent.as_deref().unwrap_or_default());

        let session = self.session.clone().unwrap_or_default();
        required(&mut missing, "session.email", &session.email);
        required(&mut missing, "session.password", &session.password);

        let author_user_id = self.exchange.as_ref().and_then(|e| e.author_user_id);
        if author_user_id.is_none() {
            missing.push("exchange.author_user_id");
        }

        let oauth = self.oauth.clone().unwrap_or_default();
        required(&mut missing, "oauth.client_id", &oauth.client_id);
        required(&mut missing, "oauth.client_secret", &oauth.client_secret);

        if let Some(ntfy) = &self.notifications.ntfy {
            required(&mut missing, "notifications.ntfy.base_url", &ntfy.base_url);
            required(&mut missing, "notifications.ntfy.topic", &ntfy.topic);
        }

        if !missing.is_empty() {
            anyhow::bail!("invalid configuration, missing: {}", missing.join(", "));
        }

        Ok(Config {
            // Guarded by the checks above.
            user_agent: self.user_agent.unwrap_or_default(),
            credentials: Credentials { email: session.email, password: session.password },
            author_user_id: author_user_id.unwrap_or_default(),
            oauth: ClientCredentials {
                client_id: oauth.client_id,
                client_secret: oauth.client_secret,
            },
            notifications: NotificationsConfig {
                ntfy: self.notifications.ntfy.map(|n| NtfyConfig {
                    base_url: n.base_url,
                    topic: n.topic,
                    length_limit: n.length_limit,
                }),
                empty_count_before_notify: self
                    .notifications
                    .empty_count_before_notify
                    .unwrap_or(DEFAULT_EMPTY_COUNT_BEFORE_NOTIFY),
            },
            poll: PollConfig {
                interval: Duration::from_secs(
                    self.poll.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
                ),
                initial_backoff: Duration::from_secs(
                    self.poll.initial_backoff_secs.unwrap_or(DEFAULT_INITIAL_BACKOFF_SECS),
                ),
                max_backoff: Duration::from_secs(
                    self.poll.max_backoff_secs.unwrap_or(DEFAULT_MAX_BACKOFF_SECS),
                ),
            },
            state_file: self.state_file.unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
