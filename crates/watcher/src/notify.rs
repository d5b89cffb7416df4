// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record-update notifications: ntfy push with a log-only fallback.
//!
//! The poll cycle hands a [`CycleOutcome`] to [`render`]; whatever comes out
//! goes to the configured sink. The sink never fails the cycle: a lost
//! notification is logged and the records are still persisted.

use crate::diff::{CycleOutcome, UpdatedRecords};
use crate::error::WatchError;

/// A rendered notification, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub tags: Vec<&'static str>,
}

/// Render a cycle outcome into a notification, or nothing for quiet cycles
/// below the debounce threshold.
pub fn render(outcome: &CycleOutcome) -> Option<Notification> {
    match outcome {
        CycleOutcome::NewRecords(report) => Some(Notification {
            title: "New records".to_owned(),
            message: render_report(report),
            tags: vec!["page_facing_up"],
        }),
        CycleOutcome::Quiet { .. } => None,
        CycleOutcome::QuietAlert => Some(Notification {
            title: "No new records".to_owned(),
            message: "Polling completed successfully, but no new records were found".to_owned(),
            tags: vec!["black_small_square"],
        }),
    }
}

/// One notification for a poll loop that keeps failing at maximum backoff.
pub fn render_failure(err: &str) -> Notification {
    Notification {
        title: "Record polling failing".to_owned(),
        message: format!("Polling has reached maximum backoff; latest error: {err}"),
        tags: vec!["warning"],
    }
}

fn render_report(report: &UpdatedRecords) -> String {
    report
        .iter()
        .map(|(map_name, updates)| {
            let lines: Vec<String> = updates
                .iter()
                .map(|u| format!("{}. {} - {}", u.position, u.player_name, format_time(u.time_ms)))
                .collect();
            format!("=> {map_name}\n{}", lines.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a run time as `m:ss.mmm`, with an hour prefix when it matters.
pub fn format_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    if hours > 0 {
        format!("{hours}:{minutes}:{seconds:02}.{millis:03}")
    } else {
        format!("{minutes}:{seconds:02}.{millis:03}")
    }
}

/// Where notifications go.
pub enum Notifier {
    /// POST to an ntfy topic.
    Ntfy(NtfyClient),
    /// No push configured: notifications land in the log only.
    Log,
}

impl Notifier {
    pub async fn send(&self, notification: &Notification) -> Result<(), WatchError> {
        match self {
            Self::Ntfy(client) => client.send(notification).await,
            Self::Log => {
                tracing::info!(
                    title = %notification.title,
                    message = %notification.message,
                    "notification (log only)"
                );
                Ok(())
            }
        }
    }
}

/// ntfy push client.
pub struct NtfyClient {
    client: reqwest::Client,
    base_url: String,
    topic: String,
    length_limit: Option<usize>,
}

impl NtfyClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        topic: String,
        length_limit: Option<usize>,
    ) -> Self {
        Self { client, base_url, topic, length_limit }
    }

    async fn send(&self, notification: &Notification) -> Result<(), WatchError> {
        let message = match self.length_limit {
            Some(limit) => truncate(&notification.message, limit),
            None => notification.message.clone(),
        };

        let resp = self
            .client
            .post(&self.base_url)
            .json(&serde_json::json!({
                "topic": self.topic,
                "title": notification.title,
                "message": message,
                "tags": notification.tags,
            }))
            .send()
            .await
            .map_err(|e| WatchError::fetch(format!("notification send failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(WatchError::fetch(format!(
                "notification send returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Truncate to `limit` characters, marking the cut with an ellipsis.
fn truncate(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_owned();
    }
    tracing::warn!(
        len = message.chars().count(),
        limit,
        "notification message too long, truncating"
    );
    let kept: String = message.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
