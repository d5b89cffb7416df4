// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outer poll loop: fetch, diff, notify, sleep, with error backoff.
//!
//! One cycle runs fully sequentially: each map is fetched, resolved, and
//! committed before the next map begins, so a mid-cycle failure leaves every
//! already-committed map with a consistent diff baseline. Any escalated
//! failure discards cached credentials and doubles the backoff delay, capped
//! at the configured maximum.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use crate::auth::store::TokenStore;
use crate::config::PollConfig;
use crate::diff::{CycleOutcome, DiffEngine, RecordRow, Snapshot};
use crate::leaderboard::LeaderboardFetcher;
use crate::maps::MapListClient;
use crate::names::{DisplayNameResolver, UNKNOWN_NAME};
use crate::notify::{self, Notifier};
use crate::persist::{MapRecord, RecordStore};

/// Everything one poll cycle needs, owned by the loop for its lifetime.
pub struct PollContext<S: RecordStore> {
    pub maps: MapListClient,
    pub leaderboard: LeaderboardFetcher,
    pub tokens: TokenStore,
    pub resolver: DisplayNameResolver,
    pub store: S,
    pub notifier: Notifier,
    pub diff: DiffEngine,
    pub poll: PollConfig,
}

/// Run poll cycles until the shutdown token fires.
///
/// Cancellation is between cycles only; an in-flight cycle runs to
/// completion or failure.
pub async fn run_poll_loop<S: RecordStore>(
    mut ctx: PollContext<S>,
    shutdown: CancellationToken,
) {
    let mut backoff = ctx.poll.initial_backoff;

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match run_cycle(&mut ctx).await {
            Ok(outcome) => {
                deliver(&ctx.notifier, &outcome).await;
                backoff = ctx.poll.initial_backoff;
                tracing::info!(
                    sleep_secs = ctx.poll.interval.as_secs(),
                    "cycle complete, sleeping"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ctx.poll.interval) => {}
                }
            }
            Err(e) => {
                tracing::error!(
                    err = format!("{e:#}"),
                    backoff_secs = backoff.as_secs(),
                    "poll cycle failed, backing off"
                );
                // Partially-built credentials are suspect after any failure:
                // force a full re-authentication on the next attempt.
                ctx.tokens.clear();

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                if backoff < ctx.poll.max_backoff {
                    backoff = (backoff * 2).min(ctx.poll.max_backoff);
                } else {
                    let alert = notify::render_failure(&format!("{e:#}"));
                    if let Err(send_err) = ctx.notifier.send(&alert).await {
                        tracing::warn!(err = %send_err, "failure alert delivery failed");
                    }
                }
            }
        }
    }

    tracing::info!("poll loop stopped");
}

/// One full cycle: map list → per-map leaderboards → diff.
async fn run_cycle<S: RecordStore>(ctx: &mut PollContext<S>) -> anyhow::Result<CycleOutcome> {
    let exchange_maps = ctx.maps.fetch_all().await?;
    let map_rows: Vec<MapRecord> = exchange_maps.iter().map(MapRecord::from_exchange).collect();
    ctx.store.upsert_maps(&map_rows)?;
    ctx.store.commit()?;

    let cycle_ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let mut previous = Snapshot::new();
    let mut current = Snapshot::new();

    for map in ctx.store.select_maps()? {
        // Baseline must be read before this cycle's upserts land.
        previous.insert(map.name.clone(), ctx.store.select_snapshot(&map.map_uid)?);

        let items = ctx.leaderboard.fetch_top(&map.map_uid, &mut ctx.tokens).await?;
        let account_ids: Vec<String> =
            items.iter().map(|item| item.account_id.clone()).collect();
        let names: BTreeMap<String, String> = match ctx.resolver.resolve(&account_ids).await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                tracing::warn!(
                    map = %map.map_uid,
                    err = %e,
                    "name resolution failed, using placeholders"
                );
                BTreeMap::new()
            }
        };

        for item in &items {
            ctx.store.upsert_record_better(
                &map.map_uid,
                &item.account_id,
                item.score,
                &cycle_ts,
            )?;
        }
        ctx.store.upsert_player_names(&names)?;
        backfill_names(ctx).await?;
        ctx.store.commit()?;

        let rows: Vec<RecordRow> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| RecordRow {
                player_id: item.account_id.clone(),
                player_name: names
                    .get(&item.account_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_NAME.to_owned()),
                position: idx as u32 + 1,
                time_ms: item.score,
                timestamp: cycle_ts.clone(),
            })
            .collect();
        tracing::debug!(map = %map.map_uid, rows = rows.len(), "map processed");
        current.insert(map.name.clone(), rows);
    }

    let report = DiffEngine::diff(&previous, &current);
    Ok(ctx.diff.observe(report))
}

/// Resolve names for stored records whose player is still unnamed (earlier
/// resolution failures). Best-effort: a failure here never fails the cycle.
async fn backfill_names<S: RecordStore>(ctx: &mut PollContext<S>) -> anyhow::Result<()> {
    let pending = ctx.store.select_names_needing_backfill()?;
    if pending.is_empty() {
        return Ok(());
    }

    match ctx.resolver.resolve(&pending).await {
        Ok(names) => {
            let names: BTreeMap<String, String> = names.into_iter().collect();
            if !names.is_empty() {
                ctx.store.upsert_player_names(&names)?;
            }
        }
        Err(e) => {
            tracing::warn!(pending = pending.len(), err = %e, "name backfill failed");
        }
    }
    Ok(())
}

async fn deliver(notifier: &Notifier, outcome: &CycleOutcome) {
    if let CycleOutcome::Quiet { empty_streak } = outcome {
        tracing::info!(empty_streak = *empty_streak, "no changes detected");
        return;
    }

    if let Some(notification) = notify::render(outcome) {
        if let Err(e) = notifier.send(&notification).await {
            tracing::warn!(err = %e, "notification delivery failed");
        }
    }
}
