// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot diffing and notification debounce.

use indexmap::IndexMap;

/// One best-known record row for a (map, player) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub player_id: String,
    pub player_name: String,
    pub position: u32,
    pub time_ms: u64,
    pub timestamp: String,
}

/// Per-map record rows, keyed by map name in map-list order.
pub type Snapshot = IndexMap<String, Vec<RecordRow>>;

/// A new-or-improved entry reported for one map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub position: u32,
    pub player_name: String,
    pub time_ms: u64,
    pub timestamp: String,
}

/// Map name → new-or-improved entries, in map order. Transient; consumed by
/// the notification sink immediately.
pub type UpdatedRecords = IndexMap<String, Vec<RecordUpdate>>;

/// What a completed cycle should do at the notification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New records found: notify, counter reset.
    NewRecords(UpdatedRecords),
    /// Empty diff below the threshold: stay quiet.
    Quiet { empty_streak: u32 },
    /// Empty-diff streak reached the threshold: emit one "no new records"
    /// notice, counter reset.
    QuietAlert,
}

/// Compares cycle snapshots and throttles "nothing changed" noise.
pub struct DiffEngine {
    empty_streak: u32,
    empty_count_before_notify: u32,
}

impl DiffEngine {
    pub fn new(empty_count_before_notify: u32) -> Self {
        Self { empty_streak: 0, empty_count_before_notify }
    }

    /// Entries in `current` with no (time, player) match in `previous`.
    /// A map absent from `previous` reports every entry.
    pub fn diff(previous: &Snapshot, current: &Snapshot) -> UpdatedRecords {
        let mut report = UpdatedRecords::new();

        for (map_name, rows) in current {
            let changed: Vec<RecordUpdate> = match previous.get(map_name) {
                None => rows.iter().map(to_update).collect(),
                Some(old_rows) => rows
                    .iter()
                    .filter(|row| {
                        !old_rows.iter().any(|old| {
                            old.time_ms == row.time_ms && old.player_name == row.player_name
                        })
                    })
                    .map(to_update)
                    .collect(),
            };
            if !changed.is_empty() {
                report.insert(map_name.clone(), changed);
            }
        }

        report
    }

    /// Fold one cycle's diff into the debounce state.
    pub fn observe(&mut self, report: UpdatedRecords) -> CycleOutcome {
        if report.is_empty() {
            self.empty_streak += 1;
            if self.empty_streak >= self.empty_count_before_notify {
                self.empty_streak = 0;
                CycleOutcome::QuietAlert
            } else {
                CycleOutcome::Quiet { empty_streak: self.empty_streak }
            }
        } else {
            self.empty_streak = 0;
            CycleOutcome::NewRecords(report)
        }
    }
}

fn to_update(row: &RecordRow) -> RecordUpdate {
    RecordUpdate {
        position: row.position,
        player_name: row.player_name.clone(),
        time_ms: row.time_ms,
        timestamp: row.timestamp.clone(),
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
