// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record persistence: the store interface the poll cycle consumes, plus a
//! JSON state-file implementation with atomic commits.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diff::RecordRow;
use crate::maps::ExchangeMap;
use crate::names::UNKNOWN_NAME;

/// A map row as persisted. Identity key is the in-game `map_uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecord {
    pub map_uid: String,
    pub exchange_id: u64,
    pub name: String,
    pub gbx_name: String,
    pub author_time_ms: u64,
    pub uploaded_at: String,
    pub updated_at: String,
}

impl MapRecord {
    pub fn from_exchange(map: &ExchangeMap) -> Self {
        Self {
            map_uid: map.map_uid.clone(),
            exchange_id: map.map_id,
            name: map.name.clone(),
            gbx_name: map.gbx_name.clone(),
            author_time_ms: map.medals.author,
            uploaded_at: map.uploaded_at.clone(),
            updated_at: map.updated_at.clone(),
        }
    }
}

/// Best-known time for one (map, player) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub time_ms: u64,
    pub timestamp: String,
}

/// Persistence consumed by the poll cycle.
///
/// Mutations stage in memory; `commit` makes them durable. One map's upserts
/// plus its name upserts form one commit, so a partial map update never
/// becomes the next cycle's diff baseline.
pub trait RecordStore {
    /// Upsert the map table. An existing row is replaced unless its
    /// `updated_at` is newer than the incoming one.
    fn upsert_maps(&mut self, maps: &[MapRecord]) -> anyhow::Result<()>;

    /// All known maps, in stable order.
    fn select_maps(&self) -> anyhow::Result<Vec<MapRecord>>;

    /// Record a time for (map, player), applied only when it strictly
    /// improves the stored time.
    fn upsert_record_better(
        &mut self,
        map_uid: &str,
        player_id: &str,
        time_ms: u64,
        timestamp: &str,
    ) -> anyhow::Result<()>;

    /// Merge resolved display names into the player table.
    fn upsert_player_names(&mut self, names: &BTreeMap<String, String>) -> anyhow::Result<()>;

    /// Best-known rows for one map, ordered by time, positions assigned from
    /// that order. Players without a known name get the placeholder.
    fn select_snapshot(&self, map_uid: &str) -> anyhow::Result<Vec<RecordRow>>;

    /// Player ids appearing in records but missing from the player table.
    fn select_names_needing_backfill(&self) -> anyhow::Result<Vec<String>>;

    /// Durably commit staged mutations.
    fn commit(&mut self) -> anyhow::Result<()>;
}

/// Whole persisted state of the watcher.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    /// map_uid → map row.
    #[serde(default)]
    maps: BTreeMap<String, MapRecord>,
    /// map_uid → player_id → best-known record.
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<String, StoredRecord>>,
    /// player_id → display name.
    #[serde(default)]
    players: BTreeMap<String, String>,
}

/// JSON state file. Mutations stage in [`StoreState`]; `commit` writes the
/// whole state atomically (unique temp file + rename).
pub struct JsonStore {
    path: PathBuf,
    state: StoreState,
}

impl JsonStore {
    /// Load existing state, or start empty when the file does not exist yet.
    /// A file that exists but fails to parse is a hard error: treating it as
    /// empty would re-notify every known record.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                anyhow::anyhow!("corrupt state file {}: {e}", path.display())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state })
    }

    fn save(&self) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.state)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    #[cfg(test)]
    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl RecordStore for JsonStore {
    fn upsert_maps(&mut self, maps: &[MapRecord]) -> anyhow::Result<()> {
        for map in maps {
            match self.state.maps.get(&map.map_uid) {
                Some(existing) if existing.updated_at > map.updated_at => {}
                _ => {
                    self.state.maps.insert(map.map_uid.clone(), map.clone());
                }
            }
        }
        Ok(())
    }

    fn select_maps(&self) -> anyhow::Result<Vec<MapRecord>> {
        Ok(self.state.maps.values().cloned().collect())
    }

    fn upsert_record_better(
        &mut self,
        map_uid: &str,
        player_id: &str,
        time_ms: u64,
        timestamp: &str,
    ) -> anyhow::Result<()> {
        let by_player = self.state.records.entry(map_uid.to_owned()).or_default();
        match by_player.get(player_id) {
            Some(existing) if existing.time_ms <= time_ms => {}
            _ => {
                by_player.insert(
                    player_id.to_owned(),
                    StoredRecord { time_ms, timestamp: timestamp.to_owned() },
                );
            }
        }
        Ok(())
    }

    fn upsert_player_names(&mut self, names: &BTreeMap<String, String>) -> anyhow::Result<()> {
        for (id, name) in names {
            self.state.players.insert(id.clone(), name.clone());
        }
        Ok(())
    }

    fn select_snapshot(&self, map_uid: &str) -> anyhow::Result<Vec<RecordRow>> {
        let Some(by_player) = self.state.records.get(map_uid) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<(&String, &StoredRecord)> = by_player.iter().collect();
        rows.sort_by(|a, b| a.1.time_ms.cmp(&b.1.time_ms).then_with(|| a.0.cmp(b.0)));

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(idx, (player_id, record))| RecordRow {
                player_id: player_id.clone(),
                player_name: self
                    .state
                    .players
                    .get(player_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_NAME.to_owned()),
                position: idx as u32 + 1,
                time_ms: record.time_ms,
                timestamp: record.timestamp.clone(),
            })
            .collect())
    }

    fn select_names_needing_backfill(&self) -> anyhow::Result<Vec<String>> {
        let missing: BTreeSet<String> = self
            .state
            .records
            .values()
            .flat_map(|by_player| by_player.keys())
            .filter(|id| !self.state.players.contains_key(*id))
            .cloned()
            .collect();
        Ok(missing.into_iter().collect())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.save()
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
