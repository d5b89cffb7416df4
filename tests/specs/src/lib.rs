// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for binary smoke tests.
//!
//! Spawns the real `tmwatch` binary in `--check` mode, which validates the
//! configuration and exits without touching the network.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolve the path to the compiled `tmwatch` binary.
pub fn tmwatch_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("tmwatch")
}

/// Run `tmwatch --check` against a config file written from `config`.
///
/// Returns the process output plus the temp dir holding the config (kept
/// alive so the file outlives the run).
pub fn run_check(config: &serde_json::Value) -> anyhow::Result<(Output, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(config)?)?;
    let output = run_check_at(&config_path)?;
    Ok((output, dir))
}

/// Run `tmwatch --check` against an arbitrary config path.
pub fn run_check_at(config_path: &Path) -> anyhow::Result<Output> {
    let binary = tmwatch_binary();
    anyhow::ensure!(binary.exists(), "tmwatch binary not found at {}", binary.display());

    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .arg("--check")
        .output()?;
    Ok(output)
}

/// Combined stdout + stderr as a lossy string.
pub fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
