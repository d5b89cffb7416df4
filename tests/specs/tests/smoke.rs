// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-validation smoke tests against the real `tmwatch` binary.

use tmwatch_specs::{combined_output, run_check, run_check_at};

fn complete_config() -> serde_json::Value {
    serde_json::json!({
        "user_agent": "records-watcher smoke / ops@example.org",
        "session": { "email": "bot@example.org", "password": "hunter2" },
        "exchange": { "author_user_id": 12345 },
        "oauth": { "client_id": "cid", "client_secret": "csecret" },
        "notifications": {
            "ntfy": { "base_url": "https://ntfy.example.org", "topic": "records" },
            "empty_count_before_notify": 3
        }
    })
}

#[test]
fn check_accepts_a_complete_config() -> anyhow::Result<()> {
    let (output, _dir) = run_check(&complete_config())?;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("configuration OK"));
    Ok(())
}

#[test]
fn check_lists_every_missing_field() -> anyhow::Result<()> {
    let (output, _dir) = run_check(&serde_json::json!({}))?;

    assert!(!output.status.success());
    let text = combined_output(&output);
    for field in [
        "user_agent",
        "session.email",
        "session.password",
        "exchange.author_user_id",
        "oauth.client_id",
        "oauth.client_secret",
    ] {
        assert!(text.contains(field), "missing {field} in: {text}");
    }
    Ok(())
}

#[test]
fn check_reports_partial_config() -> anyhow::Result<()> {
    let mut config = complete_config();
    if let Some(obj) = config.as_object_mut() {
        obj.remove("oauth");
    }
    let (output, _dir) = run_check(&config)?;

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("oauth.client_id"), "{text}");
    assert!(text.contains("oauth.client_secret"), "{text}");
    assert!(!text.contains("session.email"), "{text}");
    Ok(())
}

#[test]
fn check_fails_on_absent_config_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = run_check_at(&dir.path().join("nope.json"))?;

    assert!(!output.status.success());
    Ok(())
}

#[test]
fn check_fails_on_malformed_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json")?;
    let output = run_check_at(&path)?;

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("cannot parse"), "{text}");
    Ok(())
}
