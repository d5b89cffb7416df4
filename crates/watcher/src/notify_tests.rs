// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::diff::RecordUpdate;

#[yare::parameterized(
    sub_minute    = { 9_000, "0:09.000" },
    with_millis   = { 83_123, "1:23.123" },
    exact_minute  = { 60_000, "1:00.000" },
    with_hours    = { 3_723_456, "1:2:03.456" },
    zero          = { 0, "0:00.000" },
)]
fn formats_run_times(ms: u64, expected: &str) {
    assert_eq!(format_time(ms), expected);
}

fn report() -> UpdatedRecords {
    [
        (
            "MapA".to_owned(),
            vec![
                RecordUpdate {
                    position: 1,
                    player_name: "X".to_owned(),
                    time_ms: 9_000,
                    timestamp: "t".to_owned(),
                },
                RecordUpdate {
                    position: 2,
                    player_name: "Y".to_owned(),
                    time_ms: 9_500,
                    timestamp: "t".to_owned(),
                },
            ],
        ),
        (
            "MapB".to_owned(),
            vec![RecordUpdate {
                position: 1,
                player_name: "Z".to_owned(),
                time_ms: 61_250,
                timestamp: "t".to_owned(),
            }],
        ),
    ]
    .into_iter()
    .collect()
}

#[test]
fn renders_one_block_per_map() {
    let outcome = CycleOutcome::NewRecords(report());
    let n = render(&outcome).unwrap_or_else(|| Notification {
        title: String::new(),
        message: String::new(),
        tags: vec![],
    });

    assert_eq!(n.title, "New records");
    assert_eq!(
        n.message,
        "=> MapA\n1. X - 0:09.000\n2. Y - 0:09.500\n\n=> MapB\n1. Z - 1:01.250"
    );
    assert_eq!(n.tags, ["page_facing_up"]);
}

#[test]
fn quiet_cycles_render_nothing() {
    assert!(render(&CycleOutcome::Quiet { empty_streak: 2 }).is_none());
}

#[test]
fn quiet_alert_renders_a_notice() {
    let n = render(&CycleOutcome::QuietAlert);
    assert!(matches!(n, Some(n) if n.title == "No new records"));
}

#[test]
fn short_message_is_untouched() {
    assert_eq!(truncate("hello", 10), "hello");
}

#[test]
fn long_message_is_cut_with_ellipsis() {
    let long = "x".repeat(40);
    let cut = truncate(&long, 20);
    assert_eq!(cut.chars().count(), 20);
    assert!(cut.ends_with("..."));
}

#[test]
fn message_at_exact_limit_is_untouched() {
    let msg = "y".repeat(20);
    assert_eq!(truncate(&msg, 20), msg);
}
