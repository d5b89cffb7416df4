// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn resolver() -> DisplayNameResolver {
    DisplayNameResolver::new(
        reqwest::Client::new(),
        ClientCredentials { client_id: "id".into(), client_secret: "secret".into() },
    )
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("account-{i:03}")).collect()
}

#[test]
fn one_hundred_twenty_uncached_ids_plan_three_batches() {
    let plan = resolver().batch_plan(&ids(120));
    let sizes: Vec<usize> = plan.iter().map(Vec::len).collect();
    assert_eq!(sizes, [50, 50, 20]);
}

#[test]
fn exact_limit_is_one_batch() {
    let plan = resolver().batch_plan(&ids(NAME_BATCH_LIMIT));
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].len(), NAME_BATCH_LIMIT);
}

#[test]
fn cached_ids_are_not_planned() {
    let mut r = resolver();
    let all = ids(60);
    for id in &all[..55] {
        r.cache.insert(id.clone(), "someone".into());
    }

    let plan = r.batch_plan(&all);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].len(), 5);
    assert!(plan[0].iter().all(|id| !r.cache.contains_key(id)));
}

#[test]
fn fully_cached_input_plans_no_batches() {
    let mut r = resolver();
    let all = ids(10);
    for id in &all {
        r.cache.insert(id.clone(), "someone".into());
    }
    assert!(r.batch_plan(&all).is_empty());
}

#[test]
fn duplicate_ids_are_planned_once() {
    let r = resolver();
    let mut all = ids(3);
    all.extend(ids(3));
    let plan = r.batch_plan(&all);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0], ids(3));
}

#[test]
fn plan_preserves_input_order() {
    let r = resolver();
    let all = vec!["b".to_owned(), "a".to_owned(), "c".to_owned()];
    let plan = r.batch_plan(&all);
    assert_eq!(plan[0], ["b", "a", "c"]);
}
