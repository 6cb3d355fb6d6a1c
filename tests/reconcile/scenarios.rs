//! Merge scenarios through the public facade
//!
//! Each test drives `Reconciler::process` against a real in-process store
//! and checks what ends up stored, not just what is returned.

use crate::common::*;
use docmerge::{merge, Error};
use proptest::prelude::*;

#[test]
fn first_sight_sets_first_observed_to_observed() {
    let (store, reconciler) = memory_reconciler();
    let merged = reconciler.process(observation(1_000, "A")).unwrap();

    assert_eq!(merged.first_observed_at, 1_000);
    assert_eq!(merged.observed_at, 1_000);
    assert_eq!(store.get(URL).unwrap(), merged);
}

#[test]
fn newer_content_replaces_payload() {
    let (store, reconciler) = memory_reconciler();
    reconciler
        .process(Record::new(URL, 7, 100, "A"))
        .unwrap();
    let merged = reconciler
        .process(Record::new(URL, 8, 200, "B"))
        .unwrap();

    assert_eq!(merged.payload, "B");
    assert_eq!(merged.observed_at, 200);
    assert_eq!(merged.published_at, 7);
    assert_eq!(merged.first_observed_at, 100);
    assert_eq!(store.get(URL).unwrap(), merged);
}

#[test]
fn earlier_origin_lowers_first_observed() {
    let (store, reconciler) = memory_reconciler();
    reconciler
        .process(Record::new(URL, 111, 100, "A"))
        .unwrap();
    let merged = reconciler
        .process(Record::new(URL, 222, 50, "stale"))
        .unwrap();

    assert_eq!(merged.first_observed_at, 50);
    assert_eq!(merged.published_at, 222);
    assert_eq!(merged.payload, "A");
    assert_eq!(merged.observed_at, 100);
    assert_eq!(store.get(URL).unwrap(), merged);
}

#[test]
fn observation_between_bounds_changes_nothing() {
    let (store, reconciler) = memory_reconciler();
    reconciler.process(observation(100, "first")).unwrap();
    reconciler.process(observation(300, "latest")).unwrap();
    let before = store.get(URL).unwrap();

    let outcome = reconciler
        .process_outcome(observation(200, "middle"))
        .unwrap();
    assert!(outcome.is_unchanged());
    assert_eq!(store.get(URL).unwrap(), before);
}

#[test]
fn replaying_an_observation_is_idempotent() {
    let (store, reconciler) = memory_reconciler();
    let incoming = observation(500, "same");
    let once = reconciler.process(incoming.clone()).unwrap();
    let twice = reconciler.process(incoming).unwrap();

    assert_eq!(once, twice);
    assert_eq!(store.get(URL).unwrap(), once);
    assert_eq!(reconciler.stats().unchanged, 1);
}

#[test]
fn inbound_first_observed_is_ignored_on_first_sight() {
    let (_, reconciler) = memory_reconciler();
    let merged = reconciler
        .process(observation(900, "x").with_first_observed_at(1))
        .unwrap();
    assert_eq!(merged.first_observed_at, 900);
}

#[test]
fn keys_are_reconciled_independently() {
    let (store, reconciler) = memory_reconciler();
    reconciler
        .process(Record::new("http://a", 1, 10, "a"))
        .unwrap();
    reconciler
        .process(Record::new("http://b", 1, 5, "b"))
        .unwrap();
    reconciler
        .process(Record::new("http://a", 1, 20, "a2"))
        .unwrap();

    assert_eq!(store.get("http://a").unwrap().payload, "a2");
    assert_eq!(store.get("http://b").unwrap().payload, "b");
    assert_eq!(store.len(), 2);
}

#[test]
fn empty_url_is_rejected_and_nothing_is_stored() {
    let (store, reconciler) = memory_reconciler();
    let err = reconciler.process(Record::new("", 1, 1, "x")).unwrap_err();
    assert!(matches!(err, Error::InvalidRecord(_)));
    assert!(store.is_empty());
    assert_eq!(store.locks().tracked_keys(), 0);
}

#[test]
fn reconciler_matches_pure_merge() {
    let (_, reconciler) = memory_reconciler();
    let history = [
        observation(400, "d"),
        observation(100, "a"),
        observation(300, "c"),
        observation(200, "b"),
    ];

    let mut expected = None;
    for record in history.iter().cloned() {
        expected = Some(merge(expected, record.clone()).record);
        let stored = reconciler.process(record).unwrap();
        assert_eq!(Some(stored), expected);
    }
}

fn arbitrary_observation() -> impl Strategy<Value = Record> {
    (0u64..1_000, 0u64..64, "[a-z]{0,6}")
        .prop_map(|(published, fetch_time, text)| Record::new(URL, published, fetch_time, text))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_state_tracks_merge_fold(history in prop::collection::vec(arbitrary_observation(), 1..24)) {
        let (store, reconciler) = memory_reconciler();
        let mut expected = None;
        for record in history {
            expected = Some(merge(expected, record.clone()).record);
            let returned = reconciler.process(record).unwrap();
            prop_assert_eq!(Some(&returned), expected.as_ref());
            prop_assert_eq!(Some(store.get(URL).unwrap()), expected.clone());
        }
        prop_assert_eq!(store.locks().tracked_keys(), 0);
    }
}
