//! Tests for the TTL position cache.

use chess_rooms::{Clock, EngineMetrics, ManualClock, PeriodicTask, PositionCache};
use chrono::TimeDelta;
use std::sync::Arc;

fn setup(ttl: TimeDelta, capacity: usize) -> (Arc<ManualClock>, EngineMetrics, PositionCache) {
    let clock = Arc::new(ManualClock::starting_now());
    let metrics = EngineMetrics::unregistered();
    let cache = PositionCache::new(ttl, capacity, clock.clone(), metrics.clone());
    (clock, metrics, cache)
}

#[test]
fn test_entry_expires_exactly_at_ttl() {
    let (clock, _, cache) = setup(TimeDelta::hours(1), 16);
    cache.set("k", 1.5);

    clock.advance(TimeDelta::hours(1) - TimeDelta::milliseconds(1));
    assert_eq!(cache.get("k"), Some(1.5));

    clock.advance(TimeDelta::milliseconds(2));
    assert_eq!(cache.get("k"), None);
    // Still stored until swept.
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_miss_on_unknown_key() {
    let (_, metrics, cache) = setup(TimeDelta::hours(1), 16);
    assert_eq!(cache.get("missing"), None);
    assert_eq!(metrics.cache_misses.get(), 1);
    assert_eq!(metrics.cache_hits.get(), 0);
}

#[test]
fn test_hits_and_misses_are_counted() {
    let (_, metrics, cache) = setup(TimeDelta::hours(1), 16);
    cache.set("a", 0.0);
    cache.get("a");
    cache.get("a");
    cache.get("b");
    assert_eq!(metrics.cache_hits.get(), 2);
    assert_eq!(metrics.cache_misses.get(), 1);
}

#[test]
fn test_sweep_removes_only_expired_entries() {
    let (clock, _, cache) = setup(TimeDelta::minutes(10), 16);
    cache.set("old", 1.0);
    clock.advance(TimeDelta::minutes(6));
    cache.set("new", 2.0);
    clock.advance(TimeDelta::minutes(5));

    assert_eq!(cache.run_once().unwrap(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("new"), Some(2.0));
    assert!(cache.entry("old").is_none());
}

#[test]
fn test_full_cache_replaces_least_recent_entry() {
    let (clock, _, cache) = setup(TimeDelta::hours(1), 2);
    cache.set("first", 1.0);
    clock.advance(TimeDelta::seconds(1));
    cache.set("second", 2.0);
    clock.advance(TimeDelta::seconds(1));
    cache.set("third", 3.0);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("first"), None);
    assert_eq!(cache.get("second"), Some(2.0));
    assert_eq!(cache.get("third"), Some(3.0));
}

#[test]
fn test_hit_keeps_entry_alive_when_full() {
    let (_, _, cache) = setup(TimeDelta::hours(1), 2);
    cache.set("a", 1.0);
    cache.set("b", 2.0);
    assert_eq!(cache.get("a"), Some(1.0));
    cache.set("c", 3.0);

    assert_eq!(cache.len(), 2);
    assert!(cache.entry("b").is_none());
    assert_eq!(cache.get("a"), Some(1.0));
    assert_eq!(cache.get("c"), Some(3.0));
}

#[test]
fn test_hit_does_not_extend_ttl() {
    let (clock, _, cache) = setup(TimeDelta::seconds(10), 2);
    cache.set("a", 1.0);
    clock.advance(TimeDelta::seconds(9));
    assert_eq!(cache.get("a"), Some(1.0));
    clock.advance(TimeDelta::seconds(1));
    assert_eq!(cache.get("a"), None);
}

#[test]
fn test_rewriting_refreshes_age() {
    let (clock, _, cache) = setup(TimeDelta::hours(1), 2);
    cache.set("a", 1.0);
    clock.advance(TimeDelta::seconds(1));
    cache.set("b", 2.0);
    clock.advance(TimeDelta::seconds(1));
    cache.set("a", 1.0);
    clock.advance(TimeDelta::seconds(1));
    cache.set("c", 3.0);

    assert!(cache.entry("b").is_none());
    assert!(cache.entry("a").is_some());
    assert_eq!(cache.entry("a").unwrap().inserted_at(), &(clock.now() - TimeDelta::seconds(1)));
}

#[test]
fn test_zero_capacity_stores_nothing() {
    let (_, _, cache) = setup(TimeDelta::hours(1), 0);
    cache.set("a", 1.0);
    assert!(cache.is_empty());
}

#[test]
fn test_clear_empties_cache() {
    let (_, _, cache) = setup(TimeDelta::hours(1), 8);
    cache.set("a", 1.0);
    cache.set("b", 2.0);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.name(), "cache_sweep");
}
