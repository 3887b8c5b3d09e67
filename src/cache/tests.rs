//! Concurrency properties and end-to-end dashboard scenarios

use super::registry::refresh_callback;
use super::store::{CacheLookup, CacheStore};
use super::RefreshCallback;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn constant(calls: &Arc<AtomicUsize>, value: Value) -> RefreshCallback {
    let calls = Arc::clone(calls);
    refresh_callback(move || {
        let calls = Arc::clone(&calls);
        let value = value.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    })
}

async fn wait_until_idle(store: &CacheStore, full_key: &str) {
    for _ in 0..300 {
        let report = store.get_stats();
        if report.entry(full_key).is_some_and(|e| !e.is_updating) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} still updating", full_key);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_gets_share_one_fetch() {
    let store = Arc::new(CacheStore::with_defaults());
    let calls = Arc::new(AtomicUsize::new(0));
    let slow = {
        let calls = Arc::clone(&calls);
        refresh_callback(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!({"volume": 1234}))
            }
        })
    };

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let callback = slow.clone();
        handles.push(tokio::spawn(async move {
            store.get("solana", "dex-volume", Some(callback)).await
        }));
    }

    for handle in handles {
        let lookup = handle.await.unwrap();
        assert_eq!(lookup.value.as_deref(), Some(&json!({"volume": 1234})));
        assert!(lookup.is_fresh);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_reads_never_overlap_refreshes() {
    let store = Arc::new(CacheStore::with_defaults());
    store.set("pairs", "sonic-pairs", json!([])).await;

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let callback = {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        refresh_callback(move || {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(json!(["S/USDC"]))
            }
        })
    };

    for _ in 0..3 {
        store.invalidate("pairs", "sonic-pairs");
        let mut handles = Vec::new();
        for _ in 0..12 {
            let store = Arc::clone(&store);
            let callback = callback.clone();
            handles.push(tokio::spawn(async move {
                store.get("pairs", "sonic-pairs", Some(callback)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_hit());
        }
        wait_until_idle(&store, "sonic-pairs:pairs").await;
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_refresh_serves_last_good_value() {
    let store = CacheStore::with_defaults();
    let calls = Arc::new(AtomicUsize::new(0));
    store
        .get("BTC", "sentiment", Some(constant(&calls, json!({"score": 0.7}))))
        .await;

    let failing = refresh_callback(|| async { Err(anyhow::anyhow!("429 Too Many Requests")) });
    store.invalidate("BTC", "sentiment");

    let lookup = store.get("BTC", "sentiment", Some(failing.clone())).await;
    assert_eq!(lookup.value.as_deref(), Some(&json!({"score": 0.7})));
    assert!(!lookup.is_fresh);

    wait_until_idle(&store, "sentiment:BTC").await;
    let lookup = store.get("BTC", "sentiment", Some(failing)).await;
    assert_eq!(lookup.value.as_deref(), Some(&json!({"score": 0.7})));
    assert!(!lookup.is_fresh);
}

#[tokio::test]
async fn invalidate_forces_a_newer_refresh() {
    let store = CacheStore::with_defaults();
    let calls = Arc::new(AtomicUsize::new(0));
    store
        .get("top", "trending", Some(constant(&calls, json!(["S"]))))
        .await;
    let before = store.get_stats().entry("trending:top").unwrap().last_updated;

    assert!(store.invalidate("top", "trending"));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let lookup = store
        .get("top", "trending", Some(constant(&calls, json!(["S", "ETH"]))))
        .await;
    assert_eq!(lookup.value.as_deref(), Some(&json!(["S"])));

    wait_until_idle(&store, "trending:top").await;
    let after = store.get_stats().entry("trending:top").unwrap().last_updated;
    assert!(after > before);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        store.get("top", "trending", None).await.value.as_deref(),
        Some(&json!(["S", "ETH"]))
    );
}

#[tokio::test]
async fn dashboard_price_lifecycle() {
    let store = CacheStore::with_defaults();
    let calls = Arc::new(AtomicUsize::new(0));

    // Fresh hits never call the newer callback
    store.set_refresh_interval("price", 1);
    let first = store
        .get("BTC", "price", Some(constant(&calls, json!(100))))
        .await;
    assert_eq!(first.into_parts(), (Some(Arc::new(json!(100))), true));

    let second = store
        .get("BTC", "price", Some(constant(&calls, json!(200))))
        .await;
    assert_eq!(second.into_parts(), (Some(Arc::new(json!(100))), true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Once the interval passes the old value is served while a refresh runs
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let stale = store
        .get("BTC", "price", Some(constant(&calls, json!(200))))
        .await;
    assert_eq!(stale.into_parts(), (Some(Arc::new(json!(100))), false));

    wait_until_idle(&store, "price:BTC").await;
    let refreshed = store
        .get("BTC", "price", Some(constant(&calls, json!(200))))
        .await;
    assert_eq!(refreshed.into_parts(), (Some(Arc::new(json!(200))), true));

    // Clearing the type forgets both the value and how to compute it
    assert_eq!(store.clear(Some("price")), 1);
    assert_eq!(store.get("BTC", "price", None).await, CacheLookup::miss());
    assert!(!store.registry().contains("price:BTC"));
}
