/// A single cached value with its freshness state and refresh lock
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
struct EntryState {
    value: Option<Arc<Value>>,
    last_updated: DateTime<Utc>,
    refresh_interval: Duration,
}

/// One cache slot
///
/// `value` is `None` only while the first fetch for a brand-new key is in
/// flight. The refresh lock serializes refreshes; the payload itself sits
/// behind a short-lived `RwLock` so reads never wait on a refresh.
#[derive(Debug)]
pub struct CacheEntry {
    key: String,
    state: RwLock<EntryState>,
    updating: AtomicBool,
    /// Set once the entry has been removed from the store by `clear`
    retired: AtomicBool,
    refresh_lock: Arc<Mutex<()>>,
}

/// Proof of holding an entry's refresh lock
///
/// `updating` is set while a guard exists and cleared before the lock is
/// released, so `updating == true` always implies the lock is held.
#[derive(Debug)]
pub struct RefreshGuard {
    entry: Arc<CacheEntry>,
    _lock: OwnedMutexGuard<()>,
}

impl RefreshGuard {
    pub fn entry(&self) -> &Arc<CacheEntry> {
        &self.entry
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.entry.updating.store(false, Ordering::Release);
    }
}

impl CacheEntry {
    /// Entry whose first fetch has not completed yet
    pub fn pending(key: &str, refresh_interval: Duration) -> Arc<Self> {
        Arc::new(Self::build(key, None, DateTime::<Utc>::UNIX_EPOCH, refresh_interval))
    }

    /// Entry that already holds a value, stamped now
    pub fn ready(key: &str, value: Value, refresh_interval: Duration) -> Arc<Self> {
        Arc::new(Self::build(key, Some(Arc::new(value)), Utc::now(), refresh_interval))
    }

    fn build(
        key: &str,
        value: Option<Arc<Value>>,
        last_updated: DateTime<Utc>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            key: key.to_string(),
            state: RwLock::new(EntryState {
                value,
                last_updated,
                refresh_interval,
            }),
            updating: AtomicBool::new(false),
            retired: AtomicBool::new(false),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<Arc<Value>> {
        self.state.read().value.clone()
    }

    pub fn has_value(&self) -> bool {
        self.state.read().value.is_some()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.state.read().last_updated
    }

    pub fn refresh_interval(&self) -> Duration {
        self.state.read().refresh_interval
    }

    pub fn set_refresh_interval(&self, interval: Duration) {
        self.state.write().refresh_interval = interval;
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// `now - last_updated > refresh_interval`; exactly equal is still fresh
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.read();
        age_at(state.last_updated, now) > state.refresh_interval
    }

    pub fn time_since_update(&self) -> Duration {
        age_at(self.last_updated(), Utc::now())
    }

    /// Time left before the entry goes stale, floored at zero
    pub fn time_until_refresh(&self) -> Duration {
        let state = self.state.read();
        state
            .refresh_interval
            .saturating_sub(age_at(state.last_updated, Utc::now()))
    }

    /// Store a refreshed value; only the lock holder can call this
    pub fn update(&self, guard: &RefreshGuard, value: Value) {
        debug_assert!(std::ptr::eq(Arc::as_ptr(&guard.entry), self));
        self.store_value(value);
    }

    /// Mark as maximally stale without dropping the value
    pub fn invalidate(&self) {
        self.state.write().last_updated = DateTime::<Utc>::UNIX_EPOCH;
    }

    /// Take the refresh lock if it is free right now
    pub fn try_begin_refresh(self: &Arc<Self>) -> Option<RefreshGuard> {
        let lock = Arc::clone(&self.refresh_lock).try_lock_owned().ok()?;
        Some(self.guard(lock))
    }

    /// Take the refresh lock, waiting at most `timeout`
    pub async fn begin_refresh_within(self: &Arc<Self>, timeout: Duration) -> Option<RefreshGuard> {
        let lock = tokio::time::timeout(timeout, Arc::clone(&self.refresh_lock).lock_owned())
            .await
            .ok()?;
        Some(self.guard(lock))
    }

    /// Wait until no refresh holds the lock
    pub async fn wait_for_refresh(&self) {
        let _lock = self.refresh_lock.lock().await;
    }

    /// Replace the value outside of a refresh, waiting for any in-flight one
    pub(crate) async fn overwrite(&self, value: Value) {
        let _lock = self.refresh_lock.lock().await;
        self.store_value(value);
    }

    fn guard(self: &Arc<Self>, lock: OwnedMutexGuard<()>) -> RefreshGuard {
        self.updating.store(true, Ordering::Release);
        RefreshGuard {
            entry: Arc::clone(self),
            _lock: lock,
        }
    }

    fn store_value(&self, value: Value) {
        let mut state = self.state.write();
        state.value = Some(Arc::new(value));
        state.last_updated = Utc::now();
    }

    /// Hold the refresh lock without marking the entry as updating
    #[cfg(test)]
    pub(crate) fn hold_refresh_lock(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.refresh_lock)
            .try_lock_owned()
            .expect("refresh lock is free")
    }

    #[cfg(test)]
    pub(crate) fn set_last_updated(&self, at: DateTime<Utc>) {
        self.state.write().last_updated = at;
    }
}

fn age_at(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last_updated).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interval() -> Duration {
        Duration::from_secs(10)
    }

    #[test]
    fn test_stale_boundary() {
        let entry = CacheEntry::ready("price:BTC", json!(1), interval());
        let updated = entry.last_updated();

        let at_interval = updated + chrono::Duration::seconds(10);
        let just_after = at_interval + chrono::Duration::milliseconds(1);

        assert!(!entry.is_stale_at(updated));
        assert!(!entry.is_stale_at(at_interval));
        assert!(entry.is_stale_at(just_after));
    }

    #[test]
    fn test_time_until_refresh_floors_at_zero() {
        let entry = CacheEntry::ready("price:BTC", json!(1), interval());
        entry.set_last_updated(Utc::now() - chrono::Duration::seconds(60));

        assert_eq!(entry.time_until_refresh(), Duration::ZERO);
        assert!(entry.time_since_update() >= Duration::from_secs(60));
    }

    #[test]
    fn test_time_until_refresh_counts_down() {
        let entry = CacheEntry::ready("price:BTC", json!(1), interval());
        entry.set_last_updated(Utc::now() - chrono::Duration::seconds(4));

        let remaining = entry.time_until_refresh();
        assert!(remaining <= Duration::from_secs(6));
        assert!(remaining > Duration::from_secs(5));
    }

    #[test]
    fn test_invalidate_keeps_value() {
        let entry = CacheEntry::ready("news:latest", json!({"headline": "x"}), interval());
        entry.invalidate();

        assert!(entry.is_stale());
        assert_eq!(entry.last_updated(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(entry.value().as_deref(), Some(&json!({"headline": "x"})));
    }

    #[test]
    fn test_pending_entry_has_no_value() {
        let entry = CacheEntry::pending("sales:recent", interval());
        assert!(!entry.has_value());
        assert!(entry.value().is_none());
        assert!(entry.is_stale());
    }

    #[tokio::test]
    async fn test_guard_sets_and_clears_updating() {
        let entry = CacheEntry::ready("price:ETH", json!(1), interval());
        let guard = entry.try_begin_refresh().expect("lock should be free");
        assert!(entry.is_updating());
        assert!(entry.try_begin_refresh().is_none());

        entry.update(&guard, json!(2));
        drop(guard);

        assert!(!entry.is_updating());
        assert_eq!(entry.value().as_deref(), Some(&json!(2)));
        assert!(entry.try_begin_refresh().is_some());
    }

    #[tokio::test]
    async fn test_begin_refresh_within_times_out() {
        let entry = CacheEntry::ready("price:SOL", json!(1), interval());
        let _held = entry.try_begin_refresh().unwrap();

        let attempt = entry.begin_refresh_within(Duration::from_millis(20)).await;
        assert!(attempt.is_none());
        assert!(entry.is_updating());
    }

    #[tokio::test]
    async fn test_overwrite_waits_for_refresh() {
        let entry = CacheEntry::ready("trending:all", json!("old"), interval());
        let guard = entry.try_begin_refresh().unwrap();

        let writer = {
            let entry = Arc::clone(&entry);
            tokio::spawn(async move { entry.overwrite(json!("admin")).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        entry.update(&guard, json!("refreshed"));
        drop(guard);
        writer.await.unwrap();

        assert_eq!(entry.value().as_deref(), Some(&json!("admin")));
    }
}
