/// The cache store: entries, interval table, callbacks, and stats
///
/// Read path summary:
/// - fresh hit: return the value, no locking beyond a short `RwLock` read
/// - stale hit: serve the old value, schedule at most one async refresh
/// - miss with a callback: fetch synchronously (the only blocking path)
/// - miss without a callback: nothing to serve
use super::entry::{CacheEntry, RefreshGuard};
use super::registry::{RefreshCallback, RefreshRegistry};
use super::stats::{CacheStatsReport, EntryReport, StatsRegistry};
use crate::config::CacheConfig;
use crate::constants::{
    default_refresh_intervals, DEFAULT_DATA_TYPE, FALLBACK_REFRESH_INTERVAL_SECS,
    FULL_KEY_SEPARATOR,
};
use crate::logger::{self, LogTag};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a [`CacheStore::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub value: Option<Arc<Value>>,
    pub is_fresh: bool,
}

impl CacheLookup {
    pub fn miss() -> Self {
        Self {
            value: None,
            is_fresh: false,
        }
    }

    fn fresh(value: Option<Arc<Value>>) -> Self {
        let is_fresh = value.is_some();
        Self { value, is_fresh }
    }

    fn stale(value: Option<Arc<Value>>) -> Self {
        Self {
            value,
            is_fresh: false,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_parts(self) -> (Option<Arc<Value>>, bool) {
        (self.value, self.is_fresh)
    }
}

/// Compose `data_type:cache_key`
pub fn full_key(data_type: &str, cache_key: &str) -> String {
    format!("{}{}{}", data_type, FULL_KEY_SEPARATOR, cache_key)
}

fn type_prefix(data_type: &str) -> String {
    format!("{}{}", data_type, FULL_KEY_SEPARATOR)
}

pub struct CacheStore {
    entries: DashMap<String, Arc<CacheEntry>>,
    refresh_intervals: RwLock<HashMap<String, Duration>>,
    registry: RefreshRegistry,
    stats: Arc<StatsRegistry>,
    lock_timeout: Duration,
}

impl CacheStore {
    /// Build a store from config; overrides are layered on the built-in table
    pub fn new(config: &CacheConfig) -> Self {
        let mut intervals: HashMap<String, Duration> = default_refresh_intervals()
            .into_iter()
            .map(|(data_type, secs)| (data_type, Duration::from_secs(secs)))
            .collect();
        for (data_type, secs) in &config.refresh_intervals {
            intervals.insert(data_type.clone(), Duration::from_secs(*secs));
        }

        Self {
            entries: DashMap::new(),
            refresh_intervals: RwLock::new(intervals),
            registry: RefreshRegistry::new(),
            stats: Arc::new(StatsRegistry::new(config.latency_ema_alpha)),
            lock_timeout: config.lock_timeout(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&CacheConfig::default())
    }

    // =========================================================================
    // READ PATH
    // =========================================================================

    /// Look up `data_type:cache_key`, refreshing as needed
    ///
    /// A supplied callback is registered for the key (last write wins) and is
    /// what the background refresher will use from then on.
    pub async fn get(
        &self,
        cache_key: &str,
        data_type: &str,
        callback: Option<RefreshCallback>,
    ) -> CacheLookup {
        let key = full_key(data_type, cache_key);
        if let Some(cb) = &callback {
            self.registry.register(&key, Arc::clone(cb));
        }

        let entry = loop {
            let existing = self.entries.get(&key).map(|e| Arc::clone(e.value()));
            let entry = match existing {
                Some(entry) => entry,
                None => {
                    let Some(cb) = callback.as_ref() else {
                        logger::debug(
                            LogTag::Cache,
                            &format!("Miss for {} with no refresh callback", key),
                        );
                        return CacheLookup::miss();
                    };
                    match self.claim_slot(&key, data_type) {
                        Ok((entry, guard)) => {
                            return self.fetch_first(entry, guard, Arc::clone(cb)).await
                        }
                        Err(existing) => existing,
                    }
                }
            };

            if entry.has_value() {
                break entry;
            }

            // Someone else's first fetch is in flight; its result is ours too
            entry.wait_for_refresh().await;
            if entry.has_value() {
                return CacheLookup::fresh(entry.value());
            }

            // Lock is free and nothing was stored: an orphaned slot is dropped
            // and claimed again, a failed fetch stays a miss
            let orphaned = self
                .entries
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &entry) && !current.has_value())
                .is_some();
            if !orphaned || callback.is_none() {
                return CacheLookup::miss();
            }
            logger::debug(LogTag::Cache, &format!("Reclaiming orphaned slot {}", key));
        };

        if !entry.is_stale() {
            return CacheLookup::fresh(entry.value());
        }

        if entry.is_updating() {
            return CacheLookup::stale(entry.value());
        }

        let Some(guard) = entry.begin_refresh_within(self.lock_timeout).await else {
            logger::verbose(
                LogTag::Cache,
                &format!("Lock wait timed out for {}, serving stale", key),
            );
            return CacheLookup::stale(entry.value());
        };

        if !entry.is_stale() {
            // A refresh finished while we waited for the lock
            drop(guard);
            return CacheLookup::fresh(entry.value());
        }

        let value = entry.value();
        match callback.or_else(|| self.registry.get(&key)) {
            Some(callback) => {
                logger::debug(LogTag::Cache, &format!("Serving stale {}, refresh scheduled", key));
                tokio::spawn(self.refresh_task(guard, callback));
            }
            None => {
                logger::debug(
                    LogTag::Cache,
                    &format!("Serving stale {}, no callback to refresh with", key),
                );
            }
        }
        CacheLookup::stale(value)
    }

    /// Read without scheduling anything or registering a callback
    pub fn peek(&self, cache_key: &str, data_type: &str) -> CacheLookup {
        match self.entry(cache_key, data_type) {
            Some(entry) if entry.has_value() => {
                if entry.is_stale() {
                    CacheLookup::stale(entry.value())
                } else {
                    CacheLookup::fresh(entry.value())
                }
            }
            _ => CacheLookup::miss(),
        }
    }

    /// Publish a pending entry with its lock already held, or hand back the
    /// entry that beat us to it
    fn claim_slot(
        &self,
        key: &str,
        data_type: &str,
    ) -> Result<(Arc<CacheEntry>, RefreshGuard), Arc<CacheEntry>> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) => Err(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let entry = CacheEntry::pending(key, self.refresh_interval_for(data_type));
                // A brand-new mutex is always free
                let guard = entry.try_begin_refresh().ok_or_else(|| Arc::clone(&entry))?;
                vacant.insert(Arc::clone(&entry));
                Ok((entry, guard))
            }
        }
    }

    async fn fetch_first(
        &self,
        entry: Arc<CacheEntry>,
        guard: RefreshGuard,
        callback: RefreshCallback,
    ) -> CacheLookup {
        logger::debug(LogTag::Cache, &format!("Cold fetch for {}", entry.key()));

        // Removes the slot again on failure or if this future is dropped mid-fetch
        let slot = PendingSlot {
            entries: &self.entries,
            guard,
        };
        let refreshed = run_refresh(&slot.guard, &callback, &self.stats).await;
        drop(slot);

        if refreshed {
            CacheLookup::fresh(entry.value())
        } else {
            CacheLookup::miss()
        }
    }

    /// Future that runs one refresh and releases the entry lock when done
    pub(crate) fn refresh_task(
        &self,
        guard: RefreshGuard,
        callback: RefreshCallback,
    ) -> impl Future<Output = bool> + Send + 'static {
        let stats = Arc::clone(&self.stats);
        async move {
            let refreshed = run_refresh(&guard, &callback, &stats).await;
            drop(guard);
            refreshed
        }
    }

    // =========================================================================
    // ADMINISTRATIVE OPERATIONS
    // =========================================================================

    /// Seed or overwrite a value without invoking any callback
    pub async fn set(&self, cache_key: &str, data_type: &str, value: Value) {
        let key = full_key(data_type, cache_key);
        let existing = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                let interval = self.refresh_interval_for(data_type);
                vacant.insert(CacheEntry::ready(&key, value, interval));
                logger::debug(LogTag::Cache, &format!("Seeded {}", key));
                return;
            }
        };
        existing.overwrite(value).await;
        logger::debug(LogTag::Cache, &format!("Overwrote {}", key));
    }

    /// Force the next access to treat the entry as stale; the value stays
    pub fn invalidate(&self, cache_key: &str, data_type: &str) -> bool {
        match self.entry(cache_key, data_type) {
            Some(entry) => {
                entry.invalidate();
                logger::debug(LogTag::Cache, &format!("Invalidated {}", entry.key()));
                true
            }
            None => false,
        }
    }

    /// Remove all entries, or only those of one data type
    pub fn clear(&self, data_type: Option<&str>) -> usize {
        let before = self.entries.len();
        match data_type {
            Some(data_type) => {
                let prefix = type_prefix(data_type);
                self.entries.retain(|key, entry| {
                    let keep = !key.starts_with(&prefix);
                    if !keep {
                        entry.retire();
                    }
                    keep
                });
                self.registry.remove_prefix(&prefix);
                self.stats.remove_prefix(&prefix);
            }
            None => {
                self.entries.retain(|_, entry| {
                    entry.retire();
                    false
                });
                self.registry.clear();
                self.stats.clear();
            }
        }
        let removed = before.saturating_sub(self.entries.len());
        logger::info(
            LogTag::Cache,
            &format!(
                "Cleared {} entries ({})",
                removed,
                data_type.unwrap_or("all data types")
            ),
        );
        removed
    }

    /// Change a data type's interval, for new and live entries alike
    pub fn set_refresh_interval(&self, data_type: &str, seconds: u64) -> usize {
        let interval = Duration::from_secs(seconds);
        self.refresh_intervals
            .write()
            .insert(data_type.to_string(), interval);

        let prefix = type_prefix(data_type);
        let mut updated = 0;
        for entry in self.entries.iter().filter(|e| e.key().starts_with(&prefix)) {
            entry.value().set_refresh_interval(interval);
            updated += 1;
        }

        logger::info(
            LogTag::Cache,
            &format!(
                "Refresh interval for {} set to {}s ({} live entries updated)",
                data_type, seconds, updated
            ),
        );
        updated
    }

    pub fn refresh_interval_for(&self, data_type: &str) -> Duration {
        let intervals = self.refresh_intervals.read();
        intervals
            .get(data_type)
            .or_else(|| intervals.get(DEFAULT_DATA_TYPE))
            .copied()
            .unwrap_or(Duration::from_secs(FALLBACK_REFRESH_INTERVAL_SECS))
    }

    pub fn refresh_intervals(&self) -> BTreeMap<String, u64> {
        self.refresh_intervals
            .read()
            .iter()
            .map(|(data_type, interval)| (data_type.clone(), interval.as_secs()))
            .collect()
    }

    pub fn get_stats(&self) -> CacheStatsReport {
        let now = Utc::now();
        let mut entries = BTreeMap::new();

        for item in self.entries.iter() {
            let entry = item.value();
            let counters = self.stats.get(entry.key()).unwrap_or_default();
            entries.insert(
                item.key().clone(),
                EntryReport {
                    last_updated: entry.last_updated(),
                    has_value: entry.has_value(),
                    refresh_interval_secs: entry.refresh_interval().as_secs(),
                    is_stale: entry.is_stale_at(now),
                    is_updating: entry.is_updating(),
                    time_since_update_secs: entry.time_since_update().as_secs_f64(),
                    time_until_refresh_secs: entry.time_until_refresh().as_secs_f64(),
                    attempts: counters.attempts,
                    updates: counters.updates,
                    failures: counters.failures,
                    average_latency_ms: counters.average_latency_ms,
                    last_error: counters.last_error,
                },
            );
        }

        CacheStatsReport {
            generated_at: now,
            total_entries: entries.len(),
            stale_entries: entries.values().filter(|e| e.is_stale).count(),
            updating_entries: entries.values().filter(|e| e.is_updating).count(),
            entries,
            refresh_intervals: self.refresh_intervals(),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn entry(&self, cache_key: &str, data_type: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .get(&full_key(data_type, cache_key))
            .map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, cache_key: &str, data_type: &str) -> bool {
        self.entries.contains_key(&full_key(data_type, cache_key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn registry(&self) -> &RefreshRegistry {
        &self.registry
    }

    /// Snapshot of live entries, taken without holding any shard lock after return
    pub(crate) fn snapshot(&self) -> Vec<Arc<CacheEntry>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("callbacks", &self.registry.len())
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

/// First-fetch slot that is unpublished unless it ends up holding a value
///
/// The map entry is removed before the refresh lock is released, so a waiter
/// woken by the release never sees the empty slot.
struct PendingSlot<'a> {
    entries: &'a DashMap<String, Arc<CacheEntry>>,
    guard: RefreshGuard,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let entry = self.guard.entry();
        if !entry.has_value() {
            self.entries
                .remove_if(entry.key(), |_, current| Arc::ptr_eq(current, entry));
        }
    }
}

/// Run `callback` once for the guarded entry and record the outcome
///
/// Errors and panics are both contained here: they are logged and counted,
/// and the entry keeps whatever value it had. Entries removed by `clear`
/// while the callback ran leave no stats behind.
async fn run_refresh(guard: &RefreshGuard, callback: &RefreshCallback, stats: &StatsRegistry) -> bool {
    let entry = guard.entry();
    let started = Instant::now();
    let outcome = match AssertUnwindSafe(callback()).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("refresh callback panicked")),
    };
    let latency = started.elapsed();

    match outcome {
        Ok(value) => {
            entry.update(guard, value);
            if !entry.is_retired() {
                stats.record_success(entry.key(), latency);
            }
            logger::verbose(
                LogTag::Cache,
                &format!("Refreshed {} in {}ms", entry.key(), latency.as_millis()),
            );
            true
        }
        Err(e) => {
            if !entry.is_retired() {
                stats.record_failure(entry.key(), &e.to_string());
            }
            logger::warning(
                LogTag::Cache,
                &format!("Refresh failed for {}: {}", entry.key(), e),
            );
            false
        }
    }
}
