/// Per-key refresh counters and the serializable stats report
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one full key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshStats {
    pub attempts: u64,
    pub updates: u64,
    pub failures: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Exponential moving average over successful refreshes
    pub average_latency_ms: f64,
}

#[derive(Debug)]
pub struct StatsRegistry {
    per_key: DashMap<String, RefreshStats>,
    latency_alpha: f64,
}

impl StatsRegistry {
    pub fn new(latency_alpha: f64) -> Self {
        Self {
            per_key: DashMap::new(),
            latency_alpha: latency_alpha.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    pub fn record_success(&self, key: &str, latency: Duration) {
        let sample_ms = latency.as_secs_f64() * 1000.0;
        let mut stats = self.per_key.entry(key.to_string()).or_default();
        stats.attempts += 1;
        stats.average_latency_ms = if stats.updates == 0 {
            sample_ms
        } else {
            self.latency_alpha * sample_ms + (1.0 - self.latency_alpha) * stats.average_latency_ms
        };
        stats.updates += 1;
        stats.last_update = Some(Utc::now());
    }

    pub fn record_failure(&self, key: &str, error: &str) {
        let mut stats = self.per_key.entry(key.to_string()).or_default();
        stats.attempts += 1;
        stats.failures += 1;
        stats.last_error = Some(error.to_string());
    }

    pub fn get(&self, key: &str) -> Option<RefreshStats> {
        self.per_key.get(key).map(|s| s.value().clone())
    }

    pub fn remove_prefix(&self, prefix: &str) {
        self.per_key.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.per_key.clear();
    }
}

/// Stats for one live entry, as reported by `CacheStore::get_stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReport {
    pub last_updated: DateTime<Utc>,
    pub has_value: bool,
    pub refresh_interval_secs: u64,
    pub is_stale: bool,
    pub is_updating: bool,
    pub time_since_update_secs: f64,
    pub time_until_refresh_secs: f64,
    pub attempts: u64,
    pub updates: u64,
    pub failures: u64,
    pub average_latency_ms: f64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub generated_at: DateTime<Utc>,
    pub total_entries: usize,
    pub stale_entries: usize,
    pub updating_entries: usize,
    pub entries: BTreeMap<String, EntryReport>,
    /// Default interval per data type (seconds)
    pub refresh_intervals: BTreeMap<String, u64>,
}

impl CacheStatsReport {
    pub fn entry(&self, full_key: &str) -> Option<&EntryReport> {
        self.entries.get(full_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_average() {
        let stats = StatsRegistry::new(0.2);
        stats.record_success("price:BTC", Duration::from_millis(100));

        let s = stats.get("price:BTC").unwrap();
        assert_eq!(s.updates, 1);
        assert_eq!(s.attempts, 1);
        assert!((s.average_latency_ms - 100.0).abs() < 1e-9);
        assert!(s.last_update.is_some());
    }

    #[test]
    fn test_moving_average_weights_new_sample() {
        let stats = StatsRegistry::new(0.2);
        stats.record_success("price:BTC", Duration::from_millis(100));
        stats.record_success("price:BTC", Duration::from_millis(200));

        // 0.2 * 200 + 0.8 * 100
        let s = stats.get("price:BTC").unwrap();
        assert!((s.average_latency_ms - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_failures_do_not_move_average() {
        let stats = StatsRegistry::new(0.5);
        stats.record_success("sentiment:BTC", Duration::from_millis(50));
        stats.record_failure("sentiment:BTC", "upstream 503");

        let s = stats.get("sentiment:BTC").unwrap();
        assert_eq!(s.attempts, 2);
        assert_eq!(s.failures, 1);
        assert_eq!(s.updates, 1);
        assert_eq!(s.last_error.as_deref(), Some("upstream 503"));
        assert!((s.average_latency_ms - 50.0).abs() < 1e-9);
    }
}
