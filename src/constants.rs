/// Shared constants for the cache and its defaults
use std::collections::BTreeMap;

/// Data type used when a lookup names a type without its own interval
pub const DEFAULT_DATA_TYPE: &str = "default";

/// Interval used if even the `default` row has been removed from the table
pub const FALLBACK_REFRESH_INTERVAL_SECS: u64 = 300;

/// Separator between data type and cache key in a full key
pub const FULL_KEY_SEPARATOR: char = ':';

/// Built-in refresh intervals per data type (seconds)
///
/// These match the upstream refresh cadence the dashboard was tuned against:
/// fast-moving prices refresh often, slow indexes like fear & greed rarely.
pub const DEFAULT_REFRESH_INTERVALS: &[(&str, u64)] = &[
    ("price", 60),
    ("sonic-price", 20),
    ("sentiment", 120),
    ("news", 300),
    ("fear-greed", 1800),
    ("trending", 600),
    ("dex-volume", 300),
    ("sonic-pairs", 120),
    ("sales", 600),
    (DEFAULT_DATA_TYPE, FALLBACK_REFRESH_INTERVAL_SECS),
];

/// Read-path lock wait before giving up on scheduling a refresh (ms)
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 100;

/// Background refresher tick (ms)
pub const DEFAULT_REFRESH_TICK_MS: u64 = 1000;

/// Fraction of the interval after which the refresher refreshes early
pub const DEFAULT_EARLY_REFRESH_RATIO: f64 = 0.9;

/// Grace period for in-flight refreshes when the refresher stops (ms)
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5000;

/// Weight of the newest sample in the refresh latency moving average
pub const DEFAULT_LATENCY_EMA_ALPHA: f64 = 0.2;

/// Built-in interval table as an owned map
pub fn default_refresh_intervals() -> BTreeMap<String, u64> {
    DEFAULT_REFRESH_INTERVALS
        .iter()
        .map(|(data_type, secs)| (data_type.to_string(), *secs))
        .collect()
}
