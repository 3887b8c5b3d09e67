/// Configuration schemas
///
/// Every section is declared with `config_struct!`, so each field carries its
/// default next to its type and a partial config file only needs the values
/// that differ.
use crate::constants::{
    DEFAULT_EARLY_REFRESH_RATIO, DEFAULT_LATENCY_EMA_ALPHA, DEFAULT_LOCK_TIMEOUT_MS,
    DEFAULT_REFRESH_TICK_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS,
};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// CACHE STORE
// ============================================================================

config_struct! {
    /// Cache store settings
    pub struct CacheConfig {
        /// Per data type interval overrides (seconds), applied on top of the
        /// built-in table
        refresh_intervals: BTreeMap<String, u64> = BTreeMap::new(),

        /// How long a stale read may wait for the entry lock before it gives
        /// up on scheduling a refresh (milliseconds)
        lock_timeout_ms: u64 = DEFAULT_LOCK_TIMEOUT_MS,

        /// Weight of the newest sample in the latency moving average
        latency_ema_alpha: f64 = DEFAULT_LATENCY_EMA_ALPHA,
    }
}

impl CacheConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

// ============================================================================
// BACKGROUND REFRESHER
// ============================================================================

config_struct! {
    /// Background refresh loop settings
    pub struct RefresherConfig {
        /// Start the loop with the process
        enabled: bool = true,

        /// Scan period (milliseconds)
        tick_interval_ms: u64 = DEFAULT_REFRESH_TICK_MS,

        /// Refresh once this fraction of the interval has elapsed
        early_refresh_ratio: f64 = DEFAULT_EARLY_REFRESH_RATIO,

        /// Grace period for in-flight refreshes on stop (milliseconds)
        shutdown_timeout_ms: u64 = DEFAULT_SHUTDOWN_TIMEOUT_MS,
    }
}

impl RefresherConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

// ============================================================================
// ADMIN WEBSERVER
// ============================================================================

config_struct! {
    /// Admin HTTP surface
    pub struct WebserverConfig {
        enabled: bool = true,
        host: String = "127.0.0.1".to_string(),
        port: u16 = 8080,
    }
}

impl WebserverConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        cache: CacheConfig = CacheConfig::default(),
        refresher: RefresherConfig = RefresherConfig::default(),
        webserver: WebserverConfig = WebserverConfig::default(),
    }
}

/// Field names of each section, keyed by section name
pub fn section_field_names() -> BTreeMap<&'static str, &'static [&'static str]> {
    let mut sections = BTreeMap::new();
    sections.insert("cache", CacheConfig::field_names());
    sections.insert("refresher", RefresherConfig::field_names());
    sections.insert("webserver", WebserverConfig::field_names());
    sections
}
