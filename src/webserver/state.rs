/// Shared application state for the webserver
///
/// Route handlers reach the cache and its refresher through this.
use crate::cache::{BackgroundRefresher, CacheStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CacheStore>,

    pub refresher: Arc<BackgroundRefresher>,

    /// Server startup time
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<CacheStore>, refresher: Arc<BackgroundRefresher>) -> Self {
        Self {
            store,
            refresher,
            startup_time: Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
