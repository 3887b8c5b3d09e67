//! dashcache: a refresh-ahead cache for dashboard data sources
//!
//! Values are keyed by `data_type:cache_key`. Fresh values are served as-is,
//! stale values are served while one refresh runs in the background, and a
//! background refresher recomputes entries shortly before they expire.

pub mod arguments;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logger;
pub mod services;
#[cfg(feature = "web")]
pub mod webserver;

pub use cache::{
    refresh_callback, serialized_callback, BackgroundRefresher, CacheLookup, CacheStore, Cached,
    CachedEndpoint, RefreshCallback,
};
pub use errors::{CacheError, CacheResult};
