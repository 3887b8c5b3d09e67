//! Refresh-ahead cache
//!
//! `CacheStore` serves values keyed by `data_type:cache_key`, refreshing them
//! through registered callbacks. `BackgroundRefresher` refreshes entries ahead
//! of expiry and `CachedEndpoint` wraps an upstream fetch function.

pub mod endpoint;
pub mod entry;
pub mod refresher;
pub mod registry;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests;

pub use endpoint::{decode_value, endpoint_cache_key, Cached, CachedEndpoint};
pub use entry::{CacheEntry, RefreshGuard};
pub use refresher::BackgroundRefresher;
pub use registry::{refresh_callback, serialized_callback, RefreshCallback, RefreshFuture, RefreshRegistry};
pub use stats::{CacheStatsReport, EntryReport, RefreshStats, StatsRegistry};
pub use store::{full_key, CacheLookup, CacheStore};
