/// API response type definitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ================================================================================================
// System
// ================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub startup_time: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_entries: usize,
    pub stale_entries: usize,
    pub updating_entries: usize,
    pub registered_callbacks: usize,
    pub refresher_running: bool,
}

// ================================================================================================
// Cache
// ================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub full_key: String,
    pub is_fresh: bool,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub full_key: String,
    pub invalidated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub data_type: Option<String>,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalResponse {
    pub data_type: String,
    pub seconds: u64,
    pub updated_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefresherResponse {
    pub running: bool,
    /// False when the request found the refresher already in that state
    pub changed: bool,
}
