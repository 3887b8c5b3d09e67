/// API request type definitions
use serde::{Deserialize, Serialize};

/// Body of `PUT /api/cache/intervals/:data_type`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub seconds: u64,
}

/// Query of `DELETE /api/cache/entries`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearQuery {
    pub data_type: Option<String>,
}
