use serde::Serialize;

/// Service health status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ServiceHealth {
    /// Service is operating normally
    Healthy,

    /// Service is running but not doing its job fully
    Degraded(String),

    /// Service has failed
    Unhealthy(String),

    /// Service is starting up
    Starting,

    /// Service is shut down or was never started
    Stopped,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceHealth::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ServiceHealth::Degraded(_))
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, ServiceHealth::Unhealthy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_reason() {
        let json = serde_json::to_value(ServiceHealth::Degraded("refresher idle".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "degraded", "reason": "refresher idle"}));

        let json = serde_json::to_value(ServiceHealth::Healthy).unwrap();
        assert_eq!(json, serde_json::json!({"status": "healthy"}));
    }
}
