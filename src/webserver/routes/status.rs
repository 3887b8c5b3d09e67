use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{
        models::{HealthResponse, StatusResponse},
        state::AppState,
        utils::success_response,
    },
};

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(system_status))
}

/// GET /api/health
async fn health_check() -> Response {
    logger::debug(LogTag::Webserver, "Health check endpoint called");

    success_response(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/status
async fn system_status(State(state): State<Arc<AppState>>) -> Response {
    let report = state.store.get_stats();

    let status = StatusResponse {
        startup_time: state.startup_time,
        uptime_seconds: state.uptime_seconds(),
        total_entries: report.total_entries,
        stale_entries: report.stale_entries,
        updating_entries: report.updating_entries,
        registered_callbacks: state.store.registry().len(),
        refresher_running: state.refresher.is_running(),
    };

    logger::debug(
        LogTag::Webserver,
        &format!(
            "Status snapshot ready (uptime={}s, entries={}, refresher_running={})",
            status.uptime_seconds, status.total_entries, status.refresher_running
        ),
    );

    success_response(status)
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheStore;
    use crate::webserver::routes::test_support::{app_with_store, send};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with_store(Arc::new(CacheStore::with_defaults()));
        let (status, body) = send(&app, "GET", "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("ok"));
        assert_eq!(body["data"]["version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn test_status_counts_entries() {
        let store = Arc::new(CacheStore::with_defaults());
        store.set("BTC", "price", json!(1)).await;
        store.set("latest", "news", json!([])).await;
        store.invalidate("latest", "news");

        let (app, _) = app_with_store(store);
        let (status, body) = send(&app, "GET", "/api/status", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_entries"], json!(2));
        assert_eq!(body["data"]["stale_entries"], json!(1));
        assert_eq!(body["data"]["refresher_running"], json!(false));
    }
}
