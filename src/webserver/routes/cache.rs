use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    cache::full_key,
    logger::{self, LogTag},
    webserver::{
        models::{
            ClearQuery, ClearResponse, EntryResponse, IntervalRequest, IntervalResponse,
            InvalidateResponse, RefresherResponse,
        },
        state::AppState,
        utils::{error_response, success_response},
    },
};

/// Create cache administration routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(cache_stats))
        .route("/entries", delete(clear_entries))
        .route("/entries/:data_type/:key", get(get_entry))
        .route("/entries/:data_type/:key/invalidate", post(invalidate_entry))
        .route("/intervals/:data_type", put(set_interval))
        .route("/refresher/start", post(start_refresher))
        .route("/refresher/stop", post(stop_refresher))
}

/// GET /api/cache/stats
async fn cache_stats(State(state): State<Arc<AppState>>) -> Response {
    success_response(state.store.get_stats())
}

/// GET /api/cache/entries/:data_type/:key
async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path((data_type, key)): Path<(String, String)>,
) -> Response {
    let full_key = full_key(&data_type, &key);
    let lookup = state.store.peek(&key, &data_type);

    match lookup.value {
        Some(value) => success_response(EntryResponse {
            full_key,
            is_fresh: lookup.is_fresh,
            value: value.as_ref().clone(),
        }),
        None => error_response(
            StatusCode::NOT_FOUND,
            "ENTRY_NOT_FOUND",
            &format!("No cached value for {}", full_key),
            None,
        ),
    }
}

/// POST /api/cache/entries/:data_type/:key/invalidate
async fn invalidate_entry(
    State(state): State<Arc<AppState>>,
    Path((data_type, key)): Path<(String, String)>,
) -> Response {
    let full_key = full_key(&data_type, &key);
    if !state.store.invalidate(&key, &data_type) {
        return error_response(
            StatusCode::NOT_FOUND,
            "ENTRY_NOT_FOUND",
            &format!("No cache entry for {}", full_key),
            None,
        );
    }

    logger::info(LogTag::Webserver, &format!("Invalidated {} via API", full_key));
    success_response(InvalidateResponse {
        full_key,
        invalidated: true,
    })
}

/// DELETE /api/cache/entries?data_type=...
async fn clear_entries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearQuery>,
) -> Response {
    let removed = state.store.clear(query.data_type.as_deref());
    success_response(ClearResponse {
        data_type: query.data_type,
        removed,
    })
}

/// PUT /api/cache/intervals/:data_type
async fn set_interval(
    State(state): State<Arc<AppState>>,
    Path(data_type): Path<String>,
    body: Result<Json<IntervalRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "INVALID_BODY",
                "Expected a JSON body like {\"seconds\": 60}",
                Some(&rejection.body_text()),
            );
        }
    };

    if request.seconds == 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_INTERVAL",
            "Refresh interval must be at least one second",
            None,
        );
    }

    let updated_entries = state.store.set_refresh_interval(&data_type, request.seconds);
    success_response(IntervalResponse {
        data_type,
        seconds: request.seconds,
        updated_entries,
    })
}

/// POST /api/cache/refresher/start
async fn start_refresher(State(state): State<Arc<AppState>>) -> Response {
    let changed = state.refresher.start();
    success_response(RefresherResponse {
        running: state.refresher.is_running(),
        changed,
    })
}

/// POST /api/cache/refresher/stop
async fn stop_refresher(State(state): State<Arc<AppState>>) -> Response {
    let changed = state.refresher.stop().await;
    success_response(RefresherResponse {
        running: state.refresher.is_running(),
        changed,
    })
}
