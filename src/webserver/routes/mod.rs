use crate::webserver::state::AppState;
use axum::Router;
use std::sync::Arc;

pub mod cache;
pub mod status;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api", api_routes()).with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .nest("/cache", cache::routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cache::{BackgroundRefresher, CacheStore};
    use crate::config::RefresherConfig;
    use crate::webserver::{build_app, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub fn app_with_store(store: Arc<CacheStore>) -> (Router, AppState) {
        let refresher = Arc::new(BackgroundRefresher::new(
            Arc::clone(&store),
            RefresherConfig::default(),
        ));
        let state = AppState::new(store, refresher);
        (build_app(state.clone()), state)
    }

    pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
