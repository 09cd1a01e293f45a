//! HTTP server setup with Axum

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::rest::{suggestions, webhook};
use super::state::AppState;
use super::views::inbox;
use super::websocket::handler::ws_handler;

const STATIC_CACHE_CONTROL: &str = "public, max-age=600";

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>, public_dir: &Path, max_body_bytes: usize) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = Router::new()
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        ));

    Router::new()
        // Health check
        .route("/status", get(status))
        // HTML views
        .route("/", get(inbox::home))
        .route("/inbox", get(inbox::list))
        .route("/inbox/:id", get(inbox::detail))
        // JSON API
        .route("/api/suggestions/recipients", get(suggestions::recipient_suggestions))
        .route(
            "/webhook/sendgrid/receive",
            post(webhook::receive).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        // WebSocket endpoint
        .route("/ws", get(ws_handler))
        .merge(assets)
        .layer(CompressionLayer::new().gzip(true))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn status() -> &'static str {
    "Up!"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_status() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let state = Arc::new(AppState::with_store(store, Duration::from_secs(1)));
        let app = create_router(state, Path::new("public"), 1024);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Up!");
    }
}
