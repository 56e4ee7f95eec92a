//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::app::AppState;
use crate::util::time::{unix_millis, uptime_secs};
use crate::ws::handler::ws_handler;

/// Upper bound on plain HTTP request handling
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origins);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    if let Some(dir) = &state.config.static_dir {
        info!(dir = %dir.display(), "Serving static client files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the browser client; an empty origin list allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: u64,
    rooms: usize,
    players: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        server_time: unix_millis(),
        rooms: state.registry.room_count(),
        players: state.registry.player_count(),
        connections: state.registry.connection_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tokio_test::assert_ok;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_registry_counts() {
        let router = build_router(AppState::new(Config::default()));

        let response = assert_ok!(
            router
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
        );
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["rooms"], 0);
        assert_eq!(json["players"], 0);
        assert!(json["server_time"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found_without_static_dir() {
        let router = build_router(AppState::new(Config::default()));

        let response = assert_ok!(
            router
                .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
                .await
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
