//! HTTP route definitions

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::room::RoomId;
use crate::game::{RegistryError, ServerError};
use crate::http::middleware::require_admin;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::RoomSummary;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    // Operator routes (bearer token when configured)
    let admin_routes = Router::new()
        .route("/rooms/:room_id/reset", post(reset_room_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/lobby", get(lobby_handler))
        .merge(admin_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let mut router = Router::new()
        .route("/ws", get(ws_handler))
        .merge(api_routes);

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS from a comma-separated origin list, `*` allowing any origin
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    cors.allow_origin(allowed_origins).allow_credentials(true)
}

// ============================================================================
// Health and lobby
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: usize,
    human_players: usize,
    bot_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let lobby = state.game.lobby();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms: lobby.rooms.len(),
        human_players: lobby.human_players,
        bot_players: lobby.bot_players,
    })
}

async fn lobby_handler(State(state): State<AppState>) -> Json<BTreeMap<RoomId, RoomSummary>> {
    Json(state.game.lobby().rooms)
}

// ============================================================================
// Operator endpoints
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetResponse {
    success: bool,
    room_id: RoomId,
}

async fn reset_room_handler(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<ResetResponse>, AppError> {
    state.game.reset_room(room_id.clone()).await?;

    Ok(Json(ResetResponse {
        success: true,
        room_id,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for AppError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Registry(RegistryError::RoomNotFound) => AppError::NotFound(err.to_string()),
            ServerError::Registry(e) => AppError::BadRequest(e.to_string()),
            ServerError::Closed => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GameConfig};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(admin_token: Option<&str>) -> Router {
        let config = Config {
            server_addr: ([127, 0, 0, 1], 0).into(),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            static_dir: None,
            admin_token: admin_token.map(str::to_string),
            game: GameConfig::default(),
        };
        let (state, server) = AppState::new(config);
        tokio::spawn(server.run());
        build_router(state)
    }

    fn reset_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/rooms/NOPE00/reset");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = router(Some("secret"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reset_requires_admin_token() {
        let missing = router(Some("secret")).oneshot(reset_request(None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = router(Some("secret")).oneshot(reset_request(Some("guess"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let allowed = router(Some("secret")).oneshot(reset_request(Some("secret"))).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_is_open_without_configured_token() {
        let response = router(None).oneshot(reset_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn registry_errors_map_to_statuses() {
        let not_found = AppError::from(ServerError::Registry(RegistryError::RoomNotFound));
        assert!(matches!(not_found, AppError::NotFound(_)));
        let closed = AppError::from(ServerError::Closed);
        assert!(matches!(closed, AppError::Internal(_)));
    }
}
