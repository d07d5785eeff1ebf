use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::gateway::server::GatewayState;
use crate::gateway::types::HealthResponse;

/// `GET /health`: 200 when the engine answers a ping, 503 otherwise.
pub async fn health_handler(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    match state.engine.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                engine: "reachable",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the engine");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    engine: "unreachable",
                }),
            )
        }
    }
}
