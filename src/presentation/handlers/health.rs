//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::warn;

use crate::presentation::dto::HealthResponse;
use crate::presentation::routes::AppState;

/// Liveness probe; never touches dependencies
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe: 200 once the database answers, 503 otherwise
pub async fn readiness(State(app_state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = match app_state.database.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!("database not ready: {}", e);
            false
        }
    };

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(HealthResponse {
            status: if ready { "ready" } else { "unavailable" },
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
