//! Liveness and readiness probes.
//!
//! - `/health` - the process is up
//! - `/ready` - the database answers a ping

use super::AppState;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    version: &'static str,
    database: CheckResult,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: &'static str,
    latency_ms: u128,
    error: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let database = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "healthy",
            latency_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            CheckResult {
                status: "unhealthy",
                latency_ms: start.elapsed().as_millis(),
                error: Some(e.to_string()),
            }
        }
    };

    let ready = database.error.is_none();
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_state};
    use crate::errors::Result;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_probes() -> Result<()> {
        let state = test_state().await?;

        let (status, body) = send(&state, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&state, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"]["status"], "healthy");
        Ok(())
    }
}
