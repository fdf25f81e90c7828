//! HTTP JSON API.
//!
//! - `/health`, `/ready` - probes, no identity required
//! - `/admin/...` - platform superadmin console
//! - `/schools/{school_id}/...` - everything scoped to one school

mod admin;
mod attendance;
pub mod auth;
mod catalog;
mod error;
mod health;
mod reports;
mod schools;
mod students;

use crate::{config::AppConfig, errors::Result};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wraps a connection and configuration for the router.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let school_routes = Router::new()
        .merge(schools::routes())
        .merge(students::routes())
        .merge(catalog::routes())
        .merge(attendance::routes())
        .merge(reports::routes());

    Router::new()
        .merge(health::routes())
        .nest("/admin", admin::routes())
        .nest("/schools/{school_id}", school_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `bind_address` until Ctrl-C.
pub async fn serve(state: AppState, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!(%bind_address, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
