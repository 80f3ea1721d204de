//! Health check endpoints.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Event subsystem counters.
#[derive(Serialize)]
pub struct EventsReport {
    /// Events waiting for the next dispatch cycle.
    pub pending: usize,
    /// Identities in the processed window.
    pub processed: usize,
    /// Events persisted in the store.
    pub stored: usize,
    /// Dead letter records in the store.
    pub dead_letters: usize,
}

/// Data cache counters.
#[derive(Serialize)]
pub struct CacheReport {
    /// Cached data files.
    pub entries: usize,
}

/// Detailed health check response.
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Event subsystem counters.
    pub events: EventsReport,
    /// Data cache counters.
    pub cache: CacheReport,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health/detailed
async fn detailed_health_check(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    Json(DetailedHealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        events: EventsReport {
            pending: state.dispatcher.pending_len(),
            processed: state.dispatcher.processed_len(),
            stored: state.event_store.event_count(),
            dead_letters: state.event_store.dead_letter_count(),
        },
        cache: CacheReport {
            entries: state.data_cache.entry_count(),
        },
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}
