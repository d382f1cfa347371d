use std::sync::Arc;
use axum::{extract::State, Json};
use chrono::Utc;
use crate::AppState;
use crate::models::HealthResponse;
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let stats = state.broker.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Service is ready, {} session(s) connected", stats.sessions),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
    })
}
