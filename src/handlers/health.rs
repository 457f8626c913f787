//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    /// Details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Registered provider count
    pub providers: usize,
    /// Stored credential count
    pub credentials: usize,
    /// Receipts in the current chain
    pub receipts: usize,
    /// Whether the receipt chain verifies
    #[serde(rename = "chainValid")]
    pub chain_valid: bool,
}

/// Basic health check
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    let pipeline = state.pipeline.lock().await;
    let details = HealthDetails {
        providers: pipeline.registry().list().len(),
        credentials: pipeline.vault().list().len(),
        receipts: pipeline.ledger().chain().len(),
        chain_valid: pipeline.ledger().verify().valid,
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "butterknife".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(details),
    })
}

/// Liveness check
///
/// GET /health/live
/// Confirms the service is running without touching broker state
pub async fn liveness_check(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing liveness check");

    Json(HealthResponse {
        status: "alive".to_string(),
        service: "butterknife".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: None,
    })
}
