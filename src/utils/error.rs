//! Error handling module
//!
//! Defines the broker's error taxonomy and its wire representation

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broker error kinds
///
/// Each variant carries a human-readable message; the stable machine-readable
/// code comes from [`BrokerError::code`]. Messages never contain credential
/// material.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Provider id is not present in the registry
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Vault has no active credential for the provider
    #[error("No credential stored for provider: {0}")]
    NoCredential(String),

    /// Pre-call budget gate denied the request
    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Transport failure or timeout while dispatching
    #[error("Network error: {0}")]
    Network(String),

    /// A store file could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Receipt chain verification found a mismatch
    #[error("Receipt chain corrupt: {0}")]
    ChainCorrupt(String),

    /// Provider configuration cannot be applied to this request
    #[error("Invalid provider configuration: {0}")]
    Config(String),

    /// Tool parameters failed boundary validation
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// Structured error payload returned by the tool surface
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl BrokerError {
    /// Stable error code for the tool surface
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            BrokerError::NoCredential(_) => "NO_CREDENTIAL",
            BrokerError::BudgetExceeded(_) => "BUDGET_EXCEEDED",
            BrokerError::Network(_) => "NETWORK_ERROR",
            BrokerError::Persistence(_) => "PERSISTENCE_ERROR",
            BrokerError::ChainCorrupt(_) => "CHAIN_CORRUPT",
            BrokerError::Config(_) => "INVALID_CONFIG",
            BrokerError::InvalidParams(_) => "INVALID_PARAMS",
        }
    }

    /// HTTP status code for the local tool adapter
    pub fn status_code(&self) -> StatusCode {
        match self {
            BrokerError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            BrokerError::NoCredential(_) => StatusCode::PRECONDITION_FAILED,
            BrokerError::BudgetExceeded(_) => StatusCode::PAYMENT_REQUIRED,
            BrokerError::Network(_) => StatusCode::BAD_GATEWAY,
            BrokerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BrokerError::ChainCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BrokerError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BrokerError::InvalidParams(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Convert to the `{code, message}` wire shape
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            BrokerError::Persistence(_) | BrokerError::ChainCorrupt(_) => {
                tracing::error!("Broker error: {} - Status code: {}", self, status);
            }
            _ => {
                tracing::warn!("Broker error: {} - Status code: {}", self.code(), status);
            }
        }

        (status, Json(self.to_body())).into_response()
    }
}

/// Result type alias
pub type BrokerResult<T> = Result<T, BrokerError>;
