//! HTTP handlers module
//!
//! The local adapter exposing the broker's tool operations and health checks

pub mod health;
pub mod tools;

use crate::config::Settings;
use crate::middleware::logging::request_logging_middleware;
use crate::providers::ProviderRegistry;
use crate::services::{CallPipeline, ReqwestDispatcher};
use crate::store::{ReceiptLedger, Vault, Wallet};
use anyhow::Result;
use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
///
/// The stores are owned by exactly one pipeline; the mutex serialises the
/// single-consumer access the broker supports.
pub struct AppState {
    pub pipeline: Mutex<CallPipeline>,
}

/// Create the application router, opening the stores from settings
pub async fn create_router(settings: Settings) -> Result<Router> {
    let vault = Vault::open(settings.vault_path());
    let mut wallet = Wallet::open(settings.wallet_path(), settings.broker.default_budget);
    if let Some(budget) = settings.broker.budget_override {
        wallet.set_budget(budget)?;
    }
    let ledger = ReceiptLedger::open(settings.receipts_path());
    let dispatcher = Arc::new(ReqwestDispatcher::new(settings.http.timeout)?);

    let pipeline = CallPipeline::new(
        ProviderRegistry::new(),
        vault,
        wallet,
        ledger,
        dispatcher,
    );

    Ok(router_for_pipeline(pipeline))
}

/// Build the router around an existing pipeline (tests inject fakes here)
pub fn router_for_pipeline(pipeline: CallPipeline) -> Router {
    let app_state = Arc::new(AppState {
        pipeline: Mutex::new(pipeline),
    });

    // Create middleware stack
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::from_fn(request_logging_middleware));

    Router::new()
        .route("/tools/call_api", post(tools::call_api))
        .route("/tools/store_credential", post(tools::store_credential))
        .route("/tools/list_providers", post(tools::list_providers))
        .route("/tools/wallet", post(tools::wallet))
        .route("/tools/receipts", post(tools::receipts))
        .route("/tools/add_provider", post(tools::add_provider))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(middleware_stack)
}
