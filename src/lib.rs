//! butterknife library
//!
//! Local credential broker between an AI agent and external HTTP APIs: the
//! agent names a provider and a request; the broker injects credentials,
//! enforces the budget, dispatches the call and mints a hash-chained receipt.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, router_for_pipeline, AppState};
pub use models::{ApiCallRequest, ApiCallResponse, CallReceipt, GENESIS_HASH};
pub use providers::{AuthMethod, CostUnit, ProviderConfig, ProviderRegistry};
pub use services::{CallPipeline, DispatchRequest, DispatchResponse, HttpDispatcher, ReqwestDispatcher};
pub use store::{ReceiptLedger, Vault, VaultEntry, Wallet, WalletState};
pub use utils::error::{BrokerError, BrokerResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
