//! Data models module
//!
//! Defines the pipeline's request/response types and the receipt record

pub mod api;
pub mod receipt;

pub use api::{ApiCallRequest, ApiCallResponse};
pub use receipt::{CallReceipt, GENESIS_HASH};
