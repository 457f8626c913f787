//! Service layer module
//!
//! Contains the call pipeline and the HTTP dispatcher seam

pub mod dispatcher;
pub mod pipeline;

pub use dispatcher::{DispatchRequest, DispatchResponse, HttpDispatcher, ReqwestDispatcher};
pub use pipeline::CallPipeline;
