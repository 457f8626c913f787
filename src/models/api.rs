//! Pipeline request and response types

use crate::models::receipt::CallReceipt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A brokered API call, as handed to the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallRequest {
    /// Registry id of the target provider
    #[serde(rename = "providerId")]
    pub provider_id: String,

    /// HTTP method, uppercase
    pub method: String,

    /// Path joined onto the provider's base URL
    pub path: String,

    /// Caller-supplied headers, merged over the defaults
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Query parameters appended to the URL
    #[serde(rename = "queryParams", default)]
    pub query_params: HashMap<String, String>,

    /// Optional JSON body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ApiCallRequest {
    /// Build a request with empty headers and query parameters
    pub fn new(
        provider_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let method: String = method.into();
        Self {
            provider_id: provider_id.into(),
            method: method.to_uppercase(),
            path: path.into(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            body: None,
        }
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Result of a brokered call
///
/// Contains nothing credential-bearing: status, parsed data, the minted
/// receipt and the post-call budget position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallResponse {
    /// Upstream HTTP status
    pub status: u16,

    /// Parsed response body (JSON where advertised, text otherwise)
    pub data: serde_json::Value,

    /// Receipt minted for this call
    pub receipt: CallReceipt,

    /// Metered cost in microdollars
    pub cost: u64,

    /// Budget remaining after the spend was recorded
    #[serde(rename = "remainingBudget")]
    pub remaining_budget: u64,
}
