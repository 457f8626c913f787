//! Tool surface handlers
//!
//! The six operations consumed by the external tool-protocol front end.
//! Parameters arrive weakly typed; each handler validates them against its
//! own schema, ignores unknown fields and converts to typed pipeline inputs.

use crate::handlers::AppState;
use crate::models::ApiCallRequest;
use crate::providers::ProviderConfig;
use crate::utils::error::{BrokerError, BrokerResult};
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default number of receipts returned by the `receipts` tool
const DEFAULT_RECEIPT_LIMIT: usize = 10;

/// `call_api`: broker one HTTP call through the pipeline
pub async fn call_api(
    State(state): State<Arc<AppState>>,
    Json(params): Json<Value>,
) -> BrokerResult<Json<Value>> {
    let provider_id = required_str(&params, "provider")?;
    let path = required_str(&params, "path")?;
    let method = optional_str(&params, "method")?
        .unwrap_or_else(|| "POST".to_string())
        .to_uppercase();
    let headers = optional_string_map(&params, "headers")?;
    let query_params = optional_string_map(&params, "queryParams")?;
    let body = params.get("body").cloned();

    debug!("Tool call_api: {} {} via {}", method, path, provider_id);

    let request = ApiCallRequest {
        provider_id,
        method,
        path,
        headers,
        query_params,
        body,
    };

    let mut pipeline = state.pipeline.lock().await;
    let response = pipeline.call(request).await?;

    Ok(Json(serde_json::to_value(response).map_err(|e| {
        BrokerError::Persistence(format!("serialize response: {}", e))
    })?))
}

/// `store_credential`: upsert a provider credential into the vault
pub async fn store_credential(
    State(state): State<Arc<AppState>>,
    Json(params): Json<Value>,
) -> BrokerResult<Json<Value>> {
    let provider_id = required_str(&params, "provider")?;
    let credential = required_str(&params, "credential")?;

    let mut pipeline = state.pipeline.lock().await;
    let entry = pipeline.vault_mut().store(&provider_id, &credential)?;

    Ok(Json(json!({ "stored": true, "entry": entry })))
}

/// `list_providers`: registry inventory with a credential flag
///
/// Providers without credentials are included so the agent can discover what
/// still needs a key.
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    _params: Option<Json<Value>>,
) -> BrokerResult<Json<Value>> {
    let pipeline = state.pipeline.lock().await;

    let providers: Vec<Value> = pipeline
        .registry()
        .list()
        .into_iter()
        .map(|provider| {
            let mut entry = serde_json::to_value(provider).unwrap_or_else(|_| json!({}));
            if let Some(map) = entry.as_object_mut() {
                map.insert(
                    "hasCredential".to_string(),
                    Value::Bool(pipeline.vault().has(&provider.id)),
                );
            }
            entry
        })
        .collect();

    Ok(Json(json!({ "providers": providers })))
}

/// `wallet`: budget snapshot
pub async fn wallet(
    State(state): State<Arc<AppState>>,
    _params: Option<Json<Value>>,
) -> BrokerResult<Json<Value>> {
    let pipeline = state.pipeline.lock().await;
    let wallet_state = pipeline.wallet().state();

    let mut snapshot = serde_json::to_value(&wallet_state)
        .map_err(|e| BrokerError::Persistence(format!("serialize wallet: {}", e)))?;
    if let Some(map) = snapshot.as_object_mut() {
        map.insert("remaining".to_string(), json!(wallet_state.remaining()));
    }

    Ok(Json(snapshot))
}

/// `receipts`: recent receipts plus the ledger summary
pub async fn receipts(
    State(state): State<Arc<AppState>>,
    params: Option<Json<Value>>,
) -> BrokerResult<Json<Value>> {
    let params = params.map(|Json(value)| value).unwrap_or_else(|| json!({}));
    let limit = match params.get("limit") {
        None | Some(Value::Null) => DEFAULT_RECEIPT_LIMIT,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| BrokerError::InvalidParams("limit must be a non-negative integer".to_string()))?
            as usize,
    };

    let pipeline = state.pipeline.lock().await;
    let ledger = pipeline.ledger();

    Ok(Json(json!({
        "summary": ledger.summary(),
        "receipts": ledger.recent(limit),
    })))
}

/// `add_provider`: upsert a provider descriptor into the registry
pub async fn add_provider(
    State(state): State<Arc<AppState>>,
    Json(params): Json<Value>,
) -> BrokerResult<Json<Value>> {
    let provider: ProviderConfig = serde_json::from_value(params)
        .map_err(|e| BrokerError::InvalidParams(format!("provider config: {}", e)))?;

    if provider.id.trim().is_empty() {
        return Err(BrokerError::InvalidParams("provider id cannot be empty".to_string()));
    }
    if provider.id != provider.id.to_lowercase() {
        return Err(BrokerError::InvalidParams("provider id must be lowercase".to_string()));
    }
    if !provider.base_url.starts_with("http") {
        return Err(BrokerError::InvalidParams(format!(
            "invalid base URL: {}",
            provider.base_url
        )));
    }

    let mut pipeline = state.pipeline.lock().await;
    pipeline.registry_mut().add(provider.clone());

    Ok(Json(json!({ "added": true, "provider": provider })))
}

/// Extract a required non-empty string field
fn required_str(params: &Value, field: &str) -> BrokerResult<String> {
    match params.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(BrokerError::InvalidParams(format!(
            "field '{}' cannot be empty",
            field
        ))),
        Some(_) => Err(BrokerError::InvalidParams(format!(
            "field '{}' must be a string",
            field
        ))),
        None => Err(BrokerError::InvalidParams(format!(
            "missing required field '{}'",
            field
        ))),
    }
}

/// Extract an optional string field
fn optional_str(params: &Value, field: &str) -> BrokerResult<Option<String>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(BrokerError::InvalidParams(format!(
            "field '{}' must be a string",
            field
        ))),
    }
}

/// Extract an optional object of string values
fn optional_string_map(params: &Value, field: &str) -> BrokerResult<HashMap<String, String>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(HashMap::new()),
        Some(Value::Object(map)) => {
            let mut out = HashMap::new();
            for (key, value) in map {
                match value.as_str() {
                    Some(s) => {
                        out.insert(key.clone(), s.to_string());
                    }
                    None => {
                        return Err(BrokerError::InvalidParams(format!(
                            "field '{}.{}' must be a string",
                            field, key
                        )))
                    }
                }
            }
            Ok(out)
        }
        Some(_) => Err(BrokerError::InvalidParams(format!(
            "field '{}' must be an object",
            field
        ))),
    }
}
