//! Call pipeline
//!
//! Orchestrates one brokered call: registry lookup, credential check, budget
//! gate, auth injection, dispatch, cost metering, spend recording and receipt
//! minting. Any failure aborts the remaining steps; nothing credential-bearing
//! leaves the pipeline.

use crate::models::{ApiCallRequest, ApiCallResponse};
use crate::providers::{cost_for_thousand, AuthMethod, CostUnit, ProviderConfig, ProviderRegistry};
use crate::services::dispatcher::{DispatchRequest, HttpDispatcher};
use crate::store::{ReceiptLedger, Vault, Wallet};
use crate::utils::error::{BrokerError, BrokerResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::form_urlencoded;

/// The broker core: one pipeline owns the three stores and the registry
pub struct CallPipeline {
    registry: ProviderRegistry,
    vault: Vault,
    wallet: Wallet,
    ledger: ReceiptLedger,
    dispatcher: Arc<dyn HttpDispatcher>,
}

impl CallPipeline {
    pub fn new(
        registry: ProviderRegistry,
        vault: Vault,
        wallet: Wallet,
        ledger: ReceiptLedger,
        dispatcher: Arc<dyn HttpDispatcher>,
    ) -> Self {
        Self {
            registry,
            vault,
            wallet,
            ledger,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut Vault {
        &mut self.vault
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    pub fn ledger(&self) -> &ReceiptLedger {
        &self.ledger
    }

    /// Execute one brokered call end to end
    pub async fn call(&mut self, request: ApiCallRequest) -> BrokerResult<ApiCallResponse> {
        // 1. Resolve provider
        let provider = self
            .registry
            .get(&request.provider_id)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownProvider(request.provider_id.clone()))?;

        // 2. Credential check before any spend-side work
        if !self.vault.has(&request.provider_id) {
            return Err(BrokerError::NoCredential(request.provider_id.clone()));
        }

        // 3. Estimate cost from the raw request body
        let estimated_cost = self
            .registry
            .estimate_cost(&request.provider_id, request.body.as_ref());

        // 4. Budget gate
        let check = self.wallet.check_budget(&request.provider_id, estimated_cost);
        if !check.allowed {
            let reason = check
                .reason
                .unwrap_or_else(|| "budget check denied".to_string());
            warn!("Budget gate denied call to {}: {}", request.provider_id, reason);
            return Err(BrokerError::BudgetExceeded(reason));
        }

        // 5. Compose the outbound request
        let mut headers: HashMap<String, String> =
            HashMap::from([("Content-Type".to_string(), "application/json".to_string())]);
        headers.extend(request.headers.clone());
        let mut query_params = request.query_params.clone();

        self.vault
            .inject_auth(&request.provider_id, &provider, &mut headers, &mut query_params)?;

        let outbound_body = self.compose_body(&request, &provider)?;
        let url = build_url(&provider.base_url, &request.path, &query_params);

        // 6. Dispatch; transport failures abort before any spend
        let dispatch_request = DispatchRequest {
            method: request.method.clone(),
            url,
            headers,
            body: if request.method == "GET" {
                None
            } else {
                outbound_body
                    .as_ref()
                    .map(|body| serde_json::to_vec(body).unwrap_or_default())
            },
        };

        let response = self.dispatcher.dispatch(dispatch_request).await?;
        let status = response.status;

        // 7. Parse the response body
        let data = parse_response_body(
            response.header("content-type").unwrap_or(""),
            &response.body,
        );

        // 8. Actual cost supersedes the estimate when usage is reported
        let cost = actual_cost(&provider, &data).unwrap_or(estimated_cost);

        // 9. Record spend even on non-2xx responses
        let remaining_budget = self.wallet.record_spend(&request.provider_id, cost)?;

        // 10. Mint the receipt over a credential-free request descriptor
        let descriptor = json!({
            "method": request.method,
            "path": request.path,
            "queryParams": request.query_params,
            "bodyHash": if request.body.is_some() { "present" } else { "absent" },
        });
        let receipt = self
            .ledger
            .mint(&request.provider_id, cost, &descriptor, &data)?;

        info!(
            "Brokered {} {} to {} (status {}, cost {})",
            request.method, request.path, request.provider_id, status, cost
        );

        // 11. Return nothing credential-bearing
        Ok(ApiCallResponse {
            status,
            data,
            receipt,
            cost,
            remaining_budget,
        })
    }

    /// Body to send upstream; merges the credential for body-auth providers
    fn compose_body(
        &self,
        request: &ApiCallRequest,
        provider: &ProviderConfig,
    ) -> BrokerResult<Option<Value>> {
        if provider.auth_method != AuthMethod::Body {
            return Ok(request.body.clone());
        }

        match &request.body {
            Some(Value::Object(map)) => {
                let credential = self
                    .vault
                    .credential_for_body_injection(&request.provider_id)?;
                let mut merged = map.clone();
                merged.insert(provider.auth_field.clone(), Value::String(credential));
                Ok(Some(Value::Object(merged)))
            }
            // Coercing a non-object body would silently change its shape
            _ => Err(BrokerError::Config(format!(
                "provider {} uses body auth and requires a JSON object body",
                provider.id
            ))),
        }
    }
}

/// Join base URL and path with exactly one `/`, then append query parameters
fn build_url(base_url: &str, path: &str, query_params: &HashMap<String, String>) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut url = format!("{}/{}", base, path);

    if !query_params.is_empty() {
        let mut pairs: Vec<(&String, &String)> = query_params.iter().collect();
        pairs.sort();

        let query: String = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        url.push('?');
        url.push_str(&query);
    }

    url
}

/// Parse the upstream body: JSON when advertised, raw text otherwise
fn parse_response_body(content_type: &str, body: &[u8]) -> Value {
    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_slice(body) {
            return value;
        }
        debug!("Advertised JSON body failed to parse; falling back to text");
    }
    Value::String(String::from_utf8_lossy(body).into_owned())
}

/// Metered cost from reported usage, when the provider bills per 1k tokens
fn actual_cost(provider: &ProviderConfig, data: &Value) -> Option<u64> {
    if provider.cost_unit != CostUnit::Per1kTokens {
        return None;
    }
    let total_tokens = data.get("usage")?.get("total_tokens")?.as_u64()?;
    Some(cost_for_thousand(total_tokens, provider.cost_per_unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn per_1k_provider() -> ProviderConfig {
        ProviderConfig {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            auth_method: AuthMethod::Header,
            auth_field: "Authorization".to_string(),
            auth_prefix: Some("Bearer ".to_string()),
            cost_per_unit: 3000,
            cost_unit: CostUnit::Per1kTokens,
        }
    }

    #[test]
    fn test_build_url_single_slash() {
        let empty = HashMap::new();
        assert_eq!(
            build_url("https://api.openai.com/v1/", "/chat/completions", &empty),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            build_url("https://api.openai.com/v1", "chat/completions", &empty),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_url_query_params() {
        let params = HashMap::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "x y".to_string()),
        ]);
        let url = build_url("https://api.example.com", "/search", &params);
        assert_eq!(url, "https://api.example.com/search?a=x+y&b=2");
    }

    #[test]
    fn test_parse_json_body() {
        let parsed = parse_response_body("application/json; charset=utf-8", b"{\"ok\":true}");
        assert_eq!(parsed, json!({"ok": true}));
    }

    #[test]
    fn test_parse_invalid_json_falls_back_to_text() {
        let parsed = parse_response_body("application/json", b"not json");
        assert_eq!(parsed, json!("not json"));
    }

    #[test]
    fn test_parse_text_body() {
        let parsed = parse_response_body("text/plain", b"hello");
        assert_eq!(parsed, json!("hello"));
    }

    #[test]
    fn test_actual_cost_from_usage() {
        let provider = per_1k_provider();
        let data = json!({"usage": {"total_tokens": 1000}});
        assert_eq!(actual_cost(&provider, &data), Some(3000));

        let data = json!({"usage": {"total_tokens": 2000}});
        assert_eq!(actual_cost(&provider, &data), Some(6000));
    }

    #[test]
    fn test_actual_cost_absent_usage() {
        let provider = per_1k_provider();
        assert_eq!(actual_cost(&provider, &json!({"choices": []})), None);
        assert_eq!(actual_cost(&provider, &json!("plain text")), None);
    }

    #[test]
    fn test_actual_cost_ignored_for_other_units() {
        let mut provider = per_1k_provider();
        provider.cost_unit = CostUnit::PerRequest;
        let data = json!({"usage": {"total_tokens": 1000}});
        assert_eq!(actual_cost(&provider, &data), None);
    }
}
