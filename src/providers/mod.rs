//! Provider registry module
//!
//! Holds provider descriptors (base URL, auth injection recipe, cost model)
//! and answers lookups and cost estimates

use crate::store::canonical::canonical_json_opt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where the credential is injected into the outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Written into a request header
    Header,
    /// Appended as a query parameter
    Query,
    /// Shallow-merged into a JSON object body
    Body,
}

/// Unit the provider bills by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostUnit {
    #[serde(rename = "per_request")]
    PerRequest,
    #[serde(rename = "per_1k_tokens")]
    Per1kTokens,
    #[serde(rename = "per_1k_chars")]
    Per1kChars,
}

/// Provider descriptor
///
/// Immutable once registered; `add` replaces the whole record by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Opaque lowercase identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// API base URL; trailing slashes are stripped when building URLs
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Credential injection recipe
    #[serde(rename = "authMethod")]
    pub auth_method: AuthMethod,

    /// Header name, query parameter name or body key to carry the credential
    #[serde(rename = "authField")]
    pub auth_field: String,

    /// Literal prepended to the credential value
    #[serde(rename = "authPrefix", skip_serializing_if = "Option::is_none")]
    pub auth_prefix: Option<String>,

    /// Price per unit in microdollars
    #[serde(rename = "costPerUnit")]
    pub cost_per_unit: u64,

    /// Unit the price applies to
    #[serde(rename = "costUnit")]
    pub cost_unit: CostUnit,
}

impl ProviderConfig {
    /// Credential value as injected: `auth_prefix || credential`
    pub fn auth_value(&self, credential: &str) -> String {
        match &self.auth_prefix {
            Some(prefix) => format!("{}{}", prefix, credential),
            None => credential.to_string(),
        }
    }
}

/// Registry of provider descriptors
///
/// Ships a fixed built-in set; user-added providers follow in registration
/// order. Lookups are by id.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
    order: Vec<String>,
}

fn bearer_provider(id: &str, name: &str, base_url: &str, cost_per_unit: u64) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth_method: AuthMethod::Header,
        auth_field: "Authorization".to_string(),
        auth_prefix: Some("Bearer ".to_string()),
        cost_per_unit,
        cost_unit: CostUnit::Per1kTokens,
    }
}

/// The fixed default provider set
///
/// Ids and auth recipes are load-bearing: credentials already stored under
/// these ids keep working across upgrades.
pub fn builtin_providers() -> Vec<ProviderConfig> {
    vec![
        bearer_provider("openai", "OpenAI", "https://api.openai.com/v1", 3000),
        ProviderConfig {
            id: "anthropic".to_string(),
            name: "Anthropic".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            auth_method: AuthMethod::Header,
            auth_field: "x-api-key".to_string(),
            auth_prefix: None,
            cost_per_unit: 3000,
            cost_unit: CostUnit::Per1kTokens,
        },
        bearer_provider("groq", "Groq", "https://api.groq.com/openai/v1", 100),
        bearer_provider("together", "Together AI", "https://api.together.xyz/v1", 200),
        bearer_provider(
            "fireworks",
            "Fireworks AI",
            "https://api.fireworks.ai/inference/v1",
            200,
        ),
        bearer_provider("perplexity", "Perplexity", "https://api.perplexity.ai", 1000),
    ]
}

impl ProviderRegistry {
    /// Create a registry seeded with the built-in providers
    pub fn new() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            order: Vec::new(),
        };
        for provider in builtin_providers() {
            registry.add(provider);
        }
        registry
    }

    /// Create an empty registry (tests and custom setups)
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Look up a provider by id
    pub fn get(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_id)
    }

    /// Whether a provider is registered
    pub fn has(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Register or replace a provider
    pub fn add(&mut self, provider: ProviderConfig) {
        if !self.providers.contains_key(&provider.id) {
            self.order.push(provider.id.clone());
        }
        self.providers.insert(provider.id.clone(), provider);
    }

    /// All providers: built-ins first, then user-added in registration order
    pub fn list(&self) -> Vec<&ProviderConfig> {
        self.order
            .iter()
            .filter_map(|id| self.providers.get(id))
            .collect()
    }

    /// Estimate the cost of a request in microdollars
    ///
    /// `per_1k_tokens` approximates 4 bytes per token over the canonical JSON
    /// body; the actual metered cost supersedes this whenever the response
    /// reports usage. Unknown providers estimate 0 and are rejected earlier
    /// in the pipeline.
    pub fn estimate_cost(&self, provider_id: &str, request_body: Option<&serde_json::Value>) -> u64 {
        let provider = match self.providers.get(provider_id) {
            Some(provider) => provider,
            None => return 0,
        };

        match provider.cost_unit {
            CostUnit::PerRequest => provider.cost_per_unit,
            CostUnit::Per1kTokens => {
                let serialized = canonical_json_opt(request_body);
                let tokens = (serialized.len() as u64).div_ceil(4);
                cost_for_thousand(tokens, provider.cost_per_unit)
            }
            CostUnit::Per1kChars => {
                let serialized = canonical_json_opt(request_body);
                let chars = serialized.chars().count() as u64;
                cost_for_thousand(chars, provider.cost_per_unit)
            }
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `⌈units / 1000 · cost_per_unit⌉` in integer arithmetic
pub(crate) fn cost_for_thousand(units: u64, cost_per_unit: u64) -> u64 {
    units.saturating_mul(cost_per_unit).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn per_request_provider(id: &str, cost: u64) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            base_url: "https://api.example.com".to_string(),
            auth_method: AuthMethod::Header,
            auth_field: "Authorization".to_string(),
            auth_prefix: Some("Bearer ".to_string()),
            cost_per_unit: cost,
            cost_unit: CostUnit::PerRequest,
        }
    }

    #[test]
    fn test_builtins_present() {
        let registry = ProviderRegistry::new();
        for id in ["openai", "anthropic", "groq", "together", "fireworks", "perplexity"] {
            assert!(registry.has(id), "missing builtin {}", id);
        }
        assert_eq!(registry.list()[0].id, "openai");
    }

    #[test]
    fn test_add_is_upsert() {
        let mut registry = ProviderRegistry::new();
        let count = registry.list().len();

        let mut custom = per_request_provider("custom", 10);
        registry.add(custom.clone());
        assert_eq!(registry.list().len(), count + 1);

        custom.cost_per_unit = 20;
        registry.add(custom);
        assert_eq!(registry.list().len(), count + 1);
        assert_eq!(registry.get("custom").unwrap().cost_per_unit, 20);
    }

    #[test]
    fn test_user_added_listed_after_builtins() {
        let mut registry = ProviderRegistry::new();
        registry.add(per_request_provider("zeta", 1));
        registry.add(per_request_provider("alpha", 1));

        let ids: Vec<&str> = registry.list().iter().map(|p| p.id.as_str()).collect();
        let zeta = ids.iter().position(|id| *id == "zeta").unwrap();
        let alpha = ids.iter().position(|id| *id == "alpha").unwrap();
        assert!(zeta > ids.iter().position(|id| *id == "perplexity").unwrap());
        assert!(alpha > zeta);
    }

    #[test]
    fn test_estimate_per_request() {
        let mut registry = ProviderRegistry::empty();
        registry.add(per_request_provider("flat", 500));
        assert_eq!(registry.estimate_cost("flat", None), 500);
        assert_eq!(registry.estimate_cost("flat", Some(&json!({"q": "x"}))), 500);
    }

    #[test]
    fn test_estimate_per_1k_tokens_rounds_up() {
        let registry = ProviderRegistry::new();
        // "null" is 4 bytes -> 1 token -> ceil(1 * 3000 / 1000) = 3
        assert_eq!(registry.estimate_cost("openai", None), 3);
    }

    #[test]
    fn test_estimate_unknown_provider_is_zero() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.estimate_cost("nope", Some(&json!({}))), 0);
    }

    #[test]
    fn test_auth_value_prefix() {
        let provider = per_request_provider("p", 1);
        assert_eq!(provider.auth_value("sk-123"), "Bearer sk-123");

        let registry = ProviderRegistry::new();
        let anthropic = registry.get("anthropic").unwrap();
        assert_eq!(anthropic.auth_value("sk-ant"), "sk-ant");
    }
}
