//! Credential vault
//!
//! Persists one active credential per provider and injects it into outbound
//! requests. Secret material leaves this module only through
//! [`Vault::inject_auth`] and the privileged body-injection accessor.

use crate::providers::{AuthMethod, ProviderConfig};
use crate::utils::error::{BrokerError, BrokerResult};
use crate::utils::fs::{load_json, write_json_atomic};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Stored credential record; never exposed outside the vault
#[derive(Clone, Serialize, Deserialize)]
struct VaultRecord {
    #[serde(rename = "providerId")]
    provider_id: String,
    credential: String,
    #[serde(rename = "storedAt")]
    stored_at: String,
    active: bool,
}

impl fmt::Debug for VaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultRecord")
            .field("provider_id", &self.provider_id)
            .field("credential", &"<redacted>")
            .field("stored_at", &self.stored_at)
            .field("active", &self.active)
            .finish()
    }
}

/// Public projection of a vault record
///
/// Carries the fingerprint (last four characters) instead of the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    #[serde(rename = "providerId")]
    pub provider_id: String,
    #[serde(rename = "storedAt")]
    pub stored_at: String,
    pub active: bool,
    pub fingerprint: String,
}

fn fingerprint(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

/// The credential store
#[derive(Debug)]
pub struct Vault {
    path: PathBuf,
    records: Vec<VaultRecord>,
}

impl Vault {
    /// Open the vault file, starting empty when it is missing or corrupt
    pub fn open(path: PathBuf) -> Self {
        let records: Vec<VaultRecord> = load_json(&path).unwrap_or_default();
        if !records.is_empty() {
            debug!("Vault loaded with {} credential(s)", records.len());
        }
        Self { path, records }
    }

    /// Store or replace the credential for a provider
    pub fn store(&mut self, provider_id: &str, credential: &str) -> BrokerResult<VaultEntry> {
        let record = VaultRecord {
            provider_id: provider_id.to_string(),
            credential: credential.to_string(),
            stored_at: Utc::now().to_rfc3339(),
            active: true,
        };
        let entry = VaultEntry {
            provider_id: record.provider_id.clone(),
            stored_at: record.stored_at.clone(),
            active: record.active,
            fingerprint: fingerprint(&record.credential),
        };

        match self
            .records
            .iter_mut()
            .find(|r| r.provider_id == provider_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.persist()?;

        info!("Stored credential for provider {}", provider_id);
        Ok(entry)
    }

    /// Remove a provider's credential; returns whether one existed
    pub fn remove(&mut self, provider_id: &str) -> BrokerResult<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.provider_id != provider_id);
        let removed = self.records.len() < before;
        if removed {
            self.persist()?;
            info!("Removed credential for provider {}", provider_id);
        }
        Ok(removed)
    }

    /// Public projections of every record; no secret material
    pub fn list(&self) -> Vec<VaultEntry> {
        self.records
            .iter()
            .map(|r| VaultEntry {
                provider_id: r.provider_id.clone(),
                stored_at: r.stored_at.clone(),
                active: r.active,
                fingerprint: fingerprint(&r.credential),
            })
            .collect()
    }

    /// Whether an active credential exists for the provider
    pub fn has(&self, provider_id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.provider_id == provider_id && r.active)
    }

    /// Write the credential into headers or query parameters per the
    /// provider's auth recipe; body injection is handled by the pipeline
    pub fn inject_auth(
        &self,
        provider_id: &str,
        provider: &ProviderConfig,
        headers: &mut HashMap<String, String>,
        query_params: &mut HashMap<String, String>,
    ) -> BrokerResult<()> {
        let credential = self.active_credential(provider_id)?;
        let value = provider.auth_value(credential);

        match provider.auth_method {
            AuthMethod::Header => {
                headers.insert(provider.auth_field.clone(), value);
            }
            AuthMethod::Query => {
                query_params.insert(provider.auth_field.clone(), value);
            }
            AuthMethod::Body => {}
        }
        Ok(())
    }

    /// Privileged accessor for body-auth providers
    ///
    /// The caller must not log or surface the returned value.
    pub fn credential_for_body_injection(&self, provider_id: &str) -> BrokerResult<String> {
        self.active_credential(provider_id).map(str::to_string)
    }

    fn active_credential(&self, provider_id: &str) -> BrokerResult<&str> {
        self.records
            .iter()
            .find(|r| r.provider_id == provider_id && r.active)
            .map(|r| r.credential.as_str())
            .ok_or_else(|| BrokerError::NoCredential(provider_id.to_string()))
    }

    fn persist(&self) -> BrokerResult<()> {
        write_json_atomic(&self.path, &self.records)
    }
}
