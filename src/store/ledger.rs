//! Hash-chained receipt ledger
//!
//! Appends one receipt per completed call, each linked to its predecessor by
//! hash. The chain shares a single context id generated when the ledger file
//! is first created.

use crate::models::receipt::{CallReceipt, GENESIS_HASH};
use crate::store::canonical::{hash_value, sha256_hex};
use crate::utils::error::BrokerResult;
use crate::utils::fs::{load_json, write_json_atomic};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// On-disk ledger document
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(rename = "contextId")]
    context_id: String,
    receipts: Vec<CallReceipt>,
}

/// Result of a chain verification pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,

    /// Index of the first failing receipt
    #[serde(rename = "brokenAt", skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChainVerification {
    fn ok() -> Self {
        Self {
            valid: true,
            broken_at: None,
            reason: None,
        }
    }

    fn broken(index: usize, reason: &str) -> Self {
        Self {
            valid: false,
            broken_at: Some(index),
            reason: Some(reason.to_string()),
        }
    }
}

/// Per-provider usage aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub count: u64,
    pub cost: u64,
}

/// Ledger usage summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    #[serde(rename = "totalReceipts")]
    pub total_receipts: usize,

    #[serde(rename = "totalCost")]
    pub total_cost: u64,

    #[serde(rename = "byProvider")]
    pub by_provider: HashMap<String, ProviderUsage>,

    #[serde(rename = "chainValid")]
    pub chain_valid: bool,

    #[serde(rename = "contextId")]
    pub context_id: String,
}

/// The receipt store
#[derive(Debug)]
pub struct ReceiptLedger {
    path: PathBuf,
    context_id: String,
    receipts: Vec<CallReceipt>,
}

impl ReceiptLedger {
    /// Open the ledger file, minting a fresh context id when it is missing
    /// or corrupt
    pub fn open(path: PathBuf) -> Self {
        match load_json::<LedgerFile>(&path) {
            Some(file) => {
                debug!(
                    "Ledger loaded: context {} with {} receipt(s)",
                    file.context_id,
                    file.receipts.len()
                );
                Self {
                    path,
                    context_id: file.context_id,
                    receipts: file.receipts,
                }
            }
            None => Self {
                path,
                context_id: Uuid::new_v4().to_string(),
                receipts: Vec::new(),
            },
        }
    }

    /// Context id shared by every receipt in this ledger
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Mint a receipt for a completed call and append it to the chain
    ///
    /// The request descriptor must already be credential-free; this module
    /// hashes whatever it is given.
    pub fn mint(
        &mut self,
        provider_id: &str,
        cost: u64,
        request_descriptor: &Value,
        response_body: &Value,
    ) -> BrokerResult<CallReceipt> {
        let previous_receipt_hash = self
            .receipts
            .last()
            .map(|r| r.receipt_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut receipt = CallReceipt {
            receipt_id: Uuid::new_v4().to_string(),
            context_id: self.context_id.clone(),
            provider_id: provider_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            cost,
            request_hash: hash_value(Some(request_descriptor)),
            response_hash: hash_value(Some(response_body)),
            previous_receipt_hash,
            receipt_hash: String::new(),
        };
        receipt.receipt_hash = sha256_hex(&receipt.hash_preimage());

        self.receipts.push(receipt.clone());
        self.persist()?;

        debug!(
            "Minted receipt {} for provider {} (cost {})",
            receipt.receipt_id, provider_id, cost
        );
        Ok(receipt)
    }

    /// The full chain in append order
    pub fn chain(&self) -> &[CallReceipt] {
        &self.receipts
    }

    /// The last `n` receipts (all of them when the chain is shorter)
    pub fn recent(&self, n: usize) -> &[CallReceipt] {
        let start = self.receipts.len().saturating_sub(n);
        &self.receipts[start..]
    }

    /// Verify link continuity and recomputed hashes, reporting the first
    /// failing index
    pub fn verify(&self) -> ChainVerification {
        let mut expected_previous = GENESIS_HASH.to_string();

        for (i, receipt) in self.receipts.iter().enumerate() {
            if receipt.previous_receipt_hash != expected_previous {
                return ChainVerification::broken(i, "previous hash mismatch");
            }
            if receipt.compute_hash() != receipt.receipt_hash {
                return ChainVerification::broken(i, "hash mismatch");
            }
            expected_previous = receipt.receipt_hash.clone();
        }

        ChainVerification::ok()
    }

    /// Aggregate usage over the whole chain
    pub fn summary(&self) -> LedgerSummary {
        let mut by_provider: HashMap<String, ProviderUsage> = HashMap::new();
        let mut total_cost: u64 = 0;

        for receipt in &self.receipts {
            total_cost = total_cost.saturating_add(receipt.cost);
            let usage = by_provider
                .entry(receipt.provider_id.clone())
                .or_insert(ProviderUsage { count: 0, cost: 0 });
            usage.count += 1;
            usage.cost = usage.cost.saturating_add(receipt.cost);
        }

        LedgerSummary {
            total_receipts: self.receipts.len(),
            total_cost,
            by_provider,
            chain_valid: self.verify().valid,
            context_id: self.context_id.clone(),
        }
    }

    fn persist(&self) -> BrokerResult<()> {
        write_json_atomic(
            &self.path,
            &LedgerFile {
                context_id: self.context_id.clone(),
                receipts: self.receipts.clone(),
            },
        )
    }
}
