//! Call receipt record
//!
//! One receipt per completed call, hash-linked to its predecessor

use crate::store::canonical::sha256_hex;
use serde::{Deserialize, Serialize};

/// Predecessor hash of the first receipt in a chain
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A tamper-evident record of one completed API call
///
/// `receipt_hash` commits to the identifiers and the request/response hashes
/// plus the predecessor's hash, so any reordering or rewrite of those fields
/// breaks verification from that index onward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReceipt {
    /// Random 128-bit identifier for this receipt
    #[serde(rename = "receiptId")]
    pub receipt_id: String,

    /// Ledger-wide identifier shared by every receipt in the chain
    #[serde(rename = "contextId")]
    pub context_id: String,

    /// Provider the call was dispatched to
    #[serde(rename = "providerId")]
    pub provider_id: String,

    /// RFC-3339 mint time
    pub timestamp: String,

    /// Metered cost in microdollars
    pub cost: u64,

    /// Canonical hash of the request descriptor
    #[serde(rename = "requestHash")]
    pub request_hash: String,

    /// Canonical hash of the parsed response
    #[serde(rename = "responseHash")]
    pub response_hash: String,

    /// Predecessor's receipt hash, or the genesis hash at index 0
    #[serde(rename = "previousReceiptHash")]
    pub previous_receipt_hash: String,

    /// Hash over this receipt's preimage
    #[serde(rename = "receiptHash")]
    pub receipt_hash: String,
}

impl CallReceipt {
    /// The exact byte string hashed into `receipt_hash`
    pub fn hash_preimage(&self) -> String {
        format!(
            "{}||{}||{}||{}||{}",
            self.receipt_id,
            self.context_id,
            self.request_hash,
            self.response_hash,
            self.previous_receipt_hash
        )
    }

    /// Recompute the receipt hash from the stored fields
    pub fn compute_hash(&self) -> String {
        sha256_hex(&self.hash_preimage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CallReceipt {
        let mut receipt = CallReceipt {
            receipt_id: "r-1".to_string(),
            context_id: "c-1".to_string(),
            provider_id: "openai".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            cost: 42,
            request_hash: "a".repeat(64),
            response_hash: "b".repeat(64),
            previous_receipt_hash: GENESIS_HASH.to_string(),
            receipt_hash: String::new(),
        };
        receipt.receipt_hash = receipt.compute_hash();
        receipt
    }

    #[test]
    fn test_preimage_shape() {
        let receipt = sample();
        let preimage = receipt.hash_preimage();
        assert!(preimage.starts_with("r-1||c-1||"));
        assert!(preimage.ends_with(GENESIS_HASH));
        assert_eq!(preimage.matches("||").count(), 4);
    }

    #[test]
    fn test_hash_is_stable() {
        let receipt = sample();
        assert_eq!(receipt.compute_hash(), receipt.receipt_hash);
        assert_eq!(receipt.receipt_hash.len(), 64);
    }

    #[test]
    fn test_serde_field_names() {
        let receipt = sample();
        let value = serde_json::to_value(&receipt).unwrap();
        assert!(value.get("receiptId").is_some());
        assert!(value.get("previousReceiptHash").is_some());
        assert!(value.get("receipt_id").is_none());
    }
}
