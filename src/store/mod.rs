//! State stores module
//!
//! The three persisted stores (vault, wallet, ledger) and the canonical
//! serialisation they hash with. Each store owns one JSON file in the data
//! directory and persists synchronously on every mutation.

pub mod canonical;
pub mod ledger;
pub mod vault;
pub mod wallet;

pub use ledger::{ChainVerification, LedgerSummary, ReceiptLedger};
pub use vault::{Vault, VaultEntry};
pub use wallet::{BudgetCheck, Wallet, WalletState};
