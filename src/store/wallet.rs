//! Budget wallet
//!
//! Tracks total budget and cumulative spend in integer microdollars.
//! The budget gate is advisory: it denies before dispatch, but a call that
//! already passed the gate records its full actual cost with no refund.

use crate::utils::error::BrokerResult;
use crate::utils::fs::{load_json, write_json_atomic};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Wallet snapshot; safe to show to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
    /// Total budget in microdollars
    #[serde(rename = "totalBudget")]
    pub total_budget: u64,

    /// Cumulative spend in microdollars
    pub spent: u64,

    /// Spend per provider; sums to `spent`
    #[serde(rename = "byProvider")]
    pub by_provider: HashMap<String, u64>,

    /// Set once when the wallet file is first created
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl WalletState {
    /// Budget remaining, floored at zero
    pub fn remaining(&self) -> u64 {
        self.total_budget.saturating_sub(self.spent)
    }
}

/// Outcome of the pre-call budget gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub allowed: bool,

    /// Estimated cost the gate evaluated
    #[serde(rename = "estimatedCost")]
    pub estimated_cost: u64,

    /// Remaining budget after the estimated spend (unchanged when denied)
    #[serde(rename = "remainingAfter")]
    pub remaining_after: u64,

    /// Denial reason; absent when allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The budget store
#[derive(Debug)]
pub struct Wallet {
    path: PathBuf,
    state: WalletState,
}

impl Wallet {
    /// Open the wallet file, initialising a fresh state when missing
    pub fn open(path: PathBuf, default_budget: u64) -> Self {
        let state = load_json(&path).unwrap_or_else(|| WalletState {
            total_budget: default_budget,
            spent: 0,
            by_provider: HashMap::new(),
            created_at: Utc::now().to_rfc3339(),
        });
        debug!(
            "Wallet opened: budget {} spent {}",
            state.total_budget, state.spent
        );
        Self { path, state }
    }

    /// Current state snapshot
    pub fn state(&self) -> WalletState {
        self.state.clone()
    }

    /// Pre-call budget gate
    ///
    /// Allows when the estimate fits the remaining budget exactly or better.
    pub fn check_budget(&self, provider_id: &str, estimated_cost: u64) -> BudgetCheck {
        let remaining = self.state.remaining();
        if estimated_cost <= remaining {
            BudgetCheck {
                allowed: true,
                estimated_cost,
                remaining_after: remaining - estimated_cost,
                reason: None,
            }
        } else {
            BudgetCheck {
                allowed: false,
                estimated_cost,
                remaining_after: remaining,
                reason: Some(format!(
                    "estimated cost {} exceeds remaining budget {} for provider {}",
                    estimated_cost, remaining, provider_id
                )),
            }
        }
    }

    /// Record actual spend after a call completed; returns the new remaining
    pub fn record_spend(&mut self, provider_id: &str, actual_cost: u64) -> BrokerResult<u64> {
        self.state.spent = self.state.spent.saturating_add(actual_cost);
        let entry = self
            .state
            .by_provider
            .entry(provider_id.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(actual_cost);
        self.persist()?;

        debug!(
            "Recorded spend of {} for provider {}; remaining {}",
            actual_cost,
            provider_id,
            self.state.remaining()
        );
        Ok(self.state.remaining())
    }

    /// Replace the total budget
    pub fn set_budget(&mut self, total_budget: u64) -> BrokerResult<()> {
        self.state.total_budget = total_budget;
        self.persist()?;
        info!("Budget set to {} microdollars", total_budget);
        Ok(())
    }

    /// Zero the cumulative spend and the per-provider map
    pub fn reset_spend(&mut self) -> BrokerResult<()> {
        self.state.spent = 0;
        self.state.by_provider.clear();
        self.persist()?;
        info!("Spend counters reset");
        Ok(())
    }

    fn persist(&self) -> BrokerResult<()> {
        write_json_atomic(&self.path, &self.state)
    }
}
