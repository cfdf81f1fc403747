//! Supply conservation invariant checker.
//!
//! Exchanges and transfers only move tokens between buckets and wallets, so
//! the total held across every wallet changes only when rewards are issued:
//! ```text
//! Σ(sendable + non_sendable) == Σ(issued rewards)
//! ```
//!
//! All amounts are minor units held in `u128`, so the sum over every wallet
//! cannot overflow.

use std::collections::HashMap;

use tokenwallet_types::{Amount, Result, TransactionType, WalletError};

/// Tracks issued supply per reward kind and validates the wallet total
/// against it.
pub struct SupplyConservation {
    issued: HashMap<TransactionType, u128>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issued: HashMap::new(),
        }
    }

    /// Record freshly issued tokens of the given reward kind.
    ///
    /// # Errors
    /// `InvalidRequest` if `kind` is not a reward type.
    pub fn record_issuance(&mut self, kind: TransactionType, amount: Amount) -> Result<()> {
        if !kind.is_reward() {
            return Err(WalletError::InvalidRequest {
                reason: format!("{kind} does not issue tokens"),
            });
        }
        *self.issued.entry(kind).or_insert(0) += u128::from(amount.minor());
        Ok(())
    }

    /// Expected total supply in minor units: everything ever issued.
    #[must_use]
    pub fn expected_supply(&self) -> u128 {
        self.issued.values().sum()
    }

    /// Total issued for one reward kind.
    #[must_use]
    pub fn issued_by(&self, kind: TransactionType) -> u128 {
        self.issued.get(&kind).copied().unwrap_or(0)
    }

    /// Verify that the actual supply (sum of all wallet totals) matches the
    /// issued supply.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if actual ≠ expected.
    pub fn verify(&self, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(WalletError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} minor units \
                     (mining={}, task_reward={}, bonus={}, referral={})",
                    self.issued_by(TransactionType::Mining),
                    self.issued_by(TransactionType::TaskReward),
                    self.issued_by(TransactionType::Bonus),
                    self.issued_by(TransactionType::Referral),
                ),
            });
        }
        Ok(())
    }
}

impl Default for SupplyConservation {
    fn default() -> Self {
        Self::new()
    }
}
