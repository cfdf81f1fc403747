//! Exchange engine: moves value between one user's two buckets.
//!
//! The debit of the source bucket and the credit of the target bucket are
//! one `apply_delta` under the wallet's lock, so two concurrent exchanges
//! can never both spend the same funds.

use std::sync::Arc;

use tokenwallet_types::{
    Amount, BalanceDelta, ExchangeRequest, Result, Transaction, TransactionType, WalletError,
};
use tracing::{info, warn};

use crate::balance_store::BalanceStore;
use crate::ledger::TransactionLedger;

/// Atomic sendable ⇄ non-sendable exchange.
pub struct ExchangeEngine {
    store: Arc<BalanceStore>,
    ledger: Arc<TransactionLedger>,
}

impl ExchangeEngine {
    #[must_use]
    pub fn new(store: Arc<BalanceStore>, ledger: Arc<TransactionLedger>) -> Self {
        Self { store, ledger }
    }

    /// Execute an exchange and record it.
    ///
    /// An invalid amount is rejected before anything is recorded. A balance
    /// failure is recorded as a failed row and leaves both buckets unchanged.
    ///
    /// # Errors
    /// - `InvalidAmount` if the amount is zero
    /// - `WalletNotFound` if the user has no wallet
    /// - `NoFundsAvailable` if the source bucket is empty
    /// - `InsufficientBalance` if the source bucket holds less than the amount
    pub fn exchange(&self, request: ExchangeRequest) -> Result<Transaction> {
        let ExchangeRequest {
            user_id,
            direction,
            amount,
        } = request;
        amount.ensure_positive()?;
        if !self.store.contains(user_id) {
            return Err(WalletError::WalletNotFound(user_id));
        }

        let pending =
            Transaction::pending(TransactionType::Exchange, Some(user_id), Some(user_id), amount)
                .with_direction(direction);
        let completed = pending.clone().complete()?;

        match self
            .store
            .apply_delta(user_id, BalanceDelta::shift(direction.source(), amount))
        {
            Ok(wallet) => {
                self.ledger.record(completed.clone())?;
                info!(
                    user = %user_id,
                    %direction,
                    %amount,
                    sendable = %wallet.sendable_balance,
                    non_sendable = %wallet.non_sendable_balance,
                    tx = %completed.id,
                    "exchange completed"
                );
                Ok(completed)
            }
            Err(err) => {
                let err = no_funds_if_empty(err);
                warn!(user = %user_id, %direction, %amount, error = %err, "exchange failed");
                self.ledger.record(pending.fail(err.user_message())?)?;
                Err(err)
            }
        }
    }
}

/// An empty source bucket is reported as `NoFundsAvailable` rather than a
/// generic shortfall.
fn no_funds_if_empty(err: WalletError) -> WalletError {
    match err {
        WalletError::InsufficientBalance {
            bucket, available, ..
        } if available == Amount::ZERO => WalletError::NoFundsAvailable { bucket },
        other => other,
    }
}
