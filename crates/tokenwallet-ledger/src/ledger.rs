//! Append-only transaction ledger.
//!
//! Rows are written once, in a terminal state, and never updated. Each
//! user's history is indexed by row position so history and recent
//! recipient queries never scan other users' rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokenwallet_types::{
    Amount, Result, Transaction, TransactionId, TransactionStatus, TransactionType, UserId,
    WalletError,
};

#[derive(Default)]
struct LedgerRows {
    rows: Vec<Transaction>,
    by_user: HashMap<UserId, Vec<usize>>,
    by_id: HashMap<TransactionId, usize>,
}

/// The most recent completed send from one user to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientActivity {
    pub recipient: UserId,
    pub last_date: DateTime<Utc>,
    pub last_amount: Amount,
}

/// Append-only store of every terminal transaction.
pub struct TransactionLedger {
    inner: RwLock<LedgerRows>,
}

impl TransactionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerRows::default()),
        }
    }

    /// Append a terminal transaction.
    ///
    /// # Errors
    /// `Internal` if the row is still pending or its id was already recorded.
    pub fn record(&self, tx: Transaction) -> Result<()> {
        if !tx.status.is_terminal() {
            return Err(WalletError::Internal(format!(
                "refusing to record non-terminal transaction {}",
                tx.id
            )));
        }
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&tx.id) {
            return Err(WalletError::Internal(format!(
                "transaction {} already recorded",
                tx.id
            )));
        }
        let position = inner.rows.len();
        let mut parties: Vec<UserId> = tx.from_user_id.into_iter().chain(tx.to_user_id).collect();
        parties.dedup();
        for user in parties {
            inner.by_user.entry(user).or_default().push(position);
        }
        inner.by_id.insert(tx.id, position);
        inner.rows.push(tx);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        let inner = self.inner.read();
        inner.by_id.get(&id).map(|&pos| inner.rows[pos].clone())
    }

    /// `user`'s transactions, most recent first, as the user sees them
    /// (incoming sends read as receives).
    #[must_use]
    pub fn history(&self, user: UserId, limit: usize) -> Vec<Transaction> {
        let inner = self.inner.read();
        inner
            .by_user
            .get(&user)
            .map(|positions| {
                positions
                    .iter()
                    .rev()
                    .take(limit)
                    .map(|&pos| inner.rows[pos].as_seen_by(user))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct recipients of `user`'s completed sends, most recent first,
    /// each with the date and amount of the latest send to them.
    #[must_use]
    pub fn recent_recipients(&self, user: UserId, limit: usize) -> Vec<RecipientActivity> {
        let inner = self.inner.read();
        let Some(positions) = inner.by_user.get(&user) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        positions
            .iter()
            .rev()
            .map(|&pos| &inner.rows[pos])
            .filter(|tx| {
                tx.tx_type == TransactionType::Send
                    && tx.status == TransactionStatus::Completed
                    && tx.from_user_id == Some(user)
            })
            .filter_map(|tx| {
                let recipient = tx.to_user_id?;
                seen.insert(recipient).then(|| RecipientActivity {
                    recipient,
                    last_date: tx.created_at,
                    last_amount: tx.amount,
                })
            })
            .take(limit)
            .collect()
    }

    /// Total number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}
