//! Transaction records for the ledger audit trail.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  both legs applied  ┌───────────┐
//!   │ PENDING ├────────────────────▶│ COMPLETED │
//!   └────┬────┘                     └───────────┘
//!        │ validation / mutation failed
//!        ▼
//!   ┌────────┐
//!   │ FAILED │
//!   └────────┘
//! ```
//!
//! A transaction is built in `Pending` when a mutation is accepted and is
//! only ever written to the ledger in a terminal state. Once written it is
//! immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, ExchangeDirection, TransactionId, UserId, WalletError};

/// What kind of movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Send,
    Receive,
    Exchange,
    Mining,
    TaskReward,
    Bonus,
    Referral,
}

impl TransactionType {
    /// Types that represent freshly issued tokens from an external engine.
    #[must_use]
    pub fn is_reward(self) -> bool {
        matches!(
            self,
            Self::Mining | Self::TaskReward | Self::Bonus | Self::Referral
        )
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Receive => write!(f, "receive"),
            Self::Exchange => write!(f, "exchange"),
            Self::Mining => write!(f, "mining"),
            Self::TaskReward => write!(f, "task_reward"),
            Self::Bonus => write!(f, "bonus"),
            Self::Referral => write!(f, "referral"),
        }
    }
}

/// Lifecycle state of a transaction.
///
/// Transitions are **monotonic**: `Pending → Completed` or `Pending → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Can a transaction in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Completed | Self::Failed))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub from_user_id: Option<UserId>,
    pub to_user_id: Option<UserId>,
    pub amount: Amount,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sender's note on a `send`; survives a failure that rewrites `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Set only for `exchange` rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ExchangeDirection>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A freshly accepted transaction in `Pending`.
    #[must_use]
    pub fn pending(
        tx_type: TransactionType,
        from_user_id: Option<UserId>,
        to_user_id: Option<UserId>,
        amount: Amount,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            tx_type,
            from_user_id,
            to_user_id,
            amount,
            status: TransactionStatus::Pending,
            description: None,
            memo: None,
            direction: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Attach the sender's memo. It is also the row's description until
    /// the row fails.
    #[must_use]
    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.description.clone_from(&memo);
        self.memo = memo;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: ExchangeDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// `Pending → Completed`.
    ///
    /// # Errors
    /// `Internal` if the transaction is already terminal.
    pub fn complete(self) -> crate::Result<Self> {
        self.transition(TransactionStatus::Completed)
    }

    /// `Pending → Failed`. The description becomes `reason`; a memo stays in
    /// [`Transaction::memo`].
    ///
    /// # Errors
    /// `Internal` if the transaction is already terminal.
    pub fn fail(self, reason: impl Into<String>) -> crate::Result<Self> {
        let mut tx = self.transition(TransactionStatus::Failed)?;
        tx.description = Some(reason.into());
        Ok(tx)
    }

    fn transition(mut self, target: TransactionStatus) -> crate::Result<Self> {
        if !self.status.can_transition_to(target) {
            return Err(WalletError::Internal(format!(
                "transaction {} cannot move from {} to {target}",
                self.id, self.status
            )));
        }
        self.status = target;
        Ok(self)
    }

    /// The row as it appears in `user`'s history: a send addressed to the
    /// user reads as a `receive`.
    #[must_use]
    pub fn as_seen_by(&self, user: UserId) -> Self {
        let mut view = self.clone();
        if self.tx_type == TransactionType::Send
            && self.to_user_id == Some(user)
            && self.from_user_id != Some(user)
        {
            view.tx_type = TransactionType::Receive;
        }
        view
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}] {} {}", self.tx_type, self.id, self.amount, self.status)
    }
}
