//! Balance tracking types for the dual-bucket wallet model.
//!
//! Every user has a `sendable` balance (eligible for outbound transfer)
//! and a `non_sendable` balance (mined or received funds that must be
//! exchanged before they can be sent).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, UserId, WalletAddress};

/// One of the two balance buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Sendable,
    NonSendable,
}

impl Bucket {
    /// The other bucket.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Sendable => Self::NonSendable,
            Self::NonSendable => Self::Sendable,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sendable => write!(f, "sendable"),
            Self::NonSendable => write!(f, "non-sendable"),
        }
    }
}

/// A signed change to both buckets of one wallet, in minor units.
///
/// `i128` comfortably holds the full `u64` amount range in either sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub sendable: i128,
    pub non_sendable: i128,
}

impl BalanceDelta {
    #[must_use]
    pub fn new(sendable: i128, non_sendable: i128) -> Self {
        Self {
            sendable,
            non_sendable,
        }
    }

    /// Add `amount` to `bucket`.
    #[must_use]
    pub fn credit(bucket: Bucket, amount: Amount) -> Self {
        Self::default().with(bucket, i128::from(amount.minor()))
    }

    /// Remove `amount` from `bucket`.
    #[must_use]
    pub fn debit(bucket: Bucket, amount: Amount) -> Self {
        Self::default().with(bucket, -i128::from(amount.minor()))
    }

    /// Move `amount` from `from` into the other bucket.
    #[must_use]
    pub fn shift(from: Bucket, amount: Amount) -> Self {
        Self::debit(from, amount).with(from.opposite(), i128::from(amount.minor()))
    }

    #[must_use]
    pub fn with(mut self, bucket: Bucket, minor: i128) -> Self {
        match bucket {
            Bucket::Sendable => self.sendable += minor,
            Bucket::NonSendable => self.non_sendable += minor,
        }
        self
    }

    /// Sum of two deltas (used when one request touches a wallet twice).
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            sendable: self.sendable + other.sendable,
            non_sendable: self.non_sendable + other.non_sendable,
        }
    }

    /// Net change to the wallet total.
    #[must_use]
    pub fn net(&self) -> i128 {
        self.sendable + self.non_sendable
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.sendable == 0 && self.non_sendable == 0
    }
}

/// Snapshot of one user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: UserId,
    pub sendable_balance: Amount,
    pub non_sendable_balance: Amount,
    pub current_address: WalletAddress,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh, empty wallet.
    #[must_use]
    pub fn new(user_id: UserId, current_address: WalletAddress) -> Self {
        Self {
            user_id,
            sendable_balance: Amount::ZERO,
            non_sendable_balance: Amount::ZERO,
            current_address,
            updated_at: Utc::now(),
        }
    }

    /// Balance held in `bucket`.
    #[must_use]
    pub fn balance(&self, bucket: Bucket) -> Amount {
        match bucket {
            Bucket::Sendable => self.sendable_balance,
            Bucket::NonSendable => self.non_sendable_balance,
        }
    }

    /// Total balance (sendable + non-sendable), the only value ever shown
    /// as "total". Saturates rather than wrapping.
    #[must_use]
    pub fn total_balance(&self) -> Amount {
        self.sendable_balance
            .checked_add(self.non_sendable_balance)
            .unwrap_or(Amount::from_minor(u64::MAX))
    }

    /// Compute the balances after applying `delta`, without mutating.
    ///
    /// Returns the new `(sendable, non_sendable)` pair, or a [`DeltaFault`]
    /// for the first bucket that would go negative or overflow.
    pub fn preview(&self, delta: BalanceDelta) -> std::result::Result<(Amount, Amount), DeltaFault> {
        let sendable = apply(self.sendable_balance, delta.sendable, Bucket::Sendable)?;
        let non_sendable = apply(self.non_sendable_balance, delta.non_sendable, Bucket::NonSendable)?;
        Ok((sendable, non_sendable))
    }
}

/// Why a delta could not be applied to a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaFault {
    /// The bucket would go below zero.
    Underflow { bucket: Bucket, needed: Amount },
    /// The bucket would exceed the representable range.
    Overflow { bucket: Bucket },
}

fn apply(current: Amount, delta: i128, bucket: Bucket) -> std::result::Result<Amount, DeltaFault> {
    let next = i128::from(current.minor()) + delta;
    if next < 0 {
        let needed = u64::try_from(-delta).map_or(Amount::from_minor(u64::MAX), Amount::from_minor);
        return Err(DeltaFault::Underflow { bucket, needed });
    }
    u64::try_from(next)
        .map(Amount::from_minor)
        .map_err(|_| DeltaFault::Overflow { bucket })
}

/// Serialized view of a wallet, including the derived total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub user_id: UserId,
    pub sendable_balance: Amount,
    pub non_sendable_balance: Amount,
    pub total_balance: Amount,
    pub current_address: WalletAddress,
    pub updated_at: DateTime<Utc>,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id,
            sendable_balance: wallet.sendable_balance,
            non_sendable_balance: wallet.non_sendable_balance,
            total_balance: wallet.total_balance(),
            current_address: wallet.current_address.clone(),
            updated_at: wallet.updated_at,
        }
    }
}
