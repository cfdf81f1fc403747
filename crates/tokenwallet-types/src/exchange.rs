//! Exchange requests: moving value between a user's two buckets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, Bucket, UserId};

/// Which way an exchange moves funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExchangeDirection {
    /// non-sendable → sendable
    ToSendable,
    /// sendable → non-sendable
    ToNonSendable,
}

impl ExchangeDirection {
    /// The bucket that is debited.
    #[must_use]
    pub fn source(self) -> Bucket {
        match self {
            Self::ToSendable => Bucket::NonSendable,
            Self::ToNonSendable => Bucket::Sendable,
        }
    }

    /// The bucket that is credited.
    #[must_use]
    pub fn target(self) -> Bucket {
        self.source().opposite()
    }
}

impl fmt::Display for ExchangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToSendable => write!(f, "to-sendable"),
            Self::ToNonSendable => write!(f, "to-non-sendable"),
        }
    }
}

/// Ephemeral exchange request; only its resulting transaction is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub user_id: UserId,
    pub direction: ExchangeDirection,
    pub amount: Amount,
}
