//! Error types for the TokenWallet ledger.
//!
//! All errors use the `WL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Amount / request validation errors
//! - 2xx: Balance errors
//! - 3xx: Recipient / directory errors
//! - 4xx: Authentication / submission errors
//! - 7xx: Network errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors
//!
//! The `Display` text is operator-facing and goes to logs. Clients only
//! ever see [`WalletError::user_message`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, Bucket, UserId, WalletAddress};

/// Central error enum for all TokenWallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The amount is non-numeric, non-positive, too precise, or too large.
    #[error("WL_ERR_100: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The request is malformed in some way other than its amount.
    #[error("WL_ERR_101: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The source bucket holds less than the requested amount.
    #[error("WL_ERR_200: Insufficient {bucket} balance: need {needed}, have {available}")]
    InsufficientBalance {
        bucket: Bucket,
        needed: Amount,
        available: Amount,
    },

    /// The exchange source bucket is exactly zero.
    #[error("WL_ERR_201: No {bucket} funds available to exchange")]
    NoFundsAvailable { bucket: Bucket },

    /// A credit would overflow the balance representation.
    #[error("WL_ERR_202: Balance overflow for user {0}")]
    BalanceOverflow(UserId),

    /// No wallet exists for this user.
    #[error("WL_ERR_203: Wallet not found for user {0}")]
    WalletNotFound(UserId),

    /// A wallet already exists for this user.
    #[error("WL_ERR_204: Wallet already exists for user {0}")]
    WalletExists(UserId),

    /// Another wallet already uses this address.
    #[error("WL_ERR_205: Address already in use: {0}")]
    AddressInUse(WalletAddress),

    // =================================================================
    // Recipient / Directory Errors (3xx)
    // =================================================================
    /// The recipient reference (email or address) matched no user.
    #[error("WL_ERR_300: Recipient not found: {reference}")]
    RecipientNotFound { reference: String },

    /// Sender and recipient are the same user.
    #[error("WL_ERR_301: Self-transfer rejected for user {0}")]
    SelfTransfer(UserId),

    /// The user is not registered in the directory.
    #[error("WL_ERR_302: User not found: {0}")]
    UserNotFound(UserId),

    /// Another user already registered this email.
    #[error("WL_ERR_303: Email already registered: {0}")]
    EmailInUse(String),

    // =================================================================
    // Authentication / Submission Errors (4xx)
    // =================================================================
    /// Missing or unknown bearer token.
    #[error("WL_ERR_400: Unauthenticated request")]
    Unauthenticated,

    /// A request with the same idempotency key is still being processed.
    #[error("WL_ERR_401: Duplicate submission for idempotency key {key}")]
    DuplicateSubmission { key: String },

    // =================================================================
    // Network Errors (7xx)
    // =================================================================
    /// Listener / transport failure.
    #[error("WL_ERR_700: Network error: {0}")]
    Network(String),

    // =================================================================
    // Invariant Violations (8xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("WL_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("WL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("WL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk).
    #[error("WL_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, WalletError>;

/// The client-facing failure taxonomy every [`WalletError`] collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidAmount,
    InsufficientBalance,
    NoFundsAvailable,
    SelfTransfer,
    RecipientNotFound,
    Unauthenticated,
    NetworkError,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::NoFundsAvailable => "NO_FUNDS_AVAILABLE",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Unexpected => "UNEXPECTED",
        };
        f.write_str(s)
    }
}

impl WalletError {
    /// Which taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } | Self::InvalidRequest { .. } => ErrorKind::InvalidAmount,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::NoFundsAvailable { .. } => ErrorKind::NoFundsAvailable,
            Self::SelfTransfer(_) => ErrorKind::SelfTransfer,
            Self::RecipientNotFound { .. } => ErrorKind::RecipientNotFound,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::BalanceOverflow(_)
            | Self::WalletNotFound(_)
            | Self::WalletExists(_)
            | Self::AddressInUse(_)
            | Self::UserNotFound(_)
            | Self::EmailInUse(_)
            | Self::DuplicateSubmission { .. }
            | Self::SupplyInvariantViolation { .. }
            | Self::Internal(_)
            | Self::Configuration(_)
            | Self::Io(_) => ErrorKind::Unexpected,
        }
    }

    /// Plain-language message safe to show an end user. Never contains
    /// internal identifiers or operator detail.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidAmount { reason } => format!("Please enter a valid amount: {reason}."),
            Self::InvalidRequest { reason } => format!("The request could not be processed: {reason}."),
            Self::InsufficientBalance { bucket, available, .. } => {
                format!("Insufficient {bucket} balance. You have {available} available.")
            }
            Self::NoFundsAvailable { bucket } => format!(
                "You have no {bucket} tokens to exchange. Try exchanging in the other direction."
            ),
            Self::SelfTransfer(_) => "You cannot send tokens to yourself.".to_string(),
            Self::RecipientNotFound { .. } => {
                "No user was found for that email or wallet address.".to_string()
            }
            Self::WalletNotFound(_) | Self::UserNotFound(_) => {
                "Your wallet could not be found.".to_string()
            }
            Self::WalletExists(_) => "A wallet already exists for this account.".to_string(),
            Self::AddressInUse(_) => "That wallet address is already in use.".to_string(),
            Self::EmailInUse(_) => "That email is already registered.".to_string(),
            Self::Unauthenticated => "Please sign in again.".to_string(),
            Self::DuplicateSubmission { .. } => {
                "This request is already being processed. Please wait.".to_string()
            }
            Self::Network(_) => "Network error. Please check your connection.".to_string(),
            Self::BalanceOverflow(_)
            | Self::SupplyInvariantViolation { .. }
            | Self::Internal(_)
            | Self::Configuration(_)
            | Self::Io(_) => "Something went wrong. Please try again later.".to_string(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = WalletError::WalletNotFound(UserId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("WL_ERR_203"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = WalletError::InsufficientBalance {
            bucket: Bucket::Sendable,
            needed: Amount::from_minor(100_001),
            available: Amount::from_minor(100_000),
        };
        let msg = format!("{err}");
        assert!(msg.contains("WL_ERR_200"));
        assert!(msg.contains("10.0001"));
        assert!(msg.contains("10.0000"));
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    }

    #[test]
    fn all_errors_have_wl_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(WalletError::Unauthenticated),
            Box::new(WalletError::SelfTransfer(UserId::new())),
            Box::new(WalletError::NoFundsAvailable { bucket: Bucket::NonSendable }),
            Box::new(WalletError::Internal("test".into())),
            Box::new(WalletError::SupplyInvariantViolation { reason: "x".into() }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("WL_ERR_"), "Error missing WL_ERR_ prefix: {msg}");
        }
    }

    #[test]
    fn user_messages_hide_internal_detail() {
        let user = UserId::new();
        let err = WalletError::Internal(format!("lock poisoned for {user}"));
        let shown = err.user_message();
        assert!(!shown.contains(&user.to_string()));
        assert!(!shown.contains("WL_ERR"));
        assert_eq!(err.kind(), ErrorKind::Unexpected);

        let err = WalletError::SelfTransfer(user);
        assert!(!err.user_message().contains(&user.to_string()));
    }


    #[test]
    fn kind_display_is_screaming_snake() {
        assert_eq!(ErrorKind::NoFundsAvailable.to_string(), "NO_FUNDS_AVAILABLE");
        assert_eq!(ErrorKind::NetworkError.to_string(), "NETWORK_ERROR");
    }
}
