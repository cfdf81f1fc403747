//! # tokenwallet-types
//!
//! Shared types, errors, and configuration for the **TokenWallet** ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`TransactionId`], [`WalletAddress`]
//! - **Amounts**: [`Amount`] (fixed-point minor units, never floats)
//! - **Balance model**: [`Wallet`], [`Bucket`], [`BalanceDelta`]
//! - **Exchange model**: [`ExchangeDirection`], [`ExchangeRequest`]
//! - **Transaction model**: [`Transaction`], [`TransactionType`], [`TransactionStatus`]
//! - **Directory model**: [`UserProfile`], [`UserSearchResult`], [`RecentRecipient`]
//! - **Configuration**: [`WalletConfig`], [`ServerConfig`], [`ReceivePolicy`]
//! - **Errors**: [`WalletError`] with `WL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod balance;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod exchange;
pub mod ids;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use tokenwallet_types::{Amount, Wallet, Transaction, ...};

pub use amount::*;
pub use balance::*;
pub use config::*;
pub use directory::*;
pub use error::*;
pub use exchange::*;
pub use ids::*;
pub use transaction::*;

// Constants are accessed via `tokenwallet_types::constants::FOO`
// (not re-exported to avoid name collisions).
