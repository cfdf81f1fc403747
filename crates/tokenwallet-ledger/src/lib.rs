//! # tokenwallet-ledger
//!
//! The wallet ledger core: every balance mutation in the system goes
//! through this crate.
//!
//! ## Architecture
//!
//! 1. **BalanceStore**: per-user sendable/non-sendable balances; the only
//!    writer of balance fields, via all-or-nothing `apply_delta(s)`
//! 2. **ExchangeEngine**: atomic move between one user's two buckets
//! 3. **TransferEngine**: resolve → validate → apply (debit + credit as one
//!    unit) → record
//! 4. **RecipientResolver**: search / address validation over the
//!    [`UserDirectory`]
//! 5. **TransactionLedger**: append-only record, history and recent recipients
//! 6. **IdempotencyGuard** / **SupplyConservation**: duplicate-submission
//!    protection and the total-supply invariant
//!
//! ## Request Flow
//!
//! ```text
//! API → WalletService(RequestContext)
//!     → RecipientResolver.resolve() → TransferEngine.transfer()
//!         → BalanceStore.apply_deltas() → TransactionLedger.record()
//! ```
//!
//! Wallet locks are always taken in ascending `UserId` order.

pub mod balance_store;
pub mod directory;
pub mod exchange;
pub mod idempotency;
pub mod ledger;
pub mod resolver;
pub mod service;
pub mod supply_conservation;
pub mod transfer;

pub use balance_store::BalanceStore;
pub use directory::UserDirectory;
pub use exchange::ExchangeEngine;
pub use idempotency::IdempotencyGuard;
pub use ledger::TransactionLedger;
pub use resolver::RecipientResolver;
pub use service::{RequestContext, WalletService};
pub use supply_conservation::SupplyConservation;
pub use transfer::TransferEngine;
