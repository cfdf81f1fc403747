//! Transfer engine: sends tokens from one user to another.
//!
//! Each transfer walks a fixed sequence of stages:
//! 1. Resolve the recipient reference (email or address) to a user
//! 2. Validate: no self-transfer, positive amount, memo length, wallets exist
//! 3. Apply: debit sender's sendable and credit the recipient in one
//!    `apply_deltas` call (ascending `UserId` lock order)
//! 4. Record the completed `send` row
//!
//! Rejections in stages 1 and 2 write nothing. A failure in stage 3 is recorded
//! as a failed row and leaves both wallets unchanged.

use std::fmt;
use std::sync::Arc;

use tokenwallet_types::{
    Amount, BalanceDelta, Bucket, ReceivePolicy, Result, Transaction, TransactionType, UserId,
    UserProfile, WalletError, constants::MAX_MEMO_LEN,
};
use tracing::{debug, info, warn};

use crate::balance_store::BalanceStore;
use crate::ledger::TransactionLedger;
use crate::resolver::RecipientResolver;

/// Where a transfer is in its lifecycle. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Resolving,
    Validating,
    Applying,
    Completed,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving => write!(f, "resolving"),
            Self::Validating => write!(f, "validating"),
            Self::Applying => write!(f, "applying"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A completed transfer and the recipient it reached.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction: Transaction,
    pub recipient: UserProfile,
}

/// Atomic user-to-user transfers.
pub struct TransferEngine {
    store: Arc<BalanceStore>,
    ledger: Arc<TransactionLedger>,
    resolver: Arc<RecipientResolver>,
    receive_policy: ReceivePolicy,
}

impl TransferEngine {
    #[must_use]
    pub fn new(
        store: Arc<BalanceStore>,
        ledger: Arc<TransactionLedger>,
        resolver: Arc<RecipientResolver>,
        receive_policy: ReceivePolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            resolver,
            receive_policy,
        }
    }

    /// Send `amount` from `sender` to the user named by `recipient_ref`.
    ///
    /// # Errors
    /// - `RecipientNotFound` if the reference matches no user with a wallet
    /// - `SelfTransfer` if the recipient is the sender
    /// - `InvalidAmount` if the amount is zero
    /// - `InvalidRequest` if the memo is too long
    /// - `WalletNotFound` if the sender has no wallet
    /// - `InsufficientBalance` if the sender's sendable balance is too low
    pub fn transfer(
        &self,
        sender: UserId,
        recipient_ref: &str,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<TransferReceipt> {
        let mut stage = TransferStage::Resolving;
        debug!(%sender, recipient_ref, %stage, "transfer");
        let recipient = self.resolve_recipient(sender, recipient_ref)?;

        stage = TransferStage::Validating;
        debug!(%sender, recipient = %recipient.id, %stage, "transfer");
        amount.ensure_positive()?;
        let memo = normalize_memo(memo)?;
        if !self.store.contains(sender) {
            return Err(WalletError::WalletNotFound(sender));
        }

        stage = TransferStage::Applying;
        debug!(%sender, recipient = %recipient.id, %amount, %stage, "transfer");
        let pending =
            Transaction::pending(TransactionType::Send, Some(sender), Some(recipient.id), amount)
                .with_memo(memo);
        let completed = pending.clone().complete()?;
        let legs = [
            (sender, BalanceDelta::debit(Bucket::Sendable, amount)),
            (recipient.id, BalanceDelta::credit(self.receive_policy.bucket(), amount)),
        ];

        if let Err(err) = self.store.apply_deltas(&legs) {
            warn!(%sender, recipient = %recipient.id, %amount, %stage, error = %err, "transfer failed");
            self.ledger.record(pending.fail(err.user_message())?)?;
            return Err(err);
        }

        self.ledger.record(completed.clone())?;
        stage = TransferStage::Completed;
        info!(
            %sender,
            recipient = %recipient.id,
            %amount,
            tx = %completed.id,
            %stage,
            "transfer completed"
        );
        Ok(TransferReceipt {
            transaction: completed,
            recipient,
        })
    }

    /// The first checks of a transfer: the reference names a user with a
    /// wallet, and that user is not `sender`.
    ///
    /// # Errors
    /// `RecipientNotFound` or `SelfTransfer`.
    pub fn resolve_recipient(&self, sender: UserId, recipient_ref: &str) -> Result<UserProfile> {
        let recipient = self.resolver.resolve(recipient_ref)?;
        if !self.store.contains(recipient.id) {
            return Err(WalletError::RecipientNotFound {
                reference: recipient_ref.trim().to_string(),
            });
        }
        if recipient.id == sender {
            return Err(WalletError::SelfTransfer(sender));
        }
        Ok(recipient)
    }
}

fn normalize_memo(memo: Option<&str>) -> Result<Option<String>> {
    let Some(memo) = memo.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    if memo.chars().count() > MAX_MEMO_LEN {
        return Err(WalletError::InvalidRequest {
            reason: format!("memo must be at most {MAX_MEMO_LEN} characters"),
        });
    }
    Ok(Some(memo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserDirectory;
    use tokenwallet_types::{TransactionStatus, WalletConfig};

    struct Fixture {
        engine: TransferEngine,
        store: Arc<BalanceStore>,
        ledger: Arc<TransactionLedger>,
        alice: UserProfile,
        bob: UserProfile,
    }

    fn fixture(alice_sendable: Amount) -> Fixture {
        let directory = Arc::new(UserDirectory::new());
        let store = Arc::new(BalanceStore::new());
        let ledger = Arc::new(TransactionLedger::new());
        let alice = UserProfile::dummy("Alice", "Archer");
        let bob = UserProfile::dummy("Bob", "Baker");
        for p in [&alice, &bob] {
            directory.register(p.clone()).unwrap();
            store.open_wallet(p.id, p.wallet_address.clone()).unwrap();
        }
        store
            .apply_delta(alice.id, BalanceDelta::credit(Bucket::Sendable, alice_sendable))
            .unwrap();
        let resolver = Arc::new(RecipientResolver::new(directory, WalletConfig::default()));
        let engine = TransferEngine::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            resolver,
            ReceivePolicy::NonSendable,
        );
        Fixture {
            engine,
            store,
            ledger,
            alice,
            bob,
        }
    }

    #[test]
    fn transfer_debits_sendable_credits_non_sendable() {
        let f = fixture(Amount::tokens(10));
        let receipt = f
            .engine
            .transfer(f.alice.id, &f.bob.email, Amount::tokens(4), Some(" lunch "))
            .unwrap();
        let tx = &receipt.transaction;
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.tx_type, TransactionType::Send);
        assert_eq!(tx.description.as_deref(), Some("lunch"));
        assert_eq!(receipt.recipient.id, f.bob.id);
        assert_eq!(f.store.balances(f.alice.id).unwrap(), (Amount::tokens(6), Amount::ZERO));
        assert_eq!(f.store.balances(f.bob.id).unwrap(), (Amount::ZERO, Amount::tokens(4)));
    }

    #[test]
    fn transfer_by_address() {
        let f = fixture(Amount::tokens(1));
        f.engine
            .transfer(f.alice.id, f.bob.wallet_address.as_str(), Amount::tokens(1), None)
            .unwrap();
        assert_eq!(f.store.balances(f.alice.id).unwrap().0, Amount::ZERO);
    }

    #[test]
    fn sendable_receive_policy() {
        let mut f = fixture(Amount::tokens(2));
        f.engine.receive_policy = ReceivePolicy::Sendable;
        f.engine.transfer(f.alice.id, &f.bob.email, Amount::tokens(2), None).unwrap();
        assert_eq!(f.store.balances(f.bob.id).unwrap(), (Amount::tokens(2), Amount::ZERO));
    }

    #[test]
    fn self_transfer_rejected_without_row() {
        let f = fixture(Amount::tokens(10));
        let err = f
            .engine
            .transfer(f.alice.id, &f.alice.email, Amount::tokens(1), None)
            .unwrap_err();
        assert!(matches!(err, WalletError::SelfTransfer(id) if id == f.alice.id));
        assert_eq!(f.store.balances(f.alice.id).unwrap(), (Amount::tokens(10), Amount::ZERO));
        assert!(f.ledger.is_empty());
    }

    #[test]
    fn overdraft_by_one_minor_unit_fails() {
        let f = fixture(Amount::tokens(10));
        let amount = Amount::parse("10.0001").unwrap();
        let err = f.engine.transfer(f.alice.id, &f.bob.email, amount, None).unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { bucket: Bucket::Sendable, .. }));
        assert_eq!(f.store.balances(f.alice.id).unwrap(), (Amount::tokens(10), Amount::ZERO));
        assert_eq!(f.store.balances(f.bob.id).unwrap(), (Amount::ZERO, Amount::ZERO));
        let rows = f.ledger.history(f.alice.id, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TransactionStatus::Failed);
    }

    #[test]
    fn failed_send_records_reason_and_keeps_memo() {
        let f = fixture(Amount::ZERO);
        let err = f
            .engine
            .transfer(f.alice.id, &f.bob.email, Amount::tokens(1), Some("lunch"))
            .unwrap_err();
        let rows = f.ledger.history(f.alice.id, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TransactionStatus::Failed);
        assert_eq!(rows[0].description.as_deref(), Some(err.user_message().as_str()));
        assert!(rows[0].description.as_deref().unwrap().contains("Insufficient sendable balance"));
        assert_eq!(rows[0].memo.as_deref(), Some("lunch"));
    }

    #[test]
    fn unknown_recipient() {
        let f = fixture(Amount::tokens(10));
        assert!(matches!(
            f.engine.transfer(f.alice.id, "ghost@example.com", Amount::tokens(1), None),
            Err(WalletError::RecipientNotFound { .. })
        ));
        assert!(f.ledger.is_empty());
    }

    #[test]
    fn zero_amount_rejected() {
        let f = fixture(Amount::tokens(10));
        assert!(matches!(
            f.engine.transfer(f.alice.id, &f.bob.email, Amount::ZERO, None),
            Err(WalletError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn self_check_precedes_amount_check() {
        let f = fixture(Amount::tokens(10));
        assert!(matches!(
            f.engine.transfer(f.alice.id, &f.alice.email, Amount::ZERO, None),
            Err(WalletError::SelfTransfer(_))
        ));
        assert!(matches!(
            f.engine.transfer(f.alice.id, "ghost@example.com", Amount::ZERO, None),
            Err(WalletError::RecipientNotFound { .. })
        ));
    }

    #[test]
    fn long_memo_rejected() {
        let f = fixture(Amount::tokens(10));
        let memo = "x".repeat(MAX_MEMO_LEN + 1);
        assert!(matches!(
            f.engine.transfer(f.alice.id, &f.bob.email, Amount::tokens(1), Some(&memo)),
            Err(WalletError::InvalidRequest { .. })
        ));
        assert_eq!(f.store.balances(f.alice.id).unwrap().0, Amount::tokens(10));
    }

    #[test]
    fn stage_display() {
        assert_eq!(TransferStage::Applying.to_string(), "applying");
    }
}
