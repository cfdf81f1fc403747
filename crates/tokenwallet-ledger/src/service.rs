//! Wallet service: the per-request entry point used by the API layer.
//!
//! Wires the store, ledger, resolver and engines together and adds the
//! cross-cutting pieces: idempotency keys on mutating calls, reward
//! issuance, and supply verification. Every call takes an explicit
//! [`RequestContext`] naming the authenticated principal; there is no
//! ambient "current user".

use std::sync::Arc;

use parking_lot::Mutex;
use tokenwallet_types::{
    Amount, BalanceDelta, Bucket, ExchangeDirection, ExchangeRequest, RecentRecipient, Result,
    Transaction, TransactionType, UserId, UserProfile, UserSearchResult, WalletAddress,
    WalletConfig, WalletError, WalletView, constants,
};
use tracing::{error, info};

use crate::balance_store::BalanceStore;
use crate::directory::UserDirectory;
use crate::exchange::ExchangeEngine;
use crate::idempotency::{Claim, IdempotencyGuard};
use crate::ledger::TransactionLedger;
use crate::resolver::RecipientResolver;
use crate::supply_conservation::SupplyConservation;
use crate::transfer::TransferEngine;

/// Who is calling, and the optional idempotency key of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: UserId,
    pub idempotency_key: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(principal: UserId) -> Self {
        Self {
            principal,
            idempotency_key: None,
        }
    }

    /// Attach an idempotency key. Blank keys are ignored.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = key.trim();
        self.idempotency_key = (!key.is_empty()).then(|| key.to_string());
        self
    }
}

/// The wallet ledger behind one API server.
pub struct WalletService {
    config: WalletConfig,
    directory: Arc<UserDirectory>,
    store: Arc<BalanceStore>,
    ledger: Arc<TransactionLedger>,
    resolver: Arc<RecipientResolver>,
    exchange: ExchangeEngine,
    transfer: TransferEngine,
    idempotency: Mutex<IdempotencyGuard>,
    /// Held while issuing rewards and while verifying supply.
    supply: Mutex<SupplyConservation>,
}

impl WalletService {
    /// Build an empty service.
    ///
    /// # Errors
    /// `Configuration` if `config` is invalid.
    pub fn new(config: WalletConfig) -> Result<Self> {
        config.validate()?;
        let directory = Arc::new(UserDirectory::new());
        let store = Arc::new(BalanceStore::new());
        let ledger = Arc::new(TransactionLedger::new());
        let resolver = Arc::new(RecipientResolver::new(Arc::clone(&directory), config.clone()));
        let exchange = ExchangeEngine::new(Arc::clone(&store), Arc::clone(&ledger));
        let transfer = TransferEngine::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&resolver),
            config.receive_policy,
        );
        Ok(Self {
            idempotency: Mutex::new(IdempotencyGuard::new(config.idempotency_cache_size)),
            supply: Mutex::new(SupplyConservation::new()),
            config,
            directory,
            store,
            ledger,
            resolver,
            exchange,
            transfer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    // =================================================================
    // Users
    // =================================================================

    /// Register a user and open their (empty) wallet.
    ///
    /// # Errors
    /// `InvalidRequest` or `EmailInUse` from the directory.
    pub fn register_user(&self, email: &str, first_name: &str, last_name: &str) -> Result<UserProfile> {
        self.register_user_with_id(UserId::new(), email, first_name, last_name)
    }

    /// Register a user under an id issued by the external identity service.
    ///
    /// # Errors
    /// `InvalidRequest`, `WalletExists` or `EmailInUse` from the directory.
    pub fn register_user_with_id(
        &self,
        id: UserId,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserProfile> {
        let profile = UserProfile::new(
            id,
            email,
            first_name,
            last_name,
            WalletAddress::derive(id, &self.config.address_prefix),
        );
        self.directory.register(profile.clone())?;
        if let Err(err) = self.store.open_wallet(id, profile.wallet_address.clone()) {
            self.directory.remove(id);
            return Err(err);
        }
        info!(user = %id, address = %profile.wallet_address, "user registered");
        Ok(profile)
    }

    /// # Errors
    /// `UserNotFound` if no such user is registered.
    pub fn profile(&self, user: UserId) -> Result<UserProfile> {
        self.directory.get(user).ok_or(WalletError::UserNotFound(user))
    }

    /// The caller's wallet, including the derived total.
    ///
    /// # Errors
    /// `WalletNotFound` if the caller has no wallet.
    pub fn balance(&self, ctx: &RequestContext) -> Result<WalletView> {
        Ok(WalletView::from(&self.store.wallet(ctx.principal)?))
    }

    // =================================================================
    // Recipient lookup
    // =================================================================

    #[must_use]
    pub fn search_users(&self, ctx: &RequestContext, query: &str, limit: Option<usize>) -> Vec<UserSearchResult> {
        self.resolver.search(ctx.principal, query, limit)
    }

    /// # Errors
    /// `RecipientNotFound` if no wallet has this address.
    pub fn validate_address(&self, _ctx: &RequestContext, address: &str) -> Result<UserSearchResult> {
        self.resolver.validate_address(address)
    }

    // =================================================================
    // Mutations
    // =================================================================

    /// Send tokens from the caller to an email or wallet address.
    ///
    /// # Errors
    /// See [`TransferEngine::transfer`]; additionally `DuplicateSubmission`
    /// or `InvalidRequest` for idempotency key misuse.
    pub fn send(
        &self,
        ctx: &RequestContext,
        recipient_ref: &str,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<Transaction> {
        let reference = recipient_ref.trim().to_lowercase();
        let amount_text = amount.to_string();
        let fingerprint = [
            "send",
            reference.as_str(),
            amount_text.as_str(),
            memo.unwrap_or_default().trim(),
        ];
        self.idempotent(ctx, &fingerprint, || {
            self.transfer
                .transfer(ctx.principal, recipient_ref, amount, memo)
                .map(|receipt| receipt.transaction)
        })
    }

    /// Resolve a send target for the caller without moving funds.
    ///
    /// # Errors
    /// `RecipientNotFound` or `SelfTransfer`.
    pub fn resolve_recipient(&self, ctx: &RequestContext, recipient_ref: &str) -> Result<UserProfile> {
        self.transfer.resolve_recipient(ctx.principal, recipient_ref)
    }

    /// Move tokens between the caller's two buckets.
    ///
    /// # Errors
    /// See [`ExchangeEngine::exchange`]; additionally `DuplicateSubmission`
    /// or `InvalidRequest` for idempotency key misuse.
    pub fn exchange(&self, ctx: &RequestContext, direction: ExchangeDirection, amount: Amount) -> Result<Transaction> {
        let direction_text = direction.to_string();
        let amount_text = amount.to_string();
        let fingerprint = ["exchange", direction_text.as_str(), amount_text.as_str()];
        self.idempotent(ctx, &fingerprint, || {
            self.exchange.exchange(ExchangeRequest {
                user_id: ctx.principal,
                direction,
                amount,
            })
        })
    }

    /// Credit freshly issued tokens (mining, task reward, bonus, referral)
    /// to `user`'s non-sendable bucket.
    ///
    /// # Errors
    /// - `InvalidRequest` if `kind` is not a reward type
    /// - `InvalidAmount` if the amount is zero
    /// - `WalletNotFound` if the user has no wallet
    /// - `BalanceOverflow` if the credit cannot be represented
    pub fn credit_reward(
        &self,
        user: UserId,
        kind: TransactionType,
        amount: Amount,
        description: Option<String>,
    ) -> Result<Transaction> {
        if !kind.is_reward() {
            return Err(WalletError::InvalidRequest {
                reason: format!("{kind} is not a reward type"),
            });
        }
        amount.ensure_positive()?;
        let tx = Transaction::pending(kind, None, Some(user), amount)
            .with_description(description)
            .complete()?;

        let mut supply = self.supply.lock();
        self.store
            .apply_delta(user, BalanceDelta::credit(Bucket::NonSendable, amount))?;
        supply.record_issuance(kind, amount)?;
        drop(supply);

        self.ledger.record(tx.clone())?;
        info!(user = %user, %kind, %amount, tx = %tx.id, "reward credited");
        Ok(tx)
    }

    /// Check that the sum of all wallets equals everything ever issued.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if the totals disagree.
    pub fn verify_supply(&self) -> Result<()> {
        let supply = self.supply.lock();
        let actual = self.store.total_supply();
        supply.verify(actual).inspect_err(|err| {
            error!(error = %err, "supply invariant violated");
        })
    }

    // =================================================================
    // History
    // =================================================================

    /// The caller's recent recipients, most recent first.
    #[must_use]
    pub fn recent_recipients(&self, ctx: &RequestContext, limit: Option<usize>) -> Vec<RecentRecipient> {
        self.ledger
            .recent_recipients(ctx.principal, history_limit(limit))
            .into_iter()
            .filter_map(|activity| {
                let profile = self.directory.get(activity.recipient)?;
                Some(RecentRecipient::new(&profile, activity.last_date, activity.last_amount))
            })
            .collect()
    }

    /// The caller's transactions, most recent first.
    #[must_use]
    pub fn history(&self, ctx: &RequestContext, limit: Option<usize>) -> Vec<Transaction> {
        self.ledger.history(ctx.principal, history_limit(limit))
    }

    /// Run a mutation under the context's idempotency key, if any.
    fn idempotent(
        &self,
        ctx: &RequestContext,
        fingerprint: &[&str],
        op: impl FnOnce() -> Result<Transaction>,
    ) -> Result<Transaction> {
        let Some(key) = ctx.idempotency_key.as_deref() else {
            return op();
        };
        let fingerprint = IdempotencyGuard::fingerprint(fingerprint);
        let claim = self.idempotency.lock().begin(ctx.principal, key, &fingerprint)?;
        if let Claim::Replay(tx) = claim {
            info!(user = %ctx.principal, key, tx = %tx.id, "idempotent replay");
            return Ok(tx);
        }

        let result = op();
        let mut guard = self.idempotency.lock();
        match &result {
            Ok(tx) => guard.finish(ctx.principal, key, tx),
            Err(_) => guard.abandon(ctx.principal, key),
        }
        result
    }
}

/// Clamp a caller-supplied history or recent-recipient limit.
fn history_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(constants::DEFAULT_HISTORY_LIMIT)
        .clamp(1, constants::MAX_HISTORY_LIMIT)
}
