//! Balance store: the single source of truth for wallet balances.
//!
//! Every wallet sits behind its own mutex. A mutation locks the wallet,
//! validates the resulting balances against the locked values and writes
//! them before releasing the lock, so there is no window between the read
//! that feeds a decision and the write it guards. Multi-wallet mutations
//! lock in ascending `UserId` order.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokenwallet_types::{
    Amount, BalanceDelta, DeltaFault, Result, UserId, Wallet, WalletAddress, WalletError,
};

/// Per-user wallets with sendable/non-sendable accounting.
///
/// Exchange and transfer engines are the only callers of the mutating
/// methods; nothing else writes balance fields.
pub struct BalanceStore {
    /// Wallet cells. Cells are never removed, so a cloned `Arc` stays valid.
    wallets: RwLock<HashMap<UserId, Arc<Mutex<Wallet>>>>,
}

impl BalanceStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
        }
    }

    /// Open an empty wallet for `user_id`.
    ///
    /// # Errors
    /// `WalletExists` if the user already has one.
    pub fn open_wallet(&self, user_id: UserId, address: WalletAddress) -> Result<Wallet> {
        let mut wallets = self.wallets.write();
        if wallets.contains_key(&user_id) {
            return Err(WalletError::WalletExists(user_id));
        }
        let wallet = Wallet::new(user_id, address);
        wallets.insert(user_id, Arc::new(Mutex::new(wallet.clone())));
        Ok(wallet)
    }

    /// Snapshot of one wallet.
    ///
    /// # Errors
    /// `WalletNotFound` if the user has no wallet.
    pub fn wallet(&self, user_id: UserId) -> Result<Wallet> {
        Ok(self.cell(user_id)?.lock().clone())
    }

    /// `(sendable, non_sendable)` for one user.
    ///
    /// # Errors
    /// `WalletNotFound` if the user has no wallet.
    pub fn balances(&self, user_id: UserId) -> Result<(Amount, Amount)> {
        let cell = self.cell(user_id)?;
        let wallet = cell.lock();
        Ok((wallet.sendable_balance, wallet.non_sendable_balance))
    }

    /// Whether `user_id` has a wallet.
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.wallets.read().contains_key(&user_id)
    }

    /// Apply a delta to one wallet atomically.
    ///
    /// If either bucket would go below zero (or overflow), nothing changes.
    ///
    /// # Errors
    /// - `WalletNotFound` if the user has no wallet
    /// - `InsufficientBalance` if a bucket would go negative
    /// - `BalanceOverflow` if a bucket would exceed the representable range
    pub fn apply_delta(&self, user_id: UserId, delta: BalanceDelta) -> Result<Wallet> {
        let cell = self.cell(user_id)?;
        let mut wallet = cell.lock();
        let (sendable, non_sendable) = wallet
            .preview(delta)
            .map_err(|fault| fault_error(&wallet, fault))?;
        commit(&mut wallet, sendable, non_sendable);
        Ok(wallet.clone())
    }

    /// Apply deltas to several wallets as one unit.
    ///
    /// Deltas for the same user are merged. Wallets are locked in ascending
    /// `UserId` order, every result is validated while all locks are held,
    /// and only then are all of them written. Either every wallet changes
    /// or none does.
    ///
    /// Returns the post-mutation wallets in ascending `UserId` order.
    ///
    /// # Errors
    /// Same as [`BalanceStore::apply_delta`], for the first failing wallet.
    pub fn apply_deltas(&self, deltas: &[(UserId, BalanceDelta)]) -> Result<Vec<Wallet>> {
        let mut merged: BTreeMap<UserId, BalanceDelta> = BTreeMap::new();
        for (user_id, delta) in deltas {
            let entry = merged.entry(*user_id).or_default();
            *entry = entry.merge(*delta);
        }

        // Resolve every cell before locking any, so a missing wallet fails
        // without holding locks.
        let cells = merged
            .keys()
            .map(|user_id| self.cell(*user_id))
            .collect::<Result<Vec<_>>>()?;

        let mut guards: Vec<_> = cells.iter().map(|cell| cell.lock()).collect();

        let mut staged = Vec::with_capacity(guards.len());
        for (guard, delta) in guards.iter().zip(merged.values()) {
            let next = guard
                .preview(*delta)
                .map_err(|fault| fault_error(guard, fault))?;
            staged.push(next);
        }

        Ok(guards
            .iter_mut()
            .zip(staged)
            .map(|(guard, (sendable, non_sendable))| {
                commit(guard, sendable, non_sendable);
                guard.clone()
            })
            .collect())
    }

    /// Sum of every wallet's total, taken with all wallets locked so no
    /// in-flight transfer is counted twice or not at all.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        let cells: Vec<_> = {
            let wallets = self.wallets.read();
            let mut entries: Vec<_> = wallets.iter().map(|(id, c)| (*id, Arc::clone(c))).collect();
            entries.sort_unstable_by_key(|(id, _)| *id);
            entries.into_iter().map(|(_, cell)| cell).collect()
        };
        let guards: Vec<_> = cells.iter().map(|cell| cell.lock()).collect();
        guards
            .iter()
            .map(|w| u128::from(w.sendable_balance.minor()) + u128::from(w.non_sendable_balance.minor()))
            .sum()
    }

    /// Number of wallets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.wallets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wallets.read().is_empty()
    }

    fn cell(&self, user_id: UserId) -> Result<Arc<Mutex<Wallet>>> {
        self.wallets
            .read()
            .get(&user_id)
            .cloned()
            .ok_or(WalletError::WalletNotFound(user_id))
    }
}

impl Default for BalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn commit(wallet: &mut Wallet, sendable: Amount, non_sendable: Amount) {
    wallet.sendable_balance = sendable;
    wallet.non_sendable_balance = non_sendable;
    wallet.updated_at = Utc::now();
}

fn fault_error(wallet: &Wallet, fault: DeltaFault) -> WalletError {
    match fault {
        DeltaFault::Underflow { bucket, needed } => WalletError::InsufficientBalance {
            bucket,
            needed,
            available: wallet.balance(bucket),
        },
        DeltaFault::Overflow { .. } => WalletError::BalanceOverflow(wallet.user_id),
    }
}
