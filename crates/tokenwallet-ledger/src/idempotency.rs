//! Submission idempotency guard. Prevents a retried request from moving
//! funds twice.
//!
//! A client may attach an idempotency key to any mutating request. The
//! first request with a key claims it; a retry with the same key either
//! waits out the original (`DuplicateSubmission` while it is in flight) or
//! gets the original transaction back without touching balances again.
//!
//! Each key is bound to a fingerprint of the request it was first used
//! with, so reusing a key for a different request is rejected.
//!
//! The guard keeps a bounded FIFO cache so memory usage stays predictable in
//! long-running nodes. Only completed keys are evicted; an in-flight key is
//! held until its request finishes or is abandoned.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};
use tokenwallet_types::{Result, Transaction, UserId, WalletError};

type Key = (UserId, String);

#[derive(Debug, Clone)]
enum Slot {
    InFlight,
    Done(Transaction),
}

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: String,
    slot: Slot,
}

/// Outcome of claiming an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// First use of the key: run the request, then `finish` or `abandon`.
    Fresh,
    /// The key already completed: return this transaction unchanged.
    Replay(Transaction),
}

/// Tracks idempotency keys per user.
pub struct IdempotencyGuard {
    entries: HashMap<Key, Entry>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<Key>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// Create a new guard with the given maximum cache size.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "IdempotencyGuard max_size must be > 0");
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Hex SHA-256 over the request's identifying parts.
    #[must_use]
    pub fn fingerprint(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Claim `key` for `user`.
    ///
    /// # Errors
    /// - `InvalidRequest` if the key was used for a different request
    /// - `DuplicateSubmission` if the original request is still running, or
    ///   if the cache is full of in-flight keys
    pub fn begin(&mut self, user: UserId, key: &str, fingerprint: &str) -> Result<Claim> {
        let map_key = (user, key.to_string());
        if let Some(entry) = self.entries.get(&map_key) {
            if entry.fingerprint != fingerprint {
                return Err(WalletError::InvalidRequest {
                    reason: "idempotency key was already used for a different request".into(),
                });
            }
            return match &entry.slot {
                Slot::InFlight => Err(WalletError::DuplicateSubmission {
                    key: key.to_string(),
                }),
                Slot::Done(tx) => Ok(Claim::Replay(tx.clone())),
            };
        }

        if self.entries.len() >= self.max_size && !self.evict_oldest_done() {
            return Err(WalletError::DuplicateSubmission {
                key: key.to_string(),
            });
        }
        self.entries.insert(
            map_key.clone(),
            Entry {
                fingerprint: fingerprint.to_string(),
                slot: Slot::InFlight,
            },
        );
        self.order.push_back(map_key);
        Ok(Claim::Fresh)
    }

    /// Mark a claimed key as completed with its resulting transaction.
    pub fn finish(&mut self, user: UserId, key: &str, tx: &Transaction) {
        if let Some(entry) = self.entries.get_mut(&(user, key.to_string())) {
            entry.slot = Slot::Done(tx.clone());
        }
    }

    /// Release a claimed key after a failure so the client can retry.
    pub fn abandon(&mut self, user: UserId, key: &str) {
        let map_key = (user, key.to_string());
        if matches!(self.entries.get(&map_key), Some(Entry { slot: Slot::InFlight, .. })) {
            self.entries.remove(&map_key);
            self.order.retain(|k| k != &map_key);
        }
    }

    /// Drop the oldest completed key. Returns `false` if every tracked key
    /// is still in flight.
    fn evict_oldest_done(&mut self) -> bool {
        let position = self.order.iter().position(|k| {
            matches!(self.entries.get(k), Some(Entry { slot: Slot::Done(_), .. }))
        });
        let Some(oldest) = position.and_then(|i| self.order.remove(i)) else {
            return false;
        };
        self.entries.remove(&oldest);
        true
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenwallet_types::{Amount, TransactionType};

    fn done_tx(user: UserId) -> Transaction {
        Transaction::pending(TransactionType::Send, Some(user), Some(UserId::new()), Amount::tokens(1))
            .complete()
            .unwrap()
    }

    #[test]
    fn first_claim_is_fresh() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        assert_eq!(guard.begin(user, "k1", "fp").unwrap(), Claim::Fresh);
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn in_flight_duplicate_blocked() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        guard.begin(user, "k1", "fp").unwrap();
        let err = guard.begin(user, "k1", "fp").unwrap_err();
        assert!(
            matches!(err, WalletError::DuplicateSubmission { ref key } if key == "k1"),
            "Expected DuplicateSubmission, got: {err:?}"
        );
    }

    #[test]
    fn completed_key_replays() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        let tx = done_tx(user);
        guard.begin(user, "k1", "fp").unwrap();
        guard.finish(user, "k1", &tx);
        assert_eq!(guard.begin(user, "k1", "fp").unwrap(), Claim::Replay(tx));
    }

    #[test]
    fn fingerprint_mismatch_rejected() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        guard.begin(user, "k1", "fp-a").unwrap();
        assert!(matches!(
            guard.begin(user, "k1", "fp-b"),
            Err(WalletError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn abandon_releases_key() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        guard.begin(user, "k1", "fp").unwrap();
        guard.abandon(user, "k1");
        assert!(guard.is_empty());
        assert_eq!(guard.begin(user, "k1", "fp").unwrap(), Claim::Fresh);
    }

    #[test]
    fn abandon_keeps_completed_key() {
        let mut guard = IdempotencyGuard::new(100);
        let user = UserId::new();
        guard.begin(user, "k1", "fp").unwrap();
        guard.finish(user, "k1", &done_tx(user));
        guard.abandon(user, "k1");
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn keys_are_per_user() {
        let mut guard = IdempotencyGuard::new(100);
        guard.begin(UserId::new(), "k1", "fp").unwrap();
        assert_eq!(guard.begin(UserId::new(), "k1", "fp").unwrap(), Claim::Fresh);
    }

    #[test]
    fn evicts_oldest_completed() {
        let mut guard = IdempotencyGuard::new(2);
        let user = UserId::new();
        for key in ["a", "b"] {
            guard.begin(user, key, "fp").unwrap();
            guard.finish(user, key, &done_tx(user));
        }
        guard.begin(user, "c", "fp").unwrap();
        assert_eq!(guard.len(), 2);
        // "a" was evicted, so it can be claimed again.
        assert_eq!(guard.begin(user, "a", "fp").unwrap(), Claim::Fresh);
    }

    #[test]
    fn eviction_skips_in_flight_keys() {
        let mut guard = IdempotencyGuard::new(2);
        let (user, other) = (UserId::new(), UserId::new());
        guard.begin(user, "pay", "fp").unwrap();
        guard.begin(other, "done", "fp").unwrap();
        guard.finish(other, "done", &done_tx(other));

        // Evicts "done", not the older in-flight "pay".
        assert_eq!(guard.begin(other, "next", "fp").unwrap(), Claim::Fresh);
        assert!(matches!(
            guard.begin(user, "pay", "fp"),
            Err(WalletError::DuplicateSubmission { ref key }) if key == "pay"
        ));
    }

    #[test]
    fn full_of_in_flight_keys_rejects_new_claim() {
        let mut guard = IdempotencyGuard::new(1);
        let (user, other) = (UserId::new(), UserId::new());
        guard.begin(user, "pay", "fp").unwrap();
        assert!(matches!(
            guard.begin(other, "other", "fp"),
            Err(WalletError::DuplicateSubmission { .. })
        ));
        // The original key is still held.
        assert!(matches!(
            guard.begin(user, "pay", "fp"),
            Err(WalletError::DuplicateSubmission { .. })
        ));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn fingerprint_is_stable_and_unambiguous() {
        let a = IdempotencyGuard::fingerprint(&["send", "x@y.io", "1.0000"]);
        assert_eq!(a, IdempotencyGuard::fingerprint(&["send", "x@y.io", "1.0000"]));
        assert_eq!(a.len(), 64);
        assert_ne!(
            IdempotencyGuard::fingerprint(&["ab", "c"]),
            IdempotencyGuard::fingerprint(&["a", "bc"])
        );
    }

    #[test]
    #[should_panic(expected = "max_size must be > 0")]
    fn zero_max_size_panics() {
        let _ = IdempotencyGuard::new(0);
    }
}
