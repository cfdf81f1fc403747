//! # Concurrency Integration Tests
//!
//! Many threads hammer the same wallets through the public service API.
//! Whatever the interleaving, no balance ever goes negative, exactly enough
//! operations succeed to exhaust the funds, and the total supply never
//! changes except through reward issuance.

use std::sync::Barrier;
use std::thread;

use tokenwallet_ledger::{RequestContext, WalletService};
use tokenwallet_types::*;

fn service() -> WalletService {
    WalletService::new(WalletConfig::default()).unwrap()
}

/// Register a user holding `sendable` / `non_sendable` whole tokens.
fn funded(svc: &WalletService, name: &str, sendable: u64, non_sendable: u64) -> UserProfile {
    let profile = svc
        .register_user(&format!("{name}@example.com"), name, "Tester")
        .unwrap();
    let total = sendable + non_sendable;
    if total > 0 {
        svc.credit_reward(profile.id, TransactionType::Mining, Amount::tokens(total), None)
            .unwrap();
    }
    if sendable > 0 {
        svc.exchange(
            &RequestContext::new(profile.id),
            ExchangeDirection::ToSendable,
            Amount::tokens(sendable),
        )
        .unwrap();
    }
    profile
}

fn balances(svc: &WalletService, user: UserId) -> (Amount, Amount) {
    let view = svc.balance(&RequestContext::new(user)).unwrap();
    (view.sendable_balance, view.non_sendable_balance)
}

// =========================================================================
// Exchange races
// =========================================================================

#[test]
fn two_concurrent_full_exchanges_exactly_one_wins() {
    let svc = service();
    let user = funded(&svc, "racer", 0, 100);
    let barrier = Barrier::new(2);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    svc.exchange(
                        &RequestContext::new(user.id),
                        ExchangeDirection::ToSendable,
                        Amount::tokens(100),
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one exchange must succeed: {results:?}");
    let loser = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(
        matches!(loser, WalletError::NoFundsAvailable { bucket: Bucket::NonSendable }),
        "Expected NoFundsAvailable, got: {loser:?}"
    );
    assert_eq!(balances(&svc, user.id), (Amount::tokens(100), Amount::ZERO));
    svc.verify_supply().unwrap();
}

#[test]
fn exchange_storm_never_overdraws() {
    let svc = service();
    let user = funded(&svc, "storm", 0, 25);
    let barrier = Barrier::new(40);

    let wins: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..40)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    svc.exchange(
                        &RequestContext::new(user.id),
                        ExchangeDirection::ToSendable,
                        Amount::tokens(1),
                    )
                    .is_ok()
                })
            })
            .collect();
        handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
    });

    assert_eq!(wins, 25);
    assert_eq!(balances(&svc, user.id), (Amount::tokens(25), Amount::ZERO));
    svc.verify_supply().unwrap();
}

// =========================================================================
// Transfer races
// =========================================================================

#[test]
fn concurrent_sends_exhaust_exactly() {
    let svc = service();
    let sender = funded(&svc, "sender", 10, 0);
    let recipient = funded(&svc, "recipient", 0, 0);
    let barrier = Barrier::new(16);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    svc.send(
                        &RequestContext::new(sender.id),
                        &recipient.email,
                        Amount::tokens(1),
                        None,
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 10);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, WalletError::InsufficientBalance { .. }), "got {err:?}");
    }
    assert_eq!(balances(&svc, sender.id), (Amount::ZERO, Amount::ZERO));
    assert_eq!(balances(&svc, recipient.id), (Amount::ZERO, Amount::tokens(10)));
    svc.verify_supply().unwrap();
}

#[test]
fn opposing_transfers_do_not_deadlock() {
    let svc = service();
    let alice = funded(&svc, "alice", 500, 0);
    let bob = funded(&svc, "bob", 500, 0);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                let _ = svc.send(&RequestContext::new(alice.id), &bob.email, Amount::tokens(1), None);
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                let _ = svc.send(&RequestContext::new(bob.id), &alice.email, Amount::tokens(1), None);
            }
        });
    });

    // Each side sent 200 from its 500 sendable; receipts land non-sendable.
    assert_eq!(balances(&svc, alice.id), (Amount::tokens(300), Amount::tokens(200)));
    assert_eq!(balances(&svc, bob.id), (Amount::tokens(300), Amount::tokens(200)));
    svc.verify_supply().unwrap();
}

#[test]
fn transfer_and_exchange_share_the_wallet_lock() {
    let svc = service();
    let alice = funded(&svc, "alice", 50, 0);
    let bob = funded(&svc, "bob", 0, 0);
    let barrier = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            barrier.wait();
            for _ in 0..50 {
                let _ = svc.send(&RequestContext::new(alice.id), &bob.email, Amount::tokens(1), None);
            }
        });
        s.spawn(|| {
            barrier.wait();
            for _ in 0..50 {
                let _ = svc.exchange(
                    &RequestContext::new(alice.id),
                    ExchangeDirection::ToNonSendable,
                    Amount::tokens(1),
                );
            }
        });
    });

    let (sendable, non_sendable) = balances(&svc, alice.id);
    let (_, bob_received) = balances(&svc, bob.id);
    assert_eq!(sendable, Amount::ZERO);
    assert_eq!(
        non_sendable.checked_add(bob_received).unwrap(),
        Amount::tokens(50)
    );
    svc.verify_supply().unwrap();
}

// =========================================================================
// Idempotency under contention
// =========================================================================

#[test]
fn same_idempotency_key_moves_funds_once() {
    let svc = service();
    let alice = funded(&svc, "alice", 20, 0);
    let bob = funded(&svc, "bob", 0, 0);
    let barrier = Barrier::new(8);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    let ctx = RequestContext::new(alice.id).with_idempotency_key("pay-bob-once");
                    svc.send(&ctx, &bob.email, Amount::tokens(5), None)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results {
        match result {
            Ok(_) | Err(WalletError::DuplicateSubmission { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(balances(&svc, alice.id), (Amount::tokens(15), Amount::ZERO));
    assert_eq!(balances(&svc, bob.id), (Amount::ZERO, Amount::tokens(5)));
}
