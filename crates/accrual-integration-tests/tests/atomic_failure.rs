//! Integration test: failed operations leave no trace.
//!
//! A fault anywhere in an operation (arithmetic overflow, a rejected payout)
//! must leave the accumulator, total weight, every baseline, the ledger and
//! the reward source exactly as they were, and emit no notifications.

use accrual_engine::{AccrualError, ArithmeticFault, RewardSource};
use accrual_integration_tests::{
    as_participant, as_source, drip_engine, participant, source_account, DripEngine,
};
use accrual_types::{AccountId, Amount};
use accrual_vault::TokenLedger;

struct Before {
    snapshot: accrual_engine::EngineSnapshot,
    balances: Vec<(AccountId, Amount)>,
    source: accrual_engine::FixedRateDripper,
}

fn capture(engine: &DripEngine) -> Before {
    Before {
        snapshot: engine.snapshot(),
        balances: engine
            .ledger()
            .balances()
            .map(|(a, b)| (*a, *b))
            .collect(),
        source: engine.source().clone(),
    }
}

fn assert_unchanged(engine: &mut DripEngine, before: &Before) {
    assert_eq!(engine.snapshot(), before.snapshot);
    let balances: Vec<(AccountId, Amount)> = engine
        .ledger()
        .balances()
        .map(|(a, b)| (*a, *b))
        .collect();
    assert_eq!(balances, before.balances);
    assert_eq!(engine.source(), &before.source);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_weight_overflow_rolls_back() {
    let mut engine = drip_engine(5, 1_000, 0).expect("engine");
    let alice = participant("alice");
    let bob = participant("bob");
    engine
        .set_weight(&as_source(0), &alice, Amount::from(10u64))
        .expect("alice");
    engine.drain_events();
    let before = capture(&engine);

    // Pool update would drip at block 10, then the total overflows.
    let err = engine
        .set_weight(&as_source(10), &bob, Amount::MAX)
        .expect_err("total weight overflows");
    assert_eq!(err, AccrualError::Arithmetic(ArithmeticFault::AddOverflow));
    assert_unchanged(&mut engine, &before);
}

#[test]
fn test_baseline_overflow_rolls_back() {
    let mut engine = drip_engine(5, 1_000, 0).expect("engine");
    let alice = participant("alice");
    let bob = participant("bob");
    engine
        .set_weight(&as_source(0), &alice, Amount::one())
        .expect("alice");
    engine
        .update_pool(&as_participant(alice, 10))
        .expect("accrue");
    engine.drain_events();
    let before = capture(&engine);

    // weight * acc exceeds 256 bits when bob's baseline is computed.
    let huge = Amount::from(2u64).pow(Amount::from(230u64));
    let err = engine
        .set_weight(&as_source(10), &bob, huge)
        .expect_err("baseline overflows");
    assert_eq!(err, AccrualError::Arithmetic(ArithmeticFault::MulOverflow));
    assert_unchanged(&mut engine, &before);
}

#[test]
fn test_rejected_payout_rolls_back_drip() {
    let mut engine = drip_engine(5, 1_000, 0).expect("engine");
    let alice = participant("alice");
    engine
        .set_weight(&as_source(0), &alice, Amount::from(10u64))
        .expect("alice");
    engine.drain_events();
    engine.ledger_mut().freeze(&alice);
    let before = capture(&engine);

    let err = engine
        .claim(&as_participant(alice, 10))
        .expect_err("frozen recipient");
    assert!(matches!(err, AccrualError::TransferFailed(_)));
    assert_unchanged(&mut engine, &before);
    assert_eq!(
        engine.ledger().balance_of(&source_account()),
        Amount::from(1_000u64)
    );

    // Once the account thaws the same claim goes through in full.
    engine.ledger_mut().unfreeze(&alice);
    let paid = engine.claim(&as_participant(alice, 10)).expect("claim");
    assert_eq!(paid, Amount::from(50u64));
    assert_eq!(engine.source().advertised_rate_per_block(), Amount::from(5u64));
}

#[test]
fn test_unauthorized_changes_nothing() {
    let mut engine = drip_engine(5, 1_000, 0).expect("engine");
    let mallory = participant("mallory");
    let before = capture(&engine);

    let err = engine
        .set_weight(&as_participant(mallory, 10), &mallory, Amount::from(1u64))
        .expect_err("not a weight source");
    assert!(matches!(err, AccrualError::Unauthorized { .. }));

    let err = engine
        .grant_weight_source(&as_participant(mallory, 10), &mallory)
        .expect_err("not the admin");
    assert!(matches!(err, AccrualError::Unauthorized { .. }));

    assert_unchanged(&mut engine, &before);
}
