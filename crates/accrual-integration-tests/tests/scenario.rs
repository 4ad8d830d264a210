//! Integration test: the reference accrual scenario.
//!
//! 1. A single participant receives weight 10 at block 100
//! 2. The source delivers 1 unit per block
//! 3. At block 110 the participant's pending reward is 10 units
//! 4. Claiming pays exactly that and leaves nothing pending

use accrual_integration_tests::{as_participant, as_source, drip_engine, participant};
use accrual_types::events::AccrualEvent;
use accrual_types::Amount;
use accrual_vault::TokenLedger;

#[test]
fn test_single_participant_scenario() {
    let mut engine = drip_engine(1, 1_000, 100).expect("engine");
    let alice = participant("alice");

    engine
        .set_weight(&as_source(100), &alice, Amount::from(10u64))
        .expect("set weight");

    assert_eq!(
        engine.pending_reward(&alice, 110).expect("pending"),
        Amount::from(10u64)
    );

    let paid = engine.claim(&as_participant(alice, 110)).expect("claim");
    assert_eq!(paid, Amount::from(10u64));
    assert_eq!(engine.ledger().balance_of(&alice), Amount::from(10u64));
    assert!(engine.pending_reward(&alice, 110).expect("pending").is_zero());
    assert!(engine.vault_balance().is_zero());
}

#[test]
fn test_scenario_notifications() {
    let mut engine = drip_engine(1, 1_000, 100).expect("engine");
    let alice = participant("alice");

    engine
        .set_weight(&as_source(100), &alice, Amount::from(10u64))
        .expect("set weight");
    engine.claim(&as_participant(alice, 110)).expect("claim");

    let events = engine.drain_events();
    assert!(matches!(events[0], AccrualEvent::WeightSet { block: 100, .. }));
    match &events[1] {
        AccrualEvent::PoolUpdated {
            block, delivered, ..
        } => {
            assert_eq!(*block, 110);
            assert_eq!(*delivered, Amount::from(10u64));
        }
        other => unreachable!("expected pool update, got {other:?}"),
    }
    assert!(matches!(
        events[2],
        AccrualEvent::RewardsPaid { block: 110, .. }
    ));
    assert_eq!(events.len(), 3);
}

#[test]
fn test_second_claim_same_block_pays_nothing() {
    let mut engine = drip_engine(1, 1_000, 100).expect("engine");
    let alice = participant("alice");

    engine
        .set_weight(&as_source(100), &alice, Amount::from(10u64))
        .expect("set weight");
    engine.claim(&as_participant(alice, 110)).expect("first claim");
    let again = engine.claim(&as_participant(alice, 110)).expect("second claim");
    assert!(again.is_zero());
}

#[test]
fn test_late_joiner_does_not_share_past_rewards() {
    let mut engine = drip_engine(10, 10_000, 0).expect("engine");
    let alice = participant("alice");
    let bob = participant("bob");

    engine
        .set_weight(&as_source(0), &alice, Amount::from(1u64))
        .expect("alice");
    engine
        .set_weight(&as_source(10), &bob, Amount::from(1u64))
        .expect("bob");

    // Blocks 0..10 belong to alice alone, 10..20 are split evenly.
    let a = engine.claim(&as_participant(alice, 20)).expect("alice claim");
    let b = engine.claim(&as_participant(bob, 20)).expect("bob claim");
    assert_eq!(a, Amount::from(150u64));
    assert_eq!(b, Amount::from(50u64));
}
