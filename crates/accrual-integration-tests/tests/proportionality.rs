//! Integration test: rewards split in proportion to weight.
//!
//! Two participants with fixed weights `w1`, `w2` over `n` blocks must
//! satisfy `|claim1/w1 - claim2/w2| <= 1` whatever `n` is.

use accrual_integration_tests::{as_participant, as_source, drip_engine, participant};
use accrual_types::Amount;

fn claims_after(w1: u64, w2: u64, rate: u64, blocks: u64) -> (Amount, Amount) {
    let mut engine = drip_engine(rate, u64::MAX, 0).expect("engine");
    let a = participant("a");
    let b = participant("b");

    engine
        .set_weight(&as_source(0), &a, Amount::from(w1))
        .expect("a weight");
    engine
        .set_weight(&as_source(0), &b, Amount::from(w2))
        .expect("b weight");

    let ca = engine.claim(&as_participant(a, blocks)).expect("a claim");
    let cb = engine.claim(&as_participant(b, blocks)).expect("b claim");
    (ca, cb)
}

/// `|c1/w1 - c2/w2| <= 1`, compared without division.
fn within_one_unit_per_weight(c1: Amount, w1: u64, c2: Amount, w2: u64) -> bool {
    let lhs = c1 * Amount::from(w2);
    let rhs = c2 * Amount::from(w1);
    let diff = if lhs > rhs { lhs - rhs } else { rhs - lhs };
    diff <= Amount::from(w1) * Amount::from(w2)
}

#[test]
fn test_exact_split() {
    let (a, b) = claims_after(3, 7, 1_000, 50);
    assert_eq!(a, Amount::from(15_000u64));
    assert_eq!(b, Amount::from(35_000u64));
}

#[test]
fn test_error_independent_of_duration() {
    for blocks in [1u64, 7, 100, 10_000, 1_000_000] {
        let (a, b) = claims_after(3, 4, 1_001, blocks);
        assert!(
            within_one_unit_per_weight(a, 3, b, 4),
            "blocks={blocks}: a={a} b={b}"
        );
        // Nothing is lost beyond flooring.
        let delivered = Amount::from(1_001u64) * Amount::from(blocks);
        assert!(a + b <= delivered);
        assert!(delivered - (a + b) <= Amount::from(2u64));
    }
}

#[test]
fn test_extreme_weight_ratio() {
    let (a, b) = claims_after(1, 1_000_000_000, 7, 1_000);
    assert!(within_one_unit_per_weight(a, 1, b, 1_000_000_000));
}
