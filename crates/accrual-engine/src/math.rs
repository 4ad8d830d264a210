//! Checked 256-bit fixed-point arithmetic.
//!
//! No floating point anywhere: rounding direction is part of the accounting
//! contract. Division truncates toward zero.

use accrual_types::units::{ray, wad};
use accrual_types::Amount;

use crate::ArithmeticFault;

/// Checked result alias for arithmetic helpers.
pub type Checked<T> = std::result::Result<T, ArithmeticFault>;

/// `a + b`, failing on overflow.
pub fn add(a: Amount, b: Amount) -> Checked<Amount> {
    a.checked_add(b).ok_or(ArithmeticFault::AddOverflow)
}

/// `a - b`, failing if `b > a`.
pub fn sub(a: Amount, b: Amount) -> Checked<Amount> {
    a.checked_sub(b).ok_or(ArithmeticFault::SubUnderflow)
}

/// `a * b`, failing on overflow.
pub fn mul(a: Amount, b: Amount) -> Checked<Amount> {
    a.checked_mul(b).ok_or(ArithmeticFault::MulOverflow)
}

/// `a * b / d`, truncating. The product must fit in 256 bits.
pub fn mul_div(a: Amount, b: Amount, d: Amount) -> Checked<Amount> {
    if d.is_zero() {
        return Err(ArithmeticFault::DivByZero);
    }
    Ok(mul(a, b)? / d)
}

/// Accumulator increment for `delivered` reward spread over `total_weight`:
/// `delivered * RAY / total_weight`.
pub fn per_weight(delivered: Amount, total_weight: Amount) -> Checked<Amount> {
    mul_div(delivered, ray(), total_weight)
}

/// Reward accrued by `weight` at accumulator value `acc`:
/// `weight * acc / RAY`.
pub fn accrued(weight: Amount, acc: Amount) -> Checked<Amount> {
    mul_div(weight, acc, ray())
}

/// Display rate per weight unit at [`WAD`](accrual_types::WAD) scale.
pub fn rate_per_weight(rate: Amount, total_weight: Amount) -> Checked<Amount> {
    mul_div(rate, wad(), total_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(v: u64) -> Amount {
        Amount::from(v)
    }

    #[test]
    fn test_add_overflow() {
        assert_eq!(add(amt(1), amt(2)), Ok(amt(3)));
        assert_eq!(add(Amount::MAX, amt(1)), Err(ArithmeticFault::AddOverflow));
    }

    #[test]
    fn test_sub_underflow() {
        assert_eq!(sub(amt(5), amt(5)), Ok(Amount::zero()));
        assert_eq!(sub(amt(4), amt(5)), Err(ArithmeticFault::SubUnderflow));
    }

    #[test]
    fn test_mul_overflow() {
        assert_eq!(mul(amt(6), amt(7)), Ok(amt(42)));
        assert_eq!(mul(Amount::MAX, amt(2)), Err(ArithmeticFault::MulOverflow));
    }

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(amt(10), amt(1), amt(3)), Ok(amt(3)));
        assert_eq!(mul_div(amt(1), amt(1), Amount::zero()), Err(ArithmeticFault::DivByZero));
    }

    #[test]
    fn test_per_weight_and_accrued_are_inverse_within_dust() {
        // 100 units over weight 3: each weight unit gets 33.33.. units.
        let acc = per_weight(amt(100), amt(3)).expect("per_weight");
        let share = accrued(amt(1), acc).expect("accrued");
        assert_eq!(share, amt(33));
        let whole = accrued(amt(3), acc).expect("accrued");
        assert_eq!(whole, amt(99));
        assert!(amt(100) - whole < amt(3));
    }

    #[test]
    fn test_per_weight_overflow_on_huge_delivery() {
        let huge = Amount::MAX / amt(10);
        assert_eq!(per_weight(huge, amt(1)), Err(ArithmeticFault::MulOverflow));
    }

    #[test]
    fn test_rate_per_weight_scale() {
        // 5 units per block over 10 weight = 0.5 per weight, i.e. 5e17 at WAD.
        let rate = rate_per_weight(amt(5), amt(10)).expect("rate");
        assert_eq!(rate, Amount::exp10(17) * amt(5));
    }
}
