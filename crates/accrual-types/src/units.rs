//! Amounts, block heights, and fixed-point scales.
//!
//! Every token quantity and weight is an unsigned 256-bit integer. The
//! accumulator uses [`RAY`] (10^27) as its fixed-point scale; display-only
//! rates use [`WAD`] (10^18).

pub use primitive_types::U256;

use crate::{Result, TypesError};

/// A token amount or a participant weight, in raw units.
pub type Amount = U256;

/// Block height supplied by the environment's monotonic clock.
pub type BlockHeight = u64;

/// Accumulator scale: 10^27.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Display scale for per-weight rates: 10^18.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// [`RAY`] as an [`Amount`].
pub fn ray() -> Amount {
    Amount::from(RAY)
}

/// [`WAD`] as an [`Amount`].
pub fn wad() -> Amount {
    Amount::from(WAD)
}

/// Parse an amount from a decimal string or a `0x`-prefixed hex string.
pub fn parse_amount(s: &str) -> Result<Amount> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(TypesError::InvalidAmount("empty string".to_string()));
    }
    match trimmed.strip_prefix("0x") {
        Some(hex) => Amount::from_str_radix(hex, 16)
            .map_err(|e| TypesError::InvalidAmount(format!("{s}: {e}"))),
        None => Amount::from_dec_str(trimmed)
            .map_err(|e| TypesError::InvalidAmount(format!("{s}: {e:?}"))),
    }
}
