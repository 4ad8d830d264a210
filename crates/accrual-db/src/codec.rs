//! Column encodings for identities and 256-bit amounts.

use accrual_types::units::parse_amount;
use accrual_types::{AccountId, Amount, BlockHeight, TokenId};

use crate::{DbError, Result};

/// Amounts are stored as decimal TEXT so that they sort-compare sanely in
/// ad-hoc queries and never lose precision.
pub fn encode_amount(amount: &Amount) -> String {
    amount.to_string()
}

pub fn decode_amount(text: &str) -> Result<Amount> {
    parse_amount(text).map_err(|e| DbError::Serialization(e.to_string()))
}

fn to_array(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| DbError::Serialization(format!("expected 32-byte id, got {}", bytes.len())))
}

pub fn decode_account(bytes: &[u8]) -> Result<AccountId> {
    Ok(AccountId::from_bytes(to_array(bytes)?))
}

pub fn decode_token(bytes: &[u8]) -> Result<TokenId> {
    Ok(TokenId::from_bytes(to_array(bytes)?))
}

/// SQLite integers are signed 64-bit.
pub fn encode_block(block: BlockHeight) -> Result<i64> {
    i64::try_from(block).map_err(|_| DbError::Serialization(format!("block {block} exceeds i64")))
}

pub fn decode_block(value: i64) -> Result<BlockHeight> {
    u64::try_from(value).map_err(|_| DbError::Serialization(format!("negative block {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_text_roundtrip() {
        let amount = Amount::MAX;
        let text = encode_amount(&amount);
        assert_eq!(decode_amount(&text).expect("decode"), amount);
    }

    #[test]
    fn test_bad_account_length() {
        assert!(decode_account(&[1, 2, 3]).is_err());
        let id = AccountId::derive("x");
        assert_eq!(decode_account(id.as_bytes()).expect("decode"), id);
    }

    #[test]
    fn test_block_range() {
        assert!(encode_block(u64::MAX).is_err());
        assert!(decode_block(-1).is_err());
        assert_eq!(decode_block(encode_block(42).expect("enc")).expect("dec"), 42);
    }
}
