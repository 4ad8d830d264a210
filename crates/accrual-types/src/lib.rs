//! # accrual-types
//!
//! Shared domain types used across the accrual workspace: account and token
//! identities, the 256-bit [`Amount`] type with its fixed-point scales, and
//! the notifications emitted by the accrual engine.

pub mod events;
pub mod identity;
pub mod units;

pub use identity::{AccountId, TokenId};
pub use units::{Amount, BlockHeight, RAY, WAD};

/// Errors raised while parsing shared types from external input.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Hex identity with the wrong shape.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Amount string that is not a decimal or `0x` hex integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Convenience result type for type parsing.
pub type Result<T> = std::result::Result<T, TypesError>;
