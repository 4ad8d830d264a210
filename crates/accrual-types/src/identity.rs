//! Account and token identities.
//!
//! Both are opaque 32-byte values, serialized as lowercase hex. Named
//! identities (configured accounts, test fixtures) are derived with BLAKE3
//! key derivation so that the same label always maps to the same id.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{Result, TypesError};

/// BLAKE3 derivation context for account identities.
pub const ACCOUNT_CONTEXT: &str = "accrual v1 account-id";

/// BLAKE3 derivation context for token identities.
pub const TOKEN_CONTEXT: &str = "accrual v1 token-id";

macro_rules! identity_type {
    ($(#[$meta:meta])* $name:ident, $context:expr) => {
        $(#[$meta])*
        #[serde_as]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(#[serde_as(as = "serde_with::hex::Hex")] [u8; 32]);

        impl $name {
            /// The all-zero identity.
            pub const ZERO: Self = Self([0u8; 32]);

            /// Wrap raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Derive an identity from a human-readable label.
            pub fn derive(label: &str) -> Self {
                Self(blake3::derive_key($context, label.as_bytes()))
            }

            /// Parse a 64-character hex string (an optional `0x` prefix is accepted).
            pub fn from_hex(s: &str) -> Result<Self> {
                let trimmed = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(trimmed)
                    .map_err(|e| TypesError::InvalidIdentity(format!("{s}: {e}")))?;
                let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
                    TypesError::InvalidIdentity(format!("expected 32 bytes, got {}", v.len()))
                })?;
                Ok(Self(array))
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Full lowercase hex encoding.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}..)", stringify!($name), &self.to_hex()[..8])
            }
        }
    };
}

identity_type!(
    /// Identity of a ledger account: participants, the engine, the vault,
    /// the reward source and administrators all share this namespace.
    AccountId,
    ACCOUNT_CONTEXT
);

identity_type!(
    /// Identity of a fungible token.
    TokenId,
    TOKEN_CONTEXT
);
