//! # accrual-vault
//!
//! Custodian vault and the token-ledger boundary it sits on.
//!
//! The vault holds the reward token on behalf of the accrual engine. It has
//! no accounting of its own: it reports its balance and moves tokens out when
//! its owner asks.
//!
//! ## Modules
//!
//! - [`ledger`]: Fungible token ledger trait and an in-memory ledger
//! - [`vault`]: Owner-gated custodian vault

pub mod ledger;
pub mod vault;

pub use ledger::{InMemoryLedger, TokenLedger};
pub use vault::Vault;

use accrual_types::{AccountId, Amount, TokenId};

/// Errors raised by the token ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Sender balance does not cover the transfer.
    #[error("insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        /// The sending account.
        account: AccountId,
        /// Amount requested.
        required: Amount,
        /// Amount held.
        available: Amount,
    },

    /// Recipient balance or supply would overflow.
    #[error("balance overflow crediting {0}")]
    Overflow(AccountId),

    /// The ledger refuses to move tokens for this account.
    #[error("account frozen: {0}")]
    Frozen(AccountId),
}

/// Errors raised by the custodian vault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Caller is not the vault's owner.
    #[error("unauthorized: {caller} is not the vault owner")]
    Unauthorized {
        /// The rejected caller.
        caller: AccountId,
    },

    /// The underlying token transfer was rejected.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    /// The ledger handed to the vault tracks a different token.
    #[error("token mismatch: vault holds {expected}, ledger tracks {actual}")]
    TokenMismatch {
        /// The vault's token.
        expected: TokenId,
        /// The ledger's token.
        actual: TokenId,
    },
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
