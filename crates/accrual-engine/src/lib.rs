//! # accrual-engine
//!
//! Pull-based reward accrual.
//!
//! A reward source drips tokens into a custodian vault. Participants hold a
//! weight set by a trusted upstream authority and earn a share of every
//! drip proportional to their weight at the time it arrived. The
//! accumulator pattern (a global reward-per-weight running total plus a
//! per-participant baseline snapshot) keeps every operation O(1) regardless
//! of the number of participants.
//!
//! ## Modules
//!
//! - [`math`]: Checked 256-bit fixed-point arithmetic
//! - [`state`]: Global and per-participant accrual records
//! - [`access`]: Weight-source allow-list
//! - [`source`]: Reward source boundary and a fixed-rate dripper
//! - [`journal`]: Ledger journal used to roll back failed operations
//! - [`engine`]: The accrual engine

pub mod access;
pub mod engine;
pub mod journal;
pub mod math;
pub mod source;
pub mod state;

pub use engine::{AccrualEngine, CallContext, EngineConfig, EngineSnapshot};
pub use source::{FixedRateDripper, RewardSource};
pub use state::{GlobalAccrualState, ParticipantState};

use accrual_types::AccountId;
use accrual_vault::{LedgerError, VaultError};

/// Arithmetic faults. Every one aborts the operation that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticFault {
    /// Addition exceeded 256 bits.
    #[error("addition overflow")]
    AddOverflow,

    /// Multiplication exceeded 256 bits.
    #[error("multiplication overflow")]
    MulOverflow,

    /// Subtrahend larger than minuend.
    #[error("subtraction underflow")]
    SubUnderflow,

    /// Division by zero.
    #[error("division by zero")]
    DivByZero,
}

/// Error types for accrual operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccrualError {
    /// Caller lacks the privilege the operation requires.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: AccountId,
        /// The attempted action.
        action: &'static str,
    },

    /// Overflow or underflow in checked arithmetic.
    #[error("arithmetic fault: {0}")]
    Arithmetic(#[from] ArithmeticFault),

    /// The underlying token transfer was rejected.
    #[error("transfer failed: {0}")]
    TransferFailed(LedgerError),

    /// Accounting state contradicts the ledger. Indicates tampering or a bug.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Engine wiring is inconsistent (token or ownership mismatch).
    #[error("misconfigured: {0}")]
    Misconfigured(String),
}

impl From<VaultError> for AccrualError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Unauthorized { caller } => AccrualError::Unauthorized {
                caller,
                action: "move vault funds",
            },
            VaultError::TransferFailed(inner) => AccrualError::TransferFailed(inner),
            VaultError::TokenMismatch { expected, actual } => AccrualError::Misconfigured(
                format!("vault holds {expected}, ledger tracks {actual}"),
            ),
        }
    }
}

/// Convenience result type for accrual operations.
pub type Result<T> = std::result::Result<T, AccrualError>;
