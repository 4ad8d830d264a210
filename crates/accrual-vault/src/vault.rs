//! Owner-gated custodian vault.
//!
//! A vault is an account on the token ledger plus two immutable bindings:
//! the token it custodies and the single owner allowed to move funds out.
//! The balance is never cached here; it is always read from the ledger.

use serde::{Deserialize, Serialize};

use accrual_types::{AccountId, Amount, TokenId};

use crate::ledger::TokenLedger;
use crate::{Result, VaultError};

/// Custodian of the reward token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    token: TokenId,
    owner: AccountId,
    account: AccountId,
}

impl Vault {
    /// Bind a vault at ledger `account` to `token` and `owner`.
    pub fn new(token: TokenId, owner: AccountId, account: AccountId) -> Self {
        Self {
            token,
            owner,
            account,
        }
    }

    /// Token held by this vault.
    pub fn token(&self) -> TokenId {
        self.token
    }

    /// The only account allowed to call [`Vault::transfer_out`].
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// Ledger account holding the custodied funds.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Current custodied amount.
    pub fn balance(&self, ledger: &dyn TokenLedger) -> Amount {
        ledger.balance_of(&self.account)
    }

    /// Move `amount` of the custodied token to `to`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not the owner
    /// - [`VaultError::TokenMismatch`] if `ledger` tracks another token
    /// - [`VaultError::TransferFailed`] if the ledger rejects the transfer
    pub fn transfer_out(
        &self,
        ledger: &mut dyn TokenLedger,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        if caller != &self.owner {
            tracing::warn!(%caller, "vault transfer rejected: not owner");
            return Err(VaultError::Unauthorized { caller: *caller });
        }
        if ledger.token() != self.token {
            return Err(VaultError::TokenMismatch {
                expected: self.token,
                actual: ledger.token(),
            });
        }

        ledger.transfer(&self.account, to, amount)?;

        tracing::debug!(%to, %amount, "vault transfer out");
        Ok(())
    }
}
