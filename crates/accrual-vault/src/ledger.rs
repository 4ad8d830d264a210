//! Fungible token ledger.
//!
//! [`TokenLedger`] is the only surface the vault and the reward source use
//! to move tokens. Implementations must follow plain fungible-token
//! semantics: a transfer either moves exactly `amount` or fails without
//! effect. Fee-on-transfer tokens and tokens with transfer callbacks are not
//! supported.

use std::collections::{BTreeMap, BTreeSet};

use accrual_types::{AccountId, Amount, TokenId};

use crate::LedgerError;

/// Balance bookkeeping for a single fungible token.
pub trait TokenLedger {
    /// Identity of the token this ledger tracks.
    fn token(&self) -> TokenId;

    /// Current balance of `account`. Unknown accounts hold zero.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] and leaves every balance untouched if the
    /// transfer cannot be applied in full.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}

/// In-process ledger backed by an ordered map.
#[derive(Clone, Debug)]
pub struct InMemoryLedger {
    token: TokenId,
    balances: BTreeMap<AccountId, Amount>,
    frozen: BTreeSet<AccountId>,
    total_supply: Amount,
}

impl InMemoryLedger {
    /// Create an empty ledger for `token`.
    pub fn new(token: TokenId) -> Self {
        Self {
            token,
            balances: BTreeMap::new(),
            frozen: BTreeSet::new(),
            total_supply: Amount::zero(),
        }
    }

    /// Rebuild a ledger from persisted balances.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the balances sum past `Amount::MAX`
    pub fn from_balances(
        token: TokenId,
        balances: impl IntoIterator<Item = (AccountId, Amount)>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(token);
        for (account, amount) in balances {
            ledger.mint(&account, amount)?;
        }
        Ok(ledger)
    }

    /// Create `amount` new tokens in `to`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the balance or total supply would overflow
    pub fn mint(&mut self, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        tracing::trace!(%to, %amount, "ledger mint");
        Ok(())
    }

    /// Refuse all future transfers touching `account`.
    pub fn freeze(&mut self, account: &AccountId) {
        self.frozen.insert(*account);
    }

    /// Lift a freeze placed by [`InMemoryLedger::freeze`].
    pub fn unfreeze(&mut self, account: &AccountId) {
        self.frozen.remove(account);
    }

    /// Total tokens in existence.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// All non-zero balances in account order.
    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, amount)| !amount.is_zero())
    }
}

impl TokenLedger for InMemoryLedger {
    fn token(&self) -> TokenId {
        self.token
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if self.frozen.contains(from) {
            return Err(LedgerError::Frozen(*from));
        }
        if self.frozen.contains(to) {
            return Err(LedgerError::Frozen(*to));
        }

        let available = self.balance_of(from);
        let debited = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: *from,
                required: amount,
                available,
            })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        self.balances.insert(*from, debited);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(TokenId::derive("reward"))
    }

    #[test]
    fn test_mint_and_balance() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        ledger.mint(&alice, Amount::from(500u64)).expect("mint");
        assert_eq!(ledger.balance_of(&alice), Amount::from(500u64));
        assert_eq!(ledger.total_supply(), Amount::from(500u64));
        assert_eq!(ledger.balance_of(&AccountId::derive("nobody")), Amount::zero());
    }

    #[test]
    fn test_transfer_moves_exact_amount() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        ledger.mint(&alice, Amount::from(500u64)).expect("mint");

        ledger
            .transfer(&alice, &bob, Amount::from(200u64))
            .expect("transfer");
        assert_eq!(ledger.balance_of(&alice), Amount::from(300u64));
        assert_eq!(ledger.balance_of(&bob), Amount::from(200u64));
        assert_eq!(ledger.total_supply(), Amount::from(500u64));
    }

    #[test]
    fn test_transfer_insufficient_is_noop() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        ledger.mint(&alice, Amount::from(10u64)).expect("mint");

        let err = ledger
            .transfer(&alice, &bob, Amount::from(11u64))
            .expect_err("must fail");
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&alice), Amount::from(10u64));
        assert_eq!(ledger.balance_of(&bob), Amount::zero());
    }

    #[test]
    fn test_frozen_account_rejected() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        ledger.mint(&alice, Amount::from(10u64)).expect("mint");
        ledger.freeze(&bob);

        let err = ledger
            .transfer(&alice, &bob, Amount::from(1u64))
            .expect_err("frozen");
        assert_eq!(err, LedgerError::Frozen(bob));

        ledger.unfreeze(&bob);
        ledger
            .transfer(&alice, &bob, Amount::from(1u64))
            .expect("unfrozen");
    }

    #[test]
    fn test_mint_overflow_rejected() {
        let mut ledger = ledger();
        let alice = AccountId::derive("alice");
        ledger.mint(&alice, Amount::MAX).expect("mint max");
        assert!(ledger.mint(&alice, Amount::one()).is_err());
        assert_eq!(ledger.balance_of(&alice), Amount::MAX);
    }

    #[test]
    fn test_from_balances_and_listing() {
        let alice = AccountId::derive("alice");
        let bob = AccountId::derive("bob");
        let ledger = InMemoryLedger::from_balances(
            TokenId::derive("reward"),
            [(alice, Amount::from(3u64)), (bob, Amount::zero())],
        )
        .expect("restore");
        let listed: Vec<_> = ledger.balances().collect();
        assert_eq!(listed, vec![(&alice, &Amount::from(3u64))]);
    }
}
