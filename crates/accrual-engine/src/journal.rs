//! Ledger journal for all-or-nothing operations.
//!
//! Every engine operation runs its token movements through a
//! [`JournaledLedger`]. If the operation fails after some transfers already
//! went through (a drip landed, then the payout overflowed), the journal
//! replays the inverse transfers newest-first so the ledger ends exactly
//! where it started.

use accrual_types::{AccountId, Amount, TokenId};
use accrual_vault::{LedgerError, TokenLedger};

/// A transfer applied through the journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

/// Ledger wrapper recording successful transfers.
pub struct JournaledLedger<'a, L: TokenLedger + ?Sized> {
    inner: &'a mut L,
    entries: Vec<JournalEntry>,
}

impl<'a, L: TokenLedger + ?Sized> JournaledLedger<'a, L> {
    /// Start journaling on top of `inner`.
    pub fn new(inner: &'a mut L) -> Self {
        Self {
            inner,
            entries: Vec::new(),
        }
    }

    /// Transfers recorded so far, oldest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Keep every recorded transfer. Returns how many there were.
    pub fn commit(self) -> usize {
        self.entries.len()
    }

    /// Undo every recorded transfer, newest first.
    ///
    /// # Errors
    ///
    /// Returns the ledger's error if an inverse transfer is refused. Entries
    /// after the failing one have already been undone.
    pub fn revert(&mut self) -> Result<(), LedgerError> {
        while let Some(entry) = self.entries.pop() {
            self.inner.transfer(&entry.to, &entry.from, entry.amount)?;
        }
        Ok(())
    }
}

impl<L: TokenLedger + ?Sized> TokenLedger for JournaledLedger<'_, L> {
    fn token(&self) -> TokenId {
        self.inner.token()
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.inner.balance_of(account)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.inner.transfer(from, to, amount)?;
        self.entries.push(JournalEntry {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }
}
