//! Reward source boundary.
//!
//! The engine consumes three things from its reward source: a request to
//! push whatever is currently due into the vault, an advertised per-block
//! rate used only by preview views, and the identity of the reward token.
//! The engine never trusts the advertised rate for accounting; it measures
//! what actually arrived in the vault.

use serde::{Deserialize, Serialize};

use accrual_types::{AccountId, Amount, BlockHeight, TokenId};
use accrual_vault::TokenLedger;

/// External supplier of reward tokens.
///
/// Implementations receive the ledger, never the engine, so a drip cannot
/// call back into the engine mid-operation.
pub trait RewardSource {
    /// Push any reward currently due at `block` to `destination`.
    ///
    /// Must not fail: a depleted or misbehaving source delivers nothing.
    fn request_drip(
        &mut self,
        ledger: &mut dyn TokenLedger,
        destination: &AccountId,
        block: BlockHeight,
    );

    /// Advertised delivery rate in reward units per block.
    fn advertised_rate_per_block(&self) -> Amount;

    /// Token this source pays out.
    fn reward_token(&self) -> TokenId;
}

/// Source paying a fixed amount per elapsed block from its own ledger
/// account.
///
/// When the account cannot cover what is due, the source pays what it has
/// and carries the shortfall, so that a later top-up catches recipients up
/// to the cumulative schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRateDripper {
    token: TokenId,
    account: AccountId,
    rate_per_block: Amount,
    last_drip_block: BlockHeight,
    owed: Amount,
}

impl FixedRateDripper {
    /// New source funded from `account`, accruing from `start_block`.
    pub fn new(
        token: TokenId,
        account: AccountId,
        rate_per_block: Amount,
        start_block: BlockHeight,
    ) -> Self {
        Self {
            token,
            account,
            rate_per_block,
            last_drip_block: start_block,
            owed: Amount::zero(),
        }
    }

    /// Ledger account the source pays from.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Block of the last drip.
    pub fn last_drip_block(&self) -> BlockHeight {
        self.last_drip_block
    }

    /// Scheduled reward not yet delivered for lack of funds.
    pub fn owed(&self) -> Amount {
        self.owed
    }

    /// Change the per-block rate from `block` onward. Reward scheduled
    /// before `block` stays owed at the old rate.
    pub fn set_rate(&mut self, rate_per_block: Amount, block: BlockHeight) {
        self.accrue_schedule(block);
        self.rate_per_block = rate_per_block;
        tracing::info!(%rate_per_block, block, "reward source rate changed");
    }

    fn accrue_schedule(&mut self, block: BlockHeight) {
        if block <= self.last_drip_block {
            return;
        }
        let elapsed = Amount::from(block - self.last_drip_block);
        self.owed = self
            .owed
            .saturating_add(self.rate_per_block.saturating_mul(elapsed));
        self.last_drip_block = block;
    }
}

impl RewardSource for FixedRateDripper {
    fn request_drip(
        &mut self,
        ledger: &mut dyn TokenLedger,
        destination: &AccountId,
        block: BlockHeight,
    ) {
        self.accrue_schedule(block);

        let available = ledger.balance_of(&self.account);
        let amount = self.owed.min(available);
        if amount.is_zero() {
            tracing::trace!(block, owed = %self.owed, "drip: nothing deliverable");
            return;
        }

        match ledger.transfer(&self.account, destination, amount) {
            Ok(()) => {
                self.owed = self.owed.saturating_sub(amount);
                tracing::debug!(block, %amount, owed = %self.owed, "drip delivered");
            }
            Err(e) => {
                tracing::warn!(block, %amount, error = %e, "drip transfer rejected");
            }
        }
    }

    fn advertised_rate_per_block(&self) -> Amount {
        self.rate_per_block
    }

    fn reward_token(&self) -> TokenId {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrual_vault::InMemoryLedger;

    struct Fixture {
        ledger: InMemoryLedger,
        source: FixedRateDripper,
        vault: AccountId,
    }

    fn fixture(rate: u64, funding: u64) -> Fixture {
        let token = TokenId::derive("reward");
        let account = AccountId::derive("dripper");
        let mut ledger = InMemoryLedger::new(token);
        ledger
            .mint(&account, Amount::from(funding))
            .expect("fund source");
        Fixture {
            ledger,
            source: FixedRateDripper::new(token, account, Amount::from(rate), 100),
            vault: AccountId::derive("vault"),
        }
    }

    #[test]
    fn test_drip_pays_rate_times_elapsed() {
        let mut f = fixture(5, 1_000);
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        assert_eq!(f.ledger.balance_of(&f.vault), Amount::from(50u64));
        assert_eq!(f.source.last_drip_block(), 110);
        assert!(f.source.owed().is_zero());
    }

    #[test]
    fn test_drip_same_block_is_noop() {
        let mut f = fixture(5, 1_000);
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        assert_eq!(f.ledger.balance_of(&f.vault), Amount::from(50u64));
    }

    #[test]
    fn test_depleted_source_carries_shortfall() {
        let mut f = fixture(5, 20);
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        assert_eq!(f.ledger.balance_of(&f.vault), Amount::from(20u64));
        assert_eq!(f.source.owed(), Amount::from(30u64));

        // Top-up: the next drip catches up on the carried 30 plus 2 new blocks.
        f.ledger
            .mint(&f.source.account(), Amount::from(1_000u64))
            .expect("top up");
        f.source.request_drip(&mut f.ledger, &f.vault, 112);
        assert_eq!(f.ledger.balance_of(&f.vault), Amount::from(60u64));
        assert!(f.source.owed().is_zero());
    }

    #[test]
    fn test_empty_source_delivers_nothing() {
        let mut f = fixture(5, 0);
        f.source.request_drip(&mut f.ledger, &f.vault, 150);
        assert!(f.ledger.balance_of(&f.vault).is_zero());
        assert_eq!(f.source.owed(), Amount::from(250u64));
    }

    #[test]
    fn test_rejected_transfer_keeps_owed() {
        let mut f = fixture(5, 1_000);
        f.ledger.freeze(&f.vault);
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        assert!(f.ledger.balance_of(&f.vault).is_zero());
        assert_eq!(f.source.owed(), Amount::from(50u64));
    }

    #[test]
    fn test_set_rate_keeps_old_schedule() {
        let mut f = fixture(5, 1_000);
        f.source.set_rate(Amount::from(1u64), 104);
        assert_eq!(f.source.owed(), Amount::from(20u64));
        f.source.request_drip(&mut f.ledger, &f.vault, 110);
        assert_eq!(f.ledger.balance_of(&f.vault), Amount::from(26u64));
        assert_eq!(f.source.advertised_rate_per_block(), Amount::from(1u64));
    }
}
