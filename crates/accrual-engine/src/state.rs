//! Global and per-participant accrual records.

use serde::{Deserialize, Serialize};

use accrual_types::{Amount, BlockHeight};

use crate::math::{self, Checked};

/// Engine-wide accrual record. One per engine, never destroyed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAccrualState {
    /// Sum of every participant's weight.
    pub total_weight: Amount,
    /// Running reward per weight unit, scaled by RAY. Never decreases.
    pub acc_reward_per_weight: Amount,
    /// Vault balance as of the last reconciliation.
    pub tracked_vault_balance: Amount,
    /// Height of the last pool update.
    pub last_update_block: BlockHeight,
}

impl GlobalAccrualState {
    /// Fresh state anchored at `block`.
    pub fn at_block(block: BlockHeight) -> Self {
        Self {
            last_update_block: block,
            ..Self::default()
        }
    }
}

/// Per-participant record. Created implicitly with zero weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Current debt weight.
    pub weight: Amount,
    /// `weight * acc / RAY` captured at the last settlement.
    pub reward_baseline: Amount,
}

impl ParticipantState {
    /// Reward accrued since the last settlement at accumulator `acc`.
    ///
    /// `None` means the baseline exceeds the accrued total, which can only
    /// happen if the accumulator moved backwards.
    pub fn pending(&self, acc: Amount) -> Checked<Option<Amount>> {
        let accrued = math::accrued(self.weight, acc)?;
        Ok(accrued.checked_sub(self.reward_baseline))
    }

    /// Reset the baseline to the current accrued total.
    pub fn rebase(&mut self, acc: Amount) -> Checked<()> {
        self.reward_baseline = math::accrued(self.weight, acc)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrual_types::units::ray;

    #[test]
    fn test_pending_after_rebase_is_zero() {
        let mut p = ParticipantState {
            weight: Amount::from(10u64),
            reward_baseline: Amount::zero(),
        };
        let acc = ray() * Amount::from(3u64);
        assert_eq!(p.pending(acc), Ok(Some(Amount::from(30u64))));

        p.rebase(acc).expect("rebase");
        assert_eq!(p.pending(acc), Ok(Some(Amount::zero())));
    }

    #[test]
    fn test_pending_detects_backwards_accumulator() {
        let mut p = ParticipantState {
            weight: Amount::from(10u64),
            reward_baseline: Amount::zero(),
        };
        p.rebase(ray()).expect("rebase");
        assert_eq!(p.pending(Amount::zero()), Ok(None));
    }

    #[test]
    fn test_global_at_block() {
        let g = GlobalAccrualState::at_block(100);
        assert_eq!(g.last_update_block, 100);
        assert!(g.total_weight.is_zero());
        assert!(g.acc_reward_per_weight.is_zero());
    }
}
