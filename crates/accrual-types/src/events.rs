//! Notifications emitted by the accrual engine.
//!
//! Notifications carry the new authoritative values after each committed
//! state change. They exist for auditing and off-line consumers; the engine
//! never reads them back.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, BlockHeight};

/// Discriminant of an [`AccrualEvent`], used for filtering and storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PoolUpdated,
    RewardsPaid,
    WeightSet,
    AccessGranted,
    AccessRevoked,
}

impl EventType {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoolUpdated => "pool_updated",
            Self::RewardsPaid => "rewards_paid",
            Self::WeightSet => "weight_set",
            Self::AccessGranted => "access_granted",
            Self::AccessRevoked => "access_revoked",
        }
    }
}

/// A committed engine notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccrualEvent {
    /// The accumulator advanced.
    PoolUpdated {
        block: BlockHeight,
        /// Reward units that arrived in the vault since the previous update.
        delivered: Amount,
        acc_reward_per_weight: Amount,
        tracked_vault_balance: Amount,
        total_weight: Amount,
    },
    /// A participant was paid their pending reward.
    RewardsPaid {
        block: BlockHeight,
        participant: AccountId,
        amount: Amount,
    },
    /// A participant's weight changed.
    WeightSet {
        block: BlockHeight,
        participant: AccountId,
        old_weight: Amount,
        new_weight: Amount,
        total_weight: Amount,
    },
    /// An account was added to the weight-source allow-list.
    AccessGranted {
        block: BlockHeight,
        account: AccountId,
    },
    /// An account was removed from the weight-source allow-list.
    AccessRevoked {
        block: BlockHeight,
        account: AccountId,
    },
}

impl AccrualEvent {
    /// The event's discriminant.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PoolUpdated { .. } => EventType::PoolUpdated,
            Self::RewardsPaid { .. } => EventType::RewardsPaid,
            Self::WeightSet { .. } => EventType::WeightSet,
            Self::AccessGranted { .. } => EventType::AccessGranted,
            Self::AccessRevoked { .. } => EventType::AccessRevoked,
        }
    }

    /// Block height at which the event was committed.
    pub fn block(&self) -> BlockHeight {
        match self {
            Self::PoolUpdated { block, .. }
            | Self::RewardsPaid { block, .. }
            | Self::WeightSet { block, .. }
            | Self::AccessGranted { block, .. }
            | Self::AccessRevoked { block, .. } => *block,
        }
    }

    /// The participant or account the event concerns, if any.
    pub fn subject(&self) -> Option<AccountId> {
        match self {
            Self::PoolUpdated { .. } => None,
            Self::RewardsPaid { participant, .. } | Self::WeightSet { participant, .. } => {
                Some(*participant)
            }
            Self::AccessGranted { account, .. } | Self::AccessRevoked { account, .. } => {
                Some(*account)
            }
        }
    }
}
