//! Weight-source allow-list.
//!
//! A flat set of accounts allowed to call `set_weight`. No roles, no
//! inheritance; membership is the whole check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use accrual_types::AccountId;

/// Accounts authorized to change participant weights.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessList {
    members: BTreeSet<AccountId>,
}

impl AccessList {
    /// Empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `account`. Returns `false` if it was already present.
    pub fn grant(&mut self, account: AccountId) -> bool {
        self.members.insert(account)
    }

    /// Remove `account`. Returns `false` if it was not present.
    pub fn revoke(&mut self, account: &AccountId) -> bool {
        self.members.remove(account)
    }

    /// Whether `account` is on the list.
    pub fn is_authorized(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }

    /// Members in account order.
    pub fn members(&self) -> impl Iterator<Item = &AccountId> {
        self.members.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<AccountId> for AccessList {
    fn from_iter<I: IntoIterator<Item = AccountId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}
