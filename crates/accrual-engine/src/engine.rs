//! The accrual engine.
//!
//! ## Algorithm
//!
//! ```text
//! pool update (at most once per block, only while total_weight > 0):
//!     drip source -> vault
//!     delivered  = vault.balance - tracked_vault_balance
//!     tracked   += delivered
//!     acc       += delivered * RAY / total_weight
//!
//! settlement for p:
//!     pool update
//!     pending    = p.weight * acc / RAY - p.baseline
//!     pay pending from the vault
//!     p.baseline = p.weight * acc / RAY
//! ```
//!
//! Every public mutating operation runs inside a transaction: the global
//! record and touched participants are staged, token movements go through a
//! [`JournaledLedger`], and the reward source is checkpointed. Nothing is
//! written back unless the whole operation succeeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use accrual_types::events::AccrualEvent;
use accrual_types::{AccountId, Amount, BlockHeight};
use accrual_vault::{TokenLedger, Vault};

use crate::access::AccessList;
use crate::journal::JournaledLedger;
use crate::math;
use crate::source::RewardSource;
use crate::state::{GlobalAccrualState, ParticipantState};
use crate::{AccrualError, Result};

/// Who is calling, and at which block height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    pub block: BlockHeight,
}

impl CallContext {
    pub fn new(caller: AccountId, block: BlockHeight) -> Self {
        Self { caller, block }
    }
}

/// Identities an engine is wired with at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The engine's own identity; owner of the vault.
    pub engine_account: AccountId,
    /// Ledger account of the custodian vault.
    pub vault_account: AccountId,
    /// Account allowed to edit the weight-source allow-list.
    pub admin: AccountId,
    /// Initial weight sources.
    pub weight_sources: Vec<AccountId>,
    /// Height the accumulator starts counting from.
    pub genesis_block: BlockHeight,
}

/// Everything needed to rebuild an engine, minus the ledger and source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub engine_account: AccountId,
    pub admin: AccountId,
    pub vault: Vault,
    pub global: GlobalAccrualState,
    pub participants: Vec<(AccountId, ParticipantState)>,
    pub weight_sources: Vec<AccountId>,
}

/// Pull-based reward accrual engine over ledger `L` and reward source `S`.
#[derive(Debug)]
pub struct AccrualEngine<L, S> {
    identity: AccountId,
    admin: AccountId,
    vault: Vault,
    global: GlobalAccrualState,
    participants: BTreeMap<AccountId, ParticipantState>,
    access: AccessList,
    ledger: L,
    source: S,
    outbox: Vec<AccrualEvent>,
}

impl<L, S> AccrualEngine<L, S>
where
    L: TokenLedger,
    S: RewardSource + Clone,
{
    /// Build a fresh engine. The vault is bound to the source's reward token
    /// and owned by `config.engine_account`.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::Misconfigured`] if the ledger and the source disagree
    ///   on the reward token
    pub fn new(config: EngineConfig, ledger: L, source: S) -> Result<Self> {
        let token = source.reward_token();
        check_token(&ledger, &source)?;

        let vault = Vault::new(token, config.engine_account, config.vault_account);
        let mut global = GlobalAccrualState::at_block(config.genesis_block);
        global.tracked_vault_balance = vault.balance(&ledger);

        info!(
            engine = %config.engine_account,
            vault = %config.vault_account,
            token = %token,
            genesis = config.genesis_block,
            "accrual engine created"
        );

        Ok(Self {
            identity: config.engine_account,
            admin: config.admin,
            vault,
            global,
            participants: BTreeMap::new(),
            access: config.weight_sources.into_iter().collect(),
            ledger,
            source,
            outbox: Vec::new(),
        })
    }

    /// Rebuild an engine from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::Misconfigured`] if the snapshot's vault, the ledger
    ///   and the source do not agree on the reward token, or the vault is not
    ///   owned by the engine
    /// - [`AccrualError::InvariantViolation`] if participant weights do not
    ///   sum to the recorded total weight
    pub fn from_snapshot(snapshot: EngineSnapshot, ledger: L, source: S) -> Result<Self> {
        check_token(&ledger, &source)?;
        if snapshot.vault.token() != source.reward_token() {
            return Err(AccrualError::Misconfigured(format!(
                "snapshot vault holds {}, source pays {}",
                snapshot.vault.token(),
                source.reward_token()
            )));
        }
        if snapshot.vault.owner() != snapshot.engine_account {
            return Err(AccrualError::Misconfigured(
                "snapshot vault is not owned by the engine".to_string(),
            ));
        }

        let mut sum = Amount::zero();
        for (_, p) in &snapshot.participants {
            sum = math::add(sum, p.weight)?;
        }
        if sum != snapshot.global.total_weight {
            return Err(AccrualError::InvariantViolation(format!(
                "participant weights sum to {sum}, total weight is {}",
                snapshot.global.total_weight
            )));
        }

        debug!(
            participants = snapshot.participants.len(),
            last_update_block = snapshot.global.last_update_block,
            "accrual engine restored"
        );

        Ok(Self {
            identity: snapshot.engine_account,
            admin: snapshot.admin,
            vault: snapshot.vault,
            global: snapshot.global,
            participants: snapshot.participants.into_iter().collect(),
            access: snapshot.weight_sources.into_iter().collect(),
            ledger,
            source,
            outbox: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Mutating operations
    // ------------------------------------------------------------------

    /// Advance the accumulator to `ctx.block`. Anyone may call this.
    pub fn update_pool(&mut self, ctx: &CallContext) -> Result<()> {
        self.execute(ctx, "update_pool", |tx| tx.update_pool())
    }

    /// Pay the caller their pending reward. Returns the amount paid.
    pub fn claim(&mut self, ctx: &CallContext) -> Result<Amount> {
        let caller = ctx.caller;
        self.execute(ctx, "claim", |tx| tx.settle(&caller))
    }

    /// Set `participant`'s weight. The caller must be an authorized weight
    /// source. Pending reward under the old weight is paid first; the
    /// amount paid is returned.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::Unauthorized`] if the caller is not a weight source
    /// - [`AccrualError::Arithmetic`] on overflow (e.g. total weight)
    /// - [`AccrualError::TransferFailed`] if the payout is rejected
    pub fn set_weight(
        &mut self,
        ctx: &CallContext,
        participant: &AccountId,
        new_weight: Amount,
    ) -> Result<Amount> {
        if !self.access.is_authorized(&ctx.caller) {
            warn!(caller = %ctx.caller, %participant, "set_weight rejected: not a weight source");
            return Err(AccrualError::Unauthorized {
                caller: ctx.caller,
                action: "set weight",
            });
        }
        let participant = *participant;
        self.execute(ctx, "set_weight", |tx| tx.set_weight(&participant, new_weight))
    }

    /// Add `account` to the weight-source allow-list. Admin only.
    pub fn grant_weight_source(&mut self, ctx: &CallContext, account: &AccountId) -> Result<bool> {
        self.require_admin(ctx, "grant weight source")?;
        let added = self.access.grant(*account);
        if added {
            info!(%account, "weight source granted");
            self.outbox.push(AccrualEvent::AccessGranted {
                block: ctx.block,
                account: *account,
            });
        }
        Ok(added)
    }

    /// Remove `account` from the weight-source allow-list. Admin only.
    pub fn revoke_weight_source(
        &mut self,
        ctx: &CallContext,
        account: &AccountId,
    ) -> Result<bool> {
        self.require_admin(ctx, "revoke weight source")?;
        let removed = self.access.revoke(account);
        if removed {
            info!(%account, "weight source revoked");
            self.outbox.push(AccrualEvent::AccessRevoked {
                block: ctx.block,
                account: *account,
            });
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Preview of `participant`'s pending reward at `block`.
    ///
    /// Projects one pool update using the source's advertised rate over the
    /// blocks elapsed since the last update. The next real settlement may
    /// pay a different amount if the source cannot deliver at that rate.
    pub fn pending_reward(&self, participant: &AccountId, block: BlockHeight) -> Result<Amount> {
        let mut acc = self.global.acc_reward_per_weight;
        let total = self.global.total_weight;

        if block > self.global.last_update_block && !total.is_zero() {
            let elapsed = Amount::from(block - self.global.last_update_block);
            let projected = math::mul(self.source.advertised_rate_per_block(), elapsed)?;
            acc = math::add(acc, math::per_weight(projected, total)?)?;
        }

        let state = self.participant(participant);
        state.pending(acc)?.ok_or_else(|| {
            AccrualError::InvariantViolation(format!(
                "baseline of {participant} exceeds accrued reward"
            ))
        })
    }

    /// Advertised reward per weight unit per block, scaled by WAD.
    /// Zero while nobody holds weight.
    pub fn reward_rate(&self) -> Result<Amount> {
        if self.global.total_weight.is_zero() {
            return Ok(Amount::zero());
        }
        Ok(math::rate_per_weight(
            self.source.advertised_rate_per_block(),
            self.global.total_weight,
        )?)
    }

    /// Current global record.
    pub fn global(&self) -> &GlobalAccrualState {
        &self.global
    }

    /// Record for `participant` (zero if no weight was ever set).
    pub fn participant(&self, participant: &AccountId) -> ParticipantState {
        self.participants
            .get(participant)
            .copied()
            .unwrap_or_default()
    }

    /// Record for `participant`, if a weight was ever set for it.
    pub fn find_participant(&self, participant: &AccountId) -> Option<ParticipantState> {
        self.participants.get(participant).copied()
    }

    /// Number of participants ever given a weight.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Whether `account` may call [`AccrualEngine::set_weight`].
    pub fn is_weight_source(&self, account: &AccountId) -> bool {
        self.access.is_authorized(account)
    }

    /// The allow-list.
    pub fn weight_sources(&self) -> &AccessList {
        &self.access
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn identity(&self) -> AccountId {
        self.identity
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Current vault balance as reported by the ledger.
    pub fn vault_balance(&self) -> Amount {
        self.vault.balance(&self.ledger)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for the environment (funding, external
    /// transfers). Not journaled.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Direct source access for the environment (rate changes).
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Take every notification committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<AccrualEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Export the engine's own state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            engine_account: self.identity,
            admin: self.admin,
            vault: self.vault.clone(),
            global: self.global,
            participants: self
                .participants
                .iter()
                .map(|(id, state)| (*id, *state))
                .collect(),
            weight_sources: self.access.members().copied().collect(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require_admin(&self, ctx: &CallContext, action: &'static str) -> Result<()> {
        if ctx.caller != self.admin {
            warn!(caller = %ctx.caller, action, "admin operation rejected");
            return Err(AccrualError::Unauthorized {
                caller: ctx.caller,
                action,
            });
        }
        Ok(())
    }

    /// Run `op` as one all-or-nothing transaction.
    fn execute<T>(
        &mut self,
        ctx: &CallContext,
        name: &'static str,
        op: impl FnOnce(&mut Transaction<'_, L, S>) -> Result<T>,
    ) -> Result<T> {
        let source_checkpoint = self.source.clone();

        let mut tx = Transaction {
            block: ctx.block,
            identity: self.identity,
            vault: &self.vault,
            base: &self.participants,
            global: self.global,
            staged: BTreeMap::new(),
            ledger: JournaledLedger::new(&mut self.ledger),
            source: &mut self.source,
            events: Vec::new(),
        };

        match op(&mut tx) {
            Ok(value) => {
                let Transaction {
                    global,
                    staged,
                    events,
                    ledger,
                    ..
                } = tx;
                let transfers = ledger.commit();
                trace!(op = name, transfers, touched = staged.len(), "transaction committed");
                self.global = global;
                self.participants.extend(staged);
                self.outbox.extend(events);
                Ok(value)
            }
            Err(err) => {
                let transfers = tx.ledger.entries().len();
                let reverted = tx.ledger.revert();
                drop(tx);
                self.source = source_checkpoint;

                if let Err(revert_err) = reverted {
                    error!(op = name, transfers, error = %err, revert_error = %revert_err, "ledger rollback incomplete");
                    return Err(AccrualError::InvariantViolation(format!(
                        "{name} failed ({err}) and its ledger rollback was refused ({revert_err})"
                    )));
                }
                warn!(op = name, caller = %ctx.caller, block = ctx.block, transfers, error = %err, "operation aborted");
                Err(err)
            }
        }
    }
}

fn check_token<L: TokenLedger, S: RewardSource>(ledger: &L, source: &S) -> Result<()> {
    if ledger.token() != source.reward_token() {
        return Err(AccrualError::Misconfigured(format!(
            "ledger tracks {}, source pays {}",
            ledger.token(),
            source.reward_token()
        )));
    }
    Ok(())
}

/// Staged view of the engine for the duration of one operation.
struct Transaction<'a, L: TokenLedger, S> {
    block: BlockHeight,
    identity: AccountId,
    vault: &'a Vault,
    base: &'a BTreeMap<AccountId, ParticipantState>,
    global: GlobalAccrualState,
    staged: BTreeMap<AccountId, ParticipantState>,
    ledger: JournaledLedger<'a, L>,
    source: &'a mut S,
    events: Vec<AccrualEvent>,
}

impl<L: TokenLedger, S: RewardSource> Transaction<'_, L, S> {
    fn participant(&self, id: &AccountId) -> ParticipantState {
        self.staged
            .get(id)
            .or_else(|| self.base.get(id))
            .copied()
            .unwrap_or_default()
    }

    /// Records exist only once a weight has been set.
    fn is_known(&self, id: &AccountId) -> bool {
        self.staged.contains_key(id) || self.base.contains_key(id)
    }

    fn update_pool(&mut self) -> Result<()> {
        if self.block <= self.global.last_update_block {
            return Ok(());
        }
        self.global.last_update_block = self.block;

        let total = self.global.total_weight;
        if total.is_zero() {
            trace!(block = self.block, "pool update: no weight, nothing accrues");
            return Ok(());
        }

        let vault_account = self.vault.account();
        self.source
            .request_drip(&mut self.ledger, &vault_account, self.block);

        let balance = self.vault.balance(&self.ledger);
        let tracked = self.global.tracked_vault_balance;
        let delivered = balance.checked_sub(tracked).ok_or_else(|| {
            AccrualError::InvariantViolation(format!(
                "vault balance {balance} fell below tracked {tracked}"
            ))
        })?;

        self.global.tracked_vault_balance = math::add(tracked, delivered)?;
        let increment = math::per_weight(delivered, total)?;
        self.global.acc_reward_per_weight = math::add(self.global.acc_reward_per_weight, increment)?;

        debug!(
            block = self.block,
            %delivered,
            acc = %self.global.acc_reward_per_weight,
            "pool updated"
        );
        self.events.push(AccrualEvent::PoolUpdated {
            block: self.block,
            delivered,
            acc_reward_per_weight: self.global.acc_reward_per_weight,
            tracked_vault_balance: self.global.tracked_vault_balance,
            total_weight: total,
        });
        Ok(())
    }

    fn settle(&mut self, id: &AccountId) -> Result<Amount> {
        self.update_pool()?;

        let acc = self.global.acc_reward_per_weight;
        let mut state = self.participant(id);
        let pending = state.pending(acc)?.ok_or_else(|| {
            AccrualError::InvariantViolation(format!("baseline of {id} exceeds accrued reward"))
        })?;

        let mut paid = Amount::zero();
        if !pending.is_zero() && !self.vault.balance(&self.ledger).is_zero() {
            self.vault
                .transfer_out(&mut self.ledger, &self.identity, id, pending)?;
            self.global.tracked_vault_balance =
                math::sub(self.global.tracked_vault_balance, pending)?;
            paid = pending;

            info!(participant = %id, amount = %paid, block = self.block, "rewards paid");
            self.events.push(AccrualEvent::RewardsPaid {
                block: self.block,
                participant: *id,
                amount: paid,
            });
        }

        state.rebase(acc)?;
        if self.is_known(id) {
            self.staged.insert(*id, state);
        }
        Ok(paid)
    }

    fn set_weight(&mut self, id: &AccountId, new_weight: Amount) -> Result<Amount> {
        let paid = self.settle(id)?;

        let mut state = self.participant(id);
        let old_weight = state.weight;
        self.global.total_weight = if new_weight >= old_weight {
            math::add(self.global.total_weight, new_weight - old_weight)?
        } else {
            math::sub(self.global.total_weight, old_weight - new_weight)?
        };

        state.weight = new_weight;
        state.rebase(self.global.acc_reward_per_weight)?;
        self.staged.insert(*id, state);

        info!(
            participant = %id,
            %old_weight,
            %new_weight,
            total_weight = %self.global.total_weight,
            "weight set"
        );
        self.events.push(AccrualEvent::WeightSet {
            block: self.block,
            participant: *id,
            old_weight,
            new_weight,
            total_weight: self.global.total_weight,
        });
        Ok(paid)
    }
}
