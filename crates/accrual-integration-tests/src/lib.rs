//! Integration test crate for the accrual workspace.
//!
//! Holds shared fixtures only; the tests under `tests/` exercise the engine,
//! the vault, the ledger and the persistence layer together.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p accrual-integration-tests
//! ```

use std::collections::BTreeMap;

use accrual_engine::{
    AccrualEngine, AccrualError, CallContext, EngineConfig, FixedRateDripper, RewardSource,
};
use accrual_types::{AccountId, Amount, BlockHeight, TokenId};
use accrual_vault::{InMemoryLedger, TokenLedger};

/// Reward token used by every fixture.
pub fn reward_token() -> TokenId {
    TokenId::derive("integration reward")
}

pub fn engine_account() -> AccountId {
    AccountId::derive("integration engine")
}

pub fn vault_account() -> AccountId {
    AccountId::derive("integration vault")
}

pub fn admin() -> AccountId {
    AccountId::derive("integration admin")
}

/// The single authorized weight source.
pub fn weight_source() -> AccountId {
    AccountId::derive("integration weight source")
}

pub fn source_account() -> AccountId {
    AccountId::derive("integration reward source")
}

/// Named participant.
pub fn participant(name: &str) -> AccountId {
    AccountId::derive(name)
}

/// Reward source that delivers a per-block amount looked up from a table,
/// independent of what it advertises. Blocks missing from the table deliver
/// `default_per_block`.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    account: AccountId,
    advertised: Amount,
    default_per_block: Amount,
    overrides: BTreeMap<BlockHeight, Amount>,
    last_block: BlockHeight,
}

impl ScriptedSource {
    pub fn new(advertised: Amount, default_per_block: Amount, start: BlockHeight) -> Self {
        Self {
            account: source_account(),
            advertised,
            default_per_block,
            overrides: BTreeMap::new(),
            last_block: start,
        }
    }

    /// Deliver `amount` for block `block` instead of the default.
    pub fn set_block(&mut self, block: BlockHeight, amount: Amount) {
        self.overrides.insert(block, amount);
    }
}

impl RewardSource for ScriptedSource {
    fn request_drip(
        &mut self,
        ledger: &mut dyn TokenLedger,
        destination: &AccountId,
        block: BlockHeight,
    ) {
        let mut due = Amount::zero();
        for b in (self.last_block + 1)..=block {
            let per_block = self
                .overrides
                .get(&b)
                .copied()
                .unwrap_or(self.default_per_block);
            due = due.saturating_add(per_block);
        }
        self.last_block = self.last_block.max(block);

        let amount = due.min(ledger.balance_of(&self.account));
        if !amount.is_zero() {
            let _ = ledger.transfer(&self.account, destination, amount);
        }
    }

    fn advertised_rate_per_block(&self) -> Amount {
        self.advertised
    }

    fn reward_token(&self) -> TokenId {
        reward_token()
    }
}

/// Engine wired to an in-memory ledger and a fixed-rate dripper.
pub type DripEngine = AccrualEngine<InMemoryLedger, FixedRateDripper>;

/// Engine wired to an in-memory ledger and a scripted source.
pub type ScriptedEngine = AccrualEngine<InMemoryLedger, ScriptedSource>;

fn config(genesis: BlockHeight) -> EngineConfig {
    EngineConfig {
        engine_account: engine_account(),
        vault_account: vault_account(),
        admin: admin(),
        weight_sources: vec![weight_source()],
        genesis_block: genesis,
    }
}

fn funded_ledger(funding: Amount) -> accrual_engine::Result<InMemoryLedger> {
    let mut ledger = InMemoryLedger::new(reward_token());
    ledger
        .mint(&source_account(), funding)
        .map_err(AccrualError::TransferFailed)?;
    Ok(ledger)
}

/// Engine paying `rate` per block from a source holding `funding`.
pub fn drip_engine(
    rate: u64,
    funding: u64,
    genesis: BlockHeight,
) -> accrual_engine::Result<DripEngine> {
    let source = FixedRateDripper::new(
        reward_token(),
        source_account(),
        Amount::from(rate),
        genesis,
    );
    AccrualEngine::new(config(genesis), funded_ledger(Amount::from(funding))?, source)
}

/// Engine over a scripted source holding `funding`.
pub fn scripted_engine(
    source: ScriptedSource,
    funding: Amount,
    genesis: BlockHeight,
) -> accrual_engine::Result<ScriptedEngine> {
    AccrualEngine::new(config(genesis), funded_ledger(funding)?, source)
}

/// Call context for the weight source at `block`.
pub fn as_source(block: BlockHeight) -> CallContext {
    CallContext::new(weight_source(), block)
}

/// Call context for `who` at `block`.
pub fn as_participant(who: AccountId, block: BlockHeight) -> CallContext {
    CallContext::new(who, block)
}
