//! Engine construction at daemon start.
//!
//! A fresh database gets a new engine built from configuration, with the
//! reward source funded from `initial_funding`. An existing database is
//! restored from its snapshot, ledger balances and source state.

use anyhow::Context;
use rusqlite::Connection;
use tracing::info;

use accrual_db::queries;
use accrual_engine::{AccrualEngine, EngineConfig, FixedRateDripper};
use accrual_types::BlockHeight;
use accrual_vault::InMemoryLedger;

use crate::config::DaemonConfig;

/// The engine as the daemon runs it.
pub type Engine = AccrualEngine<InMemoryLedger, FixedRateDripper>;

/// Restore the engine from `conn`, or create and persist a new one.
pub fn load_or_create(config: &DaemonConfig, conn: &Connection) -> anyhow::Result<Engine> {
    match queries::engine::load_snapshot(conn)? {
        Some(snapshot) => {
            let ledger = InMemoryLedger::from_balances(
                snapshot.vault.token(),
                queries::ledger::list(conn)?,
            )?;
            let source: FixedRateDripper = queries::source::load(conn)?
                .context("database has an engine snapshot but no reward source state")?;
            let participants = snapshot.participants.len();
            let engine = AccrualEngine::from_snapshot(snapshot, ledger, source)?;
            info!(
                participants,
                last_update_block = engine.global().last_update_block,
                "engine restored"
            );
            Ok(engine)
        }
        None => create(config, conn),
    }
}

fn create(config: &DaemonConfig, conn: &Connection) -> anyhow::Result<Engine> {
    let token = config.reward_token();
    let genesis = config.clock.genesis_block;

    let mut ledger = InMemoryLedger::new(token);
    let source_account = config.source_account();
    ledger.mint(&source_account, config.initial_funding()?)?;

    let source =
        FixedRateDripper::new(token, source_account, config.rate_per_block()?, genesis);
    let engine = AccrualEngine::new(
        EngineConfig {
            engine_account: config.engine_account(),
            vault_account: config.vault_account(),
            admin: config.admin(),
            weight_sources: config.weight_sources(),
            genesis_block: genesis,
        },
        ledger,
        source,
    )?;

    queries::engine::save_snapshot(conn, &engine.snapshot())?;
    queries::ledger::replace_all(conn, engine.ledger().balances())?;
    queries::source::save(conn, engine.source())?;
    queries::settings::mark_bootstrapped(conn)?;

    info!(
        engine = %engine.identity(),
        vault = %engine.vault().account(),
        genesis,
        "engine created"
    );
    Ok(engine)
}

/// Height the block clock resumes from: never behind anything already
/// recorded.
pub fn resume_height(
    config: &DaemonConfig,
    conn: &Connection,
    engine: &Engine,
) -> anyhow::Result<BlockHeight> {
    let stored = queries::settings::clock_block(conn)?;
    Ok(config
        .clock
        .genesis_block
        .max(stored)
        .max(engine.global().last_update_block))
}
