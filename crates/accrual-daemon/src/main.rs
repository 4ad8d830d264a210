//! accrual-daemon: long-running host for the reward accrual engine.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon via newline-delimited JSON-RPC over a Unix socket. Block height is
//! driven by a wall-clock block clock; every committed engine operation is
//! persisted to SQLite and broadcast on the event bus.

mod bootstrap;
mod clock;
mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

use crate::bootstrap::Engine;
use crate::clock::BlockClock;
use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// The engine. Every operation is serialized through this lock.
    pub engine: Arc<Mutex<Engine>>,
    /// Database connection. Always locked after `engine`, never before.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Current block height.
    pub clock: BlockClock,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("accrual={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("Accrual daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("accrual.db");
    let conn = accrual_db::open(&db_path)?;

    // 3. Restore or create the engine
    let engine = bootstrap::load_or_create(&config, &conn)?;
    let start = bootstrap::resume_height(&config, &conn, &engine)?;
    let clock = BlockClock::new(start, config.clock.block_interval_ms);

    // 4. Event bus and shutdown channel
    let event_bus = EventBus::new(config.advanced.event_buffer);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let state = Arc::new(DaemonState {
        engine: Arc::new(Mutex::new(engine)),
        db: Arc::new(Mutex::new(conn)),
        config,
        event_bus,
        clock: clock.clone(),
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Block clock
    let clock_task = tokio::spawn(clock.run(shutdown_tx.subscribe()));

    // 7. IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(
        "daemon_started",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "block": start,
        }),
    );

    // 8. Run until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");
    let _ = shutdown_tx.send(());
    let _ = clock_task.await;

    // Record where the clock stopped so a restart never reuses a height.
    {
        let _engine = state.engine.lock().await;
        let db = state.db.lock().await;
        accrual_db::queries::settings::set_clock_block(&db, state.clock.current())?;
    }

    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
