//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Engine identity and global accrual record (single rows)
-- ============================================================

CREATE TABLE IF NOT EXISTS engine_identity (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    engine_account BLOB NOT NULL,
    admin BLOB NOT NULL,
    vault_account BLOB NOT NULL,
    vault_owner BLOB NOT NULL,
    reward_token BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS accrual_global (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_weight TEXT NOT NULL,
    acc_reward_per_weight TEXT NOT NULL,
    tracked_vault_balance TEXT NOT NULL,
    last_update_block INTEGER NOT NULL
);

-- ============================================================
-- Participants (one row per participant ever seen, never pruned)
-- ============================================================

CREATE TABLE IF NOT EXISTS participants (
    account BLOB PRIMARY KEY,
    weight TEXT NOT NULL,
    reward_baseline TEXT NOT NULL,
    updated_block INTEGER NOT NULL
);

-- ============================================================
-- Weight-source allow-list
-- ============================================================

CREATE TABLE IF NOT EXISTS authorized_callers (
    account BLOB PRIMARY KEY,
    granted_block INTEGER NOT NULL
);

-- ============================================================
-- Token ledger and reward source
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_balances (
    account BLOB PRIMARY KEY,
    amount TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reward_source (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    state_json TEXT NOT NULL
);

-- ============================================================
-- Notification audit log
-- ============================================================

CREATE TABLE IF NOT EXISTS notification_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    block INTEGER NOT NULL,
    subject BLOB,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notification_block ON notification_log(block);
CREATE INDEX IF NOT EXISTS idx_notification_subject ON notification_log(subject);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
