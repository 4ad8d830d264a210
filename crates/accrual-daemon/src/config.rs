//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use accrual_types::units::parse_amount;
use accrual_types::{AccountId, Amount, BlockHeight, TokenId};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Engine identities.
    #[serde(default)]
    pub engine: EngineSection,
    /// Reward source settings.
    #[serde(default)]
    pub source: SourceSection,
    /// Block clock settings.
    #[serde(default)]
    pub clock: ClockSection,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Engine identities.
///
/// Account fields accept either 64 hex characters or a label, which is
/// hashed into an account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Account allowed to edit the weight-source allow-list.
    #[serde(default = "default_admin")]
    pub admin: String,
    /// The engine's own identity, owner of the vault.
    #[serde(default = "default_engine_account")]
    pub engine_account: String,
    /// Ledger account holding rewards in custody.
    #[serde(default = "default_vault_account")]
    pub vault_account: String,
    /// Accounts allowed to set weights at bootstrap.
    #[serde(default = "default_weight_sources")]
    pub weight_sources: Vec<String>,
}

/// Reward source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Ledger account the dripper pays from.
    #[serde(default = "default_source_account")]
    pub source_account: String,
    /// Reward units per block, decimal or `0x` hex.
    #[serde(default = "default_rate_per_block")]
    pub rate_per_block: String,
    /// Tokens minted into the source account on first start.
    #[serde(default = "default_initial_funding")]
    pub initial_funding: String,
    /// Name of the reward token; hashed into its token id.
    #[serde(default = "default_reward_token")]
    pub reward_token: String,
}

/// Block clock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSection {
    /// Wall-clock milliseconds per block.
    #[serde(default = "default_block_interval")]
    pub block_interval_ms: u64,
    /// Height of the first block.
    #[serde(default)]
    pub genesis_block: BlockHeight,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

// Default value functions

fn default_admin() -> String {
    "admin".to_string()
}

fn default_engine_account() -> String {
    "accrual-engine".to_string()
}

fn default_vault_account() -> String {
    "accrual-vault".to_string()
}

fn default_weight_sources() -> Vec<String> {
    vec!["weight-source".to_string()]
}

fn default_source_account() -> String {
    "reward-source".to_string()
}

fn default_rate_per_block() -> String {
    // 1 token at 18 decimals
    "1000000000000000000".to_string()
}

fn default_initial_funding() -> String {
    "1000000000000000000000000".to_string()
}

fn default_reward_token() -> String {
    "REWARD".to_string()
}

fn default_block_interval() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            engine_account: default_engine_account(),
            vault_account: default_vault_account(),
            weight_sources: default_weight_sources(),
        }
    }
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            source_account: default_source_account(),
            rate_per_block: default_rate_per_block(),
            initial_funding: default_initial_funding(),
            reward_token: default_reward_token(),
        }
    }
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            block_interval_ms: default_block_interval(),
            genesis_block: 0,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Resolve a configured account: 64 hex characters, or a label to derive from.
pub fn resolve_account(value: &str) -> AccountId {
    let hex_part = value.strip_prefix("0x").unwrap_or(value);
    if hex_part.len() == 64 {
        if let Ok(id) = AccountId::from_hex(hex_part) {
            return id;
        }
    }
    AccountId::derive(value)
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn admin(&self) -> AccountId {
        resolve_account(&self.engine.admin)
    }

    pub fn engine_account(&self) -> AccountId {
        resolve_account(&self.engine.engine_account)
    }

    pub fn vault_account(&self) -> AccountId {
        resolve_account(&self.engine.vault_account)
    }

    pub fn weight_sources(&self) -> Vec<AccountId> {
        self.engine
            .weight_sources
            .iter()
            .map(|s| resolve_account(s))
            .collect()
    }

    pub fn source_account(&self) -> AccountId {
        resolve_account(&self.source.source_account)
    }

    pub fn reward_token(&self) -> TokenId {
        TokenId::derive(&self.source.reward_token)
    }

    pub fn rate_per_block(&self) -> anyhow::Result<Amount> {
        Ok(parse_amount(&self.source.rate_per_block)?)
    }

    pub fn initial_funding(&self) -> anyhow::Result<Amount> {
        Ok(parse_amount(&self.source.initial_funding)?)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ACCRUAL_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("ACCRUAL_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Accrual")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".accrual")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/accrual"))
}
