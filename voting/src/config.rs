//! Engine configuration with TOML file support.

use std::path::Path;

use crate::error::VotingError;
use crate::policy::PolicyConfig;
use qvote_types::Address;
use serde::{Deserialize, Serialize};

/// Configuration for one voting session.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Session owner: the only address allowed to open, close and finish.
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Custody account under which the engine holds staked tokens.
    #[serde(default = "default_engine_address")]
    pub engine_address: Address,

    /// Value of one whole token.
    #[serde(default = "default_token_price")]
    pub token_price: u64,

    #[serde(default = "default_token_name")]
    pub token_name: String,

    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Rule used to approve or reject proposals at close.
    #[serde(default)]
    pub policy: PolicyConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_owner() -> Address {
    Address::from_index(1)
}

fn default_engine_address() -> Address {
    Address::from_index(0xc0de)
}

fn default_token_price() -> u64 {
    300_000
}

fn default_token_name() -> String {
    "Stake Token".to_string()
}

fn default_token_symbol() -> String {
    "STK".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, VotingError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VotingError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, VotingError> {
        let config: Self = toml::from_str(s).map_err(|e| VotingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, VotingError> {
        toml::to_string_pretty(self).map_err(|e| VotingError::Config(e.to_string()))
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), VotingError> {
        if self.token_price == 0 {
            return Err(VotingError::Config("token_price must be non-zero".into()));
        }
        if self.owner.is_zero() || self.engine_address.is_zero() {
            return Err(VotingError::Config(
                "owner and engine_address must not be the zero address".into(),
            ));
        }
        if self.owner == self.engine_address {
            return Err(VotingError::Config(
                "engine_address must differ from owner".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            engine_address: default_engine_address(),
            token_price: default_token_price(),
            token_name: default_token_name(),
            token_symbol: default_token_symbol(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            policy: PolicyConfig::default(),
        }
    }
}
