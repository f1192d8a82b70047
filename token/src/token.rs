//! Token metadata.

use qvote_types::TOKEN_DECIMALS;
use serde::{Deserialize, Serialize};

/// Descriptive data for a token ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: TOKEN_DECIMALS,
        }
    }
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self::new("Stake Token", "STK")
    }
}
