//! Token-ledger errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient token balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: need {needed}, approved {approved}")]
    InsufficientAllowance { needed: u128, approved: u128 },

    #[error("arithmetic overflow in token supply")]
    Overflow,

    #[error("the zero address cannot hold tokens")]
    ZeroAddress,

    #[error("{0}")]
    Other(String),
}
