//! Errors raised while constructing or parsing shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid token amount: {0}")]
    InvalidAmount(String),
}
