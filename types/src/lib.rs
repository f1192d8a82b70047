//! Fundamental types for the qvote engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, token amounts and the unit conventions that tie token
//! base units to whole tokens.

pub mod address;
pub mod amount;
pub mod error;

pub use address::Address;
pub use amount::{TokenAmount, TOKEN_DECIMALS, TOKEN_UNIT};
pub use error::TypesError;
