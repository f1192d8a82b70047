//! Governance token ledger.
//!
//! The voting engine never depends on a concrete token. It talks to the
//! [`TokenLedger`] capability: mint, burn, transfer, allowance-gated
//! transfer-from, and balance/allowance queries. Supply is elastic: tokens are
//! minted when bought and burned when sold.
//!
//! [`TokenEngine`] is the in-memory reference implementation.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod token;

pub use engine::TokenEngine;
pub use error::TokenError;
pub use ledger::TokenLedger;
pub use token::TokenMetadata;
