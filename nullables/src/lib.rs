//! Nullable infrastructure for deterministic testing.
//!
//! The voting engine reaches the outside world through two capabilities: the
//! token ledger and the proposal executor. This crate provides test-friendly
//! implementations of both that:
//! - Record every call for later inspection
//! - Fail on demand, at a chosen call
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod executor;
pub mod ledger;

pub use executor::NullExecutor;
pub use ledger::FlakyLedger;
