//! Shared utilities for qvote.

pub mod format;
pub mod logging;

pub use format::{format_tokens, group_digits};
pub use logging::{init_logging, init_tracing, LogFormat, LoggingError};
