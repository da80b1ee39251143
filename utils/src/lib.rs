//! Shared utilities for tokenchain.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
