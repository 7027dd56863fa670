//! Logging utilities.
//!
//! The bridge reports through the `log` facade only. Embedders that already own a
//! logger skip `init_logging`; standalone tools call it once at startup.

mod init;

pub use init::{init_logging, LoggingConfig};
