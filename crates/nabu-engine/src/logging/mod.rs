//! Logging setup.
//!
//! Library crates only use the `log` facade. Binaries and test harnesses call
//! [`init_logging`] once; guest output arrives under [`GUEST_LOG_TARGET`].

mod init;

pub use init::{GUEST_LOG_TARGET, LoggingConfig, init_logging};
