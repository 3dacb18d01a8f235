//! # asl-cli
//!
//! Command-line interface to the system log.
//!
//! Provides commands for:
//! - Logging a line to the console facility (`consolelog`)
//! - Sending a record built from key/value pairs (`sendlog`)
//! - Searching the log with operator terms (`query`)
//!
//! Commands run against an [`asl_client::LocalFacility`], persisted to a
//! journal when `--store` (or `ASL_STORE`) is given.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, ConsolelogArgs, Format, QueryArgs, SendlogArgs};
pub use error::CliError;
pub use output::OutputFormat;
