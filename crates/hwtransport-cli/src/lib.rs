//! hwt CLI library
//!
//! Argument parsing, configuration loading and command handlers for the `hwt`
//! binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::{apply_overrides, load_configuration};
pub use error::{CliError, Result};
