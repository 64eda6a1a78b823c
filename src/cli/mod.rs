//! Command-line interface components
//!
//! This module contains CLI-specific code for Param Fetcher, including
//! argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{parse_storage_size, Cli, Commands, GlobalArgs, ManifestArgs};
pub use commands::{handle_fetch, handle_verify, CommandContext};
pub use progress::BarProgress;
