//! CLI module for aeroauth
//!
//! Provides command-line tooling for:
//! - hash: Produce a stored hash for seeding a user store
//! - verify: Check a password against a stored hash
//! - needs-rehash: Detect hashes made with outdated cost settings
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, hash, needs_rehash, run, run_command, verify};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_password, write_json};
