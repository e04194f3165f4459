//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroauth hash [--config <path>]
//! - aeroauth verify --hash <phc> [--config <path>]
//! - aeroauth needs-rehash --hash <phc> [--config <path>]
//! - aeroauth check-config --config <path>
//!
//! Passwords are always read from stdin, never from argv.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroauth - password and configuration tooling
#[derive(Parser, Debug)]
#[command(name = "aeroauth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Hash a password read from stdin
    Hash {
        /// Path to configuration file (Argon2 cost parameters)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a password read from stdin against a stored hash
    Verify {
        /// Stored PHC hash
        #[arg(long)]
        hash: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Report whether a stored hash predates the configured cost
    NeedsRehash {
        /// Stored PHC hash
        #[arg(long)]
        hash: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroauth.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash() {
        let cli = Cli::try_parse_from(["aeroauth", "hash"]).unwrap();
        assert_eq!(cli.command, Command::Hash { config: None });
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "aeroauth",
            "verify",
            "--hash",
            "$argon2id$x",
            "--config",
            "auth.json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Verify {
                hash: "$argon2id$x".to_string(),
                config: Some(PathBuf::from("auth.json")),
            }
        );
    }

    #[test]
    fn test_verify_requires_hash() {
        assert!(Cli::try_parse_from(["aeroauth", "verify"]).is_err());
    }

    #[test]
    fn test_check_config_default_path() {
        let cli = Cli::try_parse_from(["aeroauth", "check-config"]).unwrap();
        assert_eq!(
            cli.command,
            Command::CheckConfig {
                config: PathBuf::from("./aeroauth.json"),
            }
        );
    }
}
