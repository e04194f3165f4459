//! CLI command implementations
//!
//! Each command reads from a `BufRead` and writes to a `Write` so the
//! same code backs the binary and the tests.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{AuthConfig, PasswordManager};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_password, write_json};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    init_logging();
    let cli = Cli::parse_args();
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_command(cli.command, &mut stdin.lock(), &mut stdout.lock())
}

/// Structured logs go to stderr so stdout stays machine-readable.
/// Filter with `RUST_LOG`, default `warn`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run the appropriate command based on CLI args
pub fn run_command<R: BufRead, W: Write>(cmd: Command, input: &mut R, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::Hash { config } => hash(config.as_deref(), input, out),
        Command::Verify { hash, config } => verify(&hash, config.as_deref(), input, out),
        Command::NeedsRehash { hash, config } => needs_rehash(&hash, config.as_deref(), out),
        Command::CheckConfig { config } => check_config(&config, out),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<AuthConfig> {
    match path {
        Some(path) => Ok(AuthConfig::load(path)?),
        None => Ok(AuthConfig::default()),
    }
}

fn password_manager(path: Option<&Path>) -> CliResult<PasswordManager> {
    let config = load_config(path)?;
    Ok(PasswordManager::new(&config.password)?)
}

/// Hash the password on stdin and print `{"hash": ...}`
pub fn hash<R: BufRead, W: Write>(
    config: Option<&Path>,
    input: &mut R,
    out: &mut W,
) -> CliResult<()> {
    let manager = password_manager(config)?;
    let password = read_password(input)?;
    let hash = manager.hash(&password)?;

    info!(event = "CLI_HASH", "password hashed");
    write_json(out, &json!({ "hash": hash }))
}

/// Verify the password on stdin and print `{"verified": ...}`.
///
/// A mismatch is also an error so scripts can rely on the exit code.
pub fn verify<R: BufRead, W: Write>(
    hash: &str,
    config: Option<&Path>,
    input: &mut R,
    out: &mut W,
) -> CliResult<()> {
    let manager = password_manager(config)?;
    let password = read_password(input)?;
    let verified = manager.verify(&password, hash);

    write_json(out, &json!({ "verified": verified }))?;
    if verified {
        Ok(())
    } else {
        Err(CliError::verification_failed())
    }
}

/// Print `{"needs_rehash": ...}` for a stored hash
pub fn needs_rehash<W: Write>(hash: &str, config: Option<&Path>, out: &mut W) -> CliResult<()> {
    let manager = password_manager(config)?;
    write_json(out, &json!({ "needs_rehash": manager.needs_rehash(hash) }))
}

/// Load, validate and echo the effective configuration
pub fn check_config<W: Write>(config: &Path, out: &mut W) -> CliResult<()> {
    let config = AuthConfig::load(config)?;
    PasswordManager::new(&config.password)?;
    write_json(out, &serde_json::to_value(&config)?)
}
