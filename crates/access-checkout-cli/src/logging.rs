//! Tracing subscriber setup.
//!
//! Logs go to stderr so that stdout carries only command results.

use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Filter used when neither `--log-filter` nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "warn";

const VERBOSE_FILTER: &str = "warn,access_checkout_core=debug,access_checkout_cli=debug";

/// Picks the filter directives: an explicit filter wins, then `--verbose`,
/// then `--quiet`, then [`DEFAULT_FILTER`].
pub fn filter_directives(explicit: Option<&str>, verbose: bool, quiet: bool) -> &str {
    match explicit {
        Some(filter) if !filter.trim().is_empty() => filter,
        Some(_) | None if verbose => VERBOSE_FILTER,
        Some(_) | None if quiet => "error",
        Some(_) | None => DEFAULT_FILTER,
    }
}

/// Installs the global `fmt` subscriber.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] when the filter does not parse.
pub fn init(directives: &str, colors: bool) -> Result<(), CliError> {
    let filter = EnvFilter::try_new(directives).map_err(|e| CliError::InvalidArgument {
        detail: format!("invalid log filter '{directives}': {e}"),
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(colors)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::InvalidArgument {
            detail: format!("cannot install logger: {e}"),
        })
}
