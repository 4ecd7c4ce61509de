//! Implementation of `access-checkout validate-card`.
//!
//! Validates the card number, expiry date and CVC against one rule-set
//! snapshot and reports whether the details are ready to submit.
//!
//! Exit codes: 0 = ready, 1 = at least one field incomplete.
use access_checkout_core::{CardConfiguration, CardFields, ValidationCoordinator};

use crate::error::{CliError, stream_error};
use crate::format::{FormatMode, FormatterConfig, write_json_line, write_report_human};

/// Splits an expiry as typed (`MM/YY`, `MMYY`, or a prefix of either) into
/// month and year.
pub fn split_expiry(expiry: &str) -> (String, String) {
    let expiry = expiry.trim();
    match expiry.split_once('/') {
        Some((month, year)) => (month.to_owned(), year.to_owned()),
        None => {
            let cut = expiry
                .char_indices()
                .nth(2)
                .map_or(expiry.len(), |(index, _)| index);
            let (month, year) = expiry.split_at(cut);
            (month.to_owned(), year.to_owned())
        }
    }
}

/// Runs the `validate-card` command.
///
/// # Errors
///
/// Returns [`CliError::InvalidCardDetails`] when any field is incomplete.
pub fn run(
    config: CardConfiguration,
    fields: &CardFields,
    accepted_brands: Vec<String>,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let coordinator = ValidationCoordinator::new(config).with_accepted_brands(accepted_brands);
    let report = coordinator.validate_card(fields);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mode {
        FormatMode::Human => write_report_human(&mut out, &report, formatter),
        FormatMode::Json => write_json_line(&mut out, &report),
    }
    .map_err(|e| stream_error("stdout", &e))?;

    if report.is_ready() {
        Ok(())
    } else {
        Err(CliError::InvalidCardDetails)
    }
}
