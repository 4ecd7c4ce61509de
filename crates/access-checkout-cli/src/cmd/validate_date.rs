//! Implementation of `access-checkout validate-date <MONTH> [YEAR]`.
//!
//! A date is complete when both fields are well formed and the last second
//! of the month has not passed. The output also reports whether the fields
//! may take more input.
//!
//! Exit codes: 0 = complete, 1 = partial, expired or invalid.
use access_checkout_core::{CardConfiguration, SystemClock, can_update_date, validate_date};

use super::{FieldOutput, emit_field};
use crate::error::CliError;
use crate::format::{FormatMode, FormatterConfig};

/// Runs the `validate-date` command against the system clock.
///
/// # Errors
///
/// Returns [`CliError::InvalidCardDetails`] when the date is not complete.
pub fn run(
    config: &CardConfiguration,
    month: &str,
    year: Option<&str>,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let result = validate_date(Some(month), year, config, &SystemClock);
    let can_update = can_update_date(Some(month), year, config);
    emit_field(
        &FieldOutput {
            field: "expiry",
            result,
            brand: None,
            brand_accepted: None,
            can_update: Some(can_update),
        },
        mode,
        formatter,
    )
}
