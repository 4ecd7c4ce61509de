//! Implementation of `access-checkout validate-cvv <CVV> [--pan <PAN>]`.
//!
//! With `--pan`, the CVC rule of the brand detected from the number applies;
//! otherwise the default CVC rule does.
//!
//! Exit codes: 0 = complete, 1 = partial or invalid, 2 = unusable rule set.
use access_checkout_core::{CardConfiguration, validate_cvv};

use super::{FieldOutput, emit_field};
use crate::error::CliError;
use crate::format::{FormatMode, FormatterConfig};

/// Runs the `validate-cvv` command.
///
/// # Errors
///
/// Returns [`CliError::InvalidCardDetails`] when the code is not complete.
pub fn run(
    config: &CardConfiguration,
    cvv: &str,
    pan: Option<&str>,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let (result, brand) = validate_cvv(cvv, pan, config);
    emit_field(
        &FieldOutput {
            field: "cvc",
            result,
            brand: brand.map(|b| b.name()),
            brand_accepted: None,
            can_update: None,
        },
        mode,
        formatter,
    )
}
