//! Implementation of `access-checkout validate-pan <PAN>`.
//!
//! Validates a card number against the loaded rule set and reports the
//! detected brand. With `--accepted-brand`, a number of any other brand is
//! never complete.
//!
//! Exit codes: 0 = complete, 1 = partial or invalid, 2 = unusable rule set.
use access_checkout_core::{CardConfiguration, ValidationCoordinator};

use super::{FieldOutput, emit_field};
use crate::error::CliError;
use crate::format::{FormatMode, FormatterConfig};

/// Runs the `validate-pan` command.
///
/// # Errors
///
/// Returns [`CliError::InvalidCardDetails`] when the number is not complete.
pub fn run(
    config: CardConfiguration,
    pan: &str,
    accepted_brands: Vec<String>,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let restricted = !accepted_brands.is_empty();
    let coordinator = ValidationCoordinator::new(config).with_accepted_brands(accepted_brands);
    let (result, brand) = coordinator.validate_pan(pan);

    let brand_accepted = match brand.as_deref() {
        Some(name) if restricted => Some(coordinator.accepts(name)),
        Some(_) | None => None,
    };
    emit_field(
        &FieldOutput {
            field: "pan",
            result,
            brand: brand.as_deref(),
            brand_accepted,
            can_update: None,
        },
        mode,
        formatter,
    )
}
