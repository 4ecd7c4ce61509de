/// Command module for the `access-checkout` CLI.
///
/// Each submodule implements one subcommand. The `run` function in each
/// module takes the parsed arguments and returns `Ok(())` on success or
/// a [`crate::error::CliError`] on failure.
pub mod card_brands;
pub mod discover;
pub mod session;
pub mod validate_card;
pub mod validate_cvv;
pub mod validate_date;
pub mod validate_pan;

use access_checkout_core::ValidationResult;
use serde::Serialize;

use crate::error::{CliError, stream_error};
use crate::format::{FormatMode, FormatterConfig, write_field_human, write_json_line};

/// JSON shape of a single-field validation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOutput<'a> {
    pub field: &'static str,
    #[serde(flatten)]
    pub result: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_accepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_update: Option<bool>,
}

impl FieldOutput<'_> {
    fn note(&self) -> Option<String> {
        match (self.brand, self.brand_accepted) {
            (Some(brand), Some(false)) => Some(format!("{brand}, not accepted")),
            (Some(brand), Some(true) | None) => Some(brand.to_owned()),
            (None, _) => None,
        }
    }
}

/// Prints `output` to stdout and turns an incomplete field into
/// [`CliError::InvalidCardDetails`].
fn emit_field(
    output: &FieldOutput<'_>,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mode {
        FormatMode::Human => {
            let note = output.note();
            write_field_human(&mut out, output.field, output.result, note.as_deref(), formatter)
        }
        FormatMode::Json => write_json_line(&mut out, output),
    }
    .map_err(|e| stream_error("stdout", &e))?;

    if output.result.complete {
        Ok(())
    } else {
        Err(CliError::InvalidCardDetails)
    }
}
