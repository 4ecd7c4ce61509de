//! Implementation of `access-checkout session`.
//!
//! Validates the supplied card details locally (unless `--no-validate`),
//! then exchanges them for one session reference per `--type`. Sessions are
//! printed to stdout; incomplete details are reported on stderr and nothing
//! is sent.
//!
//! Exit codes: 0 = every session created, 1 = incomplete details or a
//! refused request, 2 = bad arguments.
use std::collections::BTreeMap;

use access_checkout_core::{
    AccessCheckoutClient, CardConfiguration, CardDetails, CardFields, SessionResponse, SessionType,
    ValidationCoordinator, validate_cvv,
};
use serde::Serialize;

use super::discover::timeouts;
use super::validate_card::split_expiry;
use crate::cli::{ServiceArgs, SessionKind};
use crate::error::{CliError, stream_error};
use crate::format::{
    FormatMode, FormatterConfig, write_field_human, write_json_line, write_report_human,
    write_session_human,
};

/// Arguments of the `session` subcommand.
#[derive(Debug)]
pub struct SessionArgs {
    pub service: ServiceArgs,
    pub merchant_id: String,
    pub types: Vec<SessionKind>,
    pub pan: Option<String>,
    pub expiry: Option<String>,
    pub cvc: Option<String>,
    pub no_validate: bool,
}

impl SessionArgs {
    fn session_types(&self) -> Vec<SessionType> {
        self.types.iter().copied().map(SessionType::from).collect()
    }

    fn card_details(&self) -> CardDetails {
        let mut details = CardDetails::new();
        if let Some(pan) = &self.pan {
            details = details.pan(pan.as_str());
        }
        if let Some(expiry) = &self.expiry {
            details = details.expiry_date(expiry.as_str());
        }
        if let Some(cvc) = &self.cvc {
            details = details.cvc(cvc.as_str());
        }
        details
    }
}

#[derive(Debug, Serialize)]
struct SessionsOutput<'a> {
    sessions: &'a BTreeMap<SessionType, SessionResponse>,
}

/// Runs the `session` command.
///
/// # Errors
///
/// - [`CliError::InvalidCardDetails`] when local validation fails.
/// - [`CliError::InvalidArgument`] for an unusable base URL, merchant id or
///   expiry date.
/// - [`CliError::SessionFailed`] when the service refuses or cannot be reached.
pub async fn run(
    args: SessionArgs,
    config: CardConfiguration,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let session_types = args.session_types();
    if !args.no_validate {
        check_details(&args, &session_types, config, mode, formatter)?;
    }

    let client = AccessCheckoutClient::builder()
        .base_url(args.service.base_url.as_str())
        .merchant_id(args.merchant_id.as_str())
        .timeouts(timeouts(&args.service))
        .build()?;
    let sessions = client
        .generate_sessions(&session_types, &args.card_details())
        .await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mode {
        FormatMode::Human => sessions
            .iter()
            .try_for_each(|(&session_type, session)| {
                write_session_human(&mut out, session_type, session)
            }),
        FormatMode::Json => write_json_line(
            &mut out,
            &SessionsOutput {
                sessions: &sessions,
            },
        ),
    }
    .map_err(|e| stream_error("stdout", &e))
}

/// Validates the fields the requested sessions need, reporting on stderr.
fn check_details(
    args: &SessionArgs,
    session_types: &[SessionType],
    config: CardConfiguration,
    mode: FormatMode,
    formatter: &FormatterConfig,
) -> Result<(), CliError> {
    let pan = args.pan.as_deref().unwrap_or_default();
    let cvc = args.cvc.as_deref().unwrap_or_default();
    let stderr = std::io::stderr();
    let mut err = stderr.lock();

    let ready = if session_types.contains(&SessionType::Card) {
        let (month, year) = split_expiry(args.expiry.as_deref().unwrap_or_default());
        let fields = CardFields {
            pan: pan.to_owned(),
            expiry_month: month,
            expiry_year: year,
            cvc: cvc.to_owned(),
        };
        let report = ValidationCoordinator::new(config).validate_card(&fields);
        if !report.is_ready() {
            match mode {
                FormatMode::Human => write_report_human(&mut err, &report, formatter),
                FormatMode::Json => write_json_line(&mut err, &report),
            }
            .map_err(|e| stream_error("stderr", &e))?;
        }
        report.is_ready()
    } else {
        let pan = Some(pan).filter(|p| !p.is_empty());
        let (result, _) = validate_cvv(cvc, pan, &config);
        if !result.complete {
            match mode {
                FormatMode::Human => write_field_human(&mut err, "cvc", result, None, formatter),
                FormatMode::Json => write_json_line(&mut err, &result),
            }
            .map_err(|e| stream_error("stderr", &e))?;
        }
        result.complete
    };

    if ready {
        Ok(())
    } else {
        Err(CliError::InvalidCardDetails)
    }
}
