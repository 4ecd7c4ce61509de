/// Output formatting: human-readable and JSON modes.
///
/// - **Human mode** (default): one aligned line per card field, tagged and
///   color-coded by result. Colors are disabled when `--no-color` is set, the
///   `NO_COLOR` environment variable is present (per <https://no-color.org>),
///   or stderr is not a TTY.
/// - **JSON mode**: one JSON object per command on stdout; errors as one JSON
///   object on stderr.
///
/// Results go to stdout and errors to stderr in both modes. The **quiet**
/// flag drops the human summary line.
use std::io::{IsTerminal as _, Write};

use access_checkout_core::{CheckoutError, SessionResponse, SessionType, ValidationReport, ValidationResult};
use serde::Serialize;

use crate::cli::OutputFormat;

// ---------------------------------------------------------------------------
// Color support detection
// ---------------------------------------------------------------------------

/// Returns `true` if ANSI color codes should be emitted.
pub fn colors_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

// ---------------------------------------------------------------------------
// ANSI escape sequences
// ---------------------------------------------------------------------------

const ANSI_RED: &str = "\x1b[31m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

// ---------------------------------------------------------------------------
// FormatterConfig
// ---------------------------------------------------------------------------

/// Configuration for the formatter, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    pub colors: bool,
    /// Drop the summary line in human mode.
    pub quiet: bool,
    pub verbose: bool,
}

impl FormatterConfig {
    /// Constructs a [`FormatterConfig`] from the raw CLI flags.
    pub fn from_flags(no_color_flag: bool, quiet: bool, verbose: bool) -> Self {
        Self {
            colors: colors_enabled(no_color_flag),
            quiet,
            verbose,
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colors {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_owned()
        }
    }
}

/// Output format selection, mirroring the CLI `--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Human,
    Json,
}

impl From<OutputFormat> for FormatMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => Self::Human,
            OutputFormat::Json => Self::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// Human-mode formatting
// ---------------------------------------------------------------------------

/// Tag and color for a field result: `[OK]` complete, `[..]` valid so far,
/// `[XX]` rejected.
fn result_tag(result: ValidationResult) -> (&'static str, &'static str) {
    if result.complete {
        ("[OK]", ANSI_GREEN)
    } else if result.partial {
        ("[..]", ANSI_YELLOW)
    } else {
        ("[XX]", ANSI_RED)
    }
}

/// Writes one field result.
///
/// Format: `[OK] pan     complete  (visa)`
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_field_human<W: Write>(
    writer: &mut W,
    label: &str,
    result: ValidationResult,
    note: Option<&str>,
    config: &FormatterConfig,
) -> std::io::Result<()> {
    let (tag, color) = result_tag(result);
    let tag = config.paint(color, tag);
    match note {
        Some(note) => writeln!(writer, "{tag} {label:<7} {result}  ({note})"),
        None => writeln!(writer, "{tag} {label:<7} {result}"),
    }
}

/// Writes every field of `report`, then a readiness summary unless quiet.
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_report_human<W: Write>(
    writer: &mut W,
    report: &ValidationReport,
    config: &FormatterConfig,
) -> std::io::Result<()> {
    let brand_note = match (&report.brand, report.brand_accepted) {
        (Some(brand), true) => Some(brand.clone()),
        (Some(brand), false) => Some(format!("{brand}, not accepted")),
        (None, _) => None,
    };
    write_field_human(writer, "pan", report.pan, brand_note.as_deref(), config)?;
    write_field_human(writer, "expiry", report.expiry, None, config)?;
    write_field_human(writer, "cvc", report.cvc, None, config)?;

    if config.quiet {
        return Ok(());
    }
    let incomplete = [report.pan, report.expiry, report.cvc]
        .iter()
        .filter(|r| !r.complete)
        .count();
    if incomplete == 0 {
        writeln!(writer, "ready to submit")
    } else {
        writeln!(
            writer,
            "{incomplete} {} incomplete",
            pluralize(incomplete, "field", "fields")
        )
    }
}

/// Writes a created session.
///
/// Format: `card  https://…/sessions/abc`
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_session_human<W: Write>(
    writer: &mut W,
    session_type: SessionType,
    session: &SessionResponse,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{session_type:<5} {}",
        session.session_reference
    )
}

/// Writes a [`CheckoutError`], listing server-reported field violations one
/// per line beneath it.
///
/// # Errors
///
/// Returns an error only if writing to `writer` fails.
pub fn write_checkout_error_human<W: Write>(
    writer: &mut W,
    error: &CheckoutError,
    config: &FormatterConfig,
) -> std::io::Result<()> {
    let tag = config.paint(ANSI_RED, "[E]");
    writeln!(writer, "{tag} {}  {error}", error.kind())?;
    if let CheckoutError::ClientValidation {
        validation_rules, ..
    } = error
    {
        for rule in validation_rules {
            writeln!(writer, "    {}  {}  {}", rule.name, rule.json_path, rule.message)?;
        }
    }
    if config.verbose {
        let mut cause = std::error::Error::source(error);
        while let Some(inner) = cause {
            writeln!(writer, "    caused by: {inner}")?;
            cause = inner.source();
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON-mode formatting
// ---------------------------------------------------------------------------

/// Writes `value` as a single JSON line.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json_line<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, value).map_err(std::io::Error::other)?;
    writeln!(writer)
}

/// Writes a [`CheckoutError`] as
/// `{"error":{"kind":…,"message":…,"retryable":…,"validationErrors":[…]}}`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_checkout_error_json<W: Write>(
    writer: &mut W,
    error: &CheckoutError,
) -> std::io::Result<()> {
    let mut body = serde_json::json!({
        "kind": error.kind(),
        "message": error.to_string(),
        "retryable": error.is_retryable(),
    });
    if let CheckoutError::ClientValidation {
        error: code,
        validation_rules,
        ..
    } = error
    {
        body["errorName"] = serde_json::json!(code);
        body["validationErrors"] = serde_json::json!(validation_rules);
    }
    write_json_line(writer, &serde_json::json!({ "error": body }))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Returns the singular or plural form of `word` depending on `count`.
fn pluralize<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
