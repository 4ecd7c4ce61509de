/// Rule-set input: bounded file and stdin reading, then parsing.
///
/// The core library never touches the filesystem; the card configuration is
/// read here and handed over as a parsed value.
///
/// - Disk files: size checked via `std::fs::metadata` before any read.
/// - Stdin: read through `Read::take`, so allocation is bounded.
/// - UTF-8 is validated with the offset of the first bad byte reported.
/// - Every failure is a [`CliError`] with exit code 2.
use std::io::Read as _;
use std::path::Path;

use access_checkout_core::{CardConfiguration, parse_card_configuration};

use crate::cli::PathOrStdin;
use crate::error::CliError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Loads the rule set named by `--card-config`, or the built-in rules when
/// the flag is absent.
///
/// # Errors
///
/// Returns the read errors of [`read_input`], or [`CliError::ConfigInvalid`]
/// when the document does not parse.
pub fn load_card_configuration(
    source: Option<&PathOrStdin>,
    max_size: u64,
) -> Result<CardConfiguration, CliError> {
    let Some(source) = source else {
        tracing::debug!("using built-in card rules");
        return Ok(CardConfiguration::builtin());
    };
    let text = read_input(source, max_size)?;
    let config = parse_card_configuration(&text).map_err(|e| CliError::ConfigInvalid {
        source: source.to_string(),
        detail: e.to_string(),
    })?;
    tracing::debug!(source = %source, brands = config.brands.len(), "loaded card rules");
    Ok(config)
}

/// Reads the entire contents of `source` into a `String`.
///
/// # Errors
///
/// Returns [`CliError`] (exit code 2) when the source is missing,
/// unreadable, larger than `max_size`, or not UTF-8.
pub fn read_input(source: &PathOrStdin, max_size: u64) -> Result<String, CliError> {
    match source {
        PathOrStdin::Path(path) => read_file(path, max_size),
        PathOrStdin::Stdin => read_stdin(max_size),
    }
}

// ---------------------------------------------------------------------------
// Disk file reading
// ---------------------------------------------------------------------------

fn read_file(path: &Path, max_size: u64) -> Result<String, CliError> {
    let file_size = std::fs::metadata(path)
        .map_err(|e| io_error_to_cli(&e, path))?
        .len();
    if file_size > max_size {
        return Err(CliError::FileTooLarge {
            source: path.display().to_string(),
            limit: max_size,
            actual: Some(file_size),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| io_error_to_cli(&e, path))?;
    bytes_to_string(bytes, &path.display().to_string())
}

fn io_error_to_cli(e: &std::io::Error, path: &Path) -> CliError {
    let kind = e.kind();
    if kind == std::io::ErrorKind::NotFound {
        CliError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else if kind == std::io::ErrorKind::PermissionDenied {
        CliError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        CliError::IoError {
            source: path.display().to_string(),
            detail: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stdin reading
// ---------------------------------------------------------------------------

/// Reads stdin up to `max_size` bytes plus one probe byte, so that input of
/// exactly `max_size` bytes is accepted and anything longer is not.
fn read_stdin(max_size: u64) -> Result<String, CliError> {
    let mut buf: Vec<u8> = Vec::new();
    std::io::stdin()
        .lock()
        .take(max_size.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| CliError::StdinReadError {
            detail: e.to_string(),
        })?;

    if buf.len() as u64 > max_size {
        return Err(CliError::FileTooLarge {
            source: "-".to_owned(),
            limit: max_size,
            actual: None,
        });
    }
    bytes_to_string(buf, "-")
}

// ---------------------------------------------------------------------------
// UTF-8 conversion
// ---------------------------------------------------------------------------

fn bytes_to_string(bytes: Vec<u8>, source_label: &str) -> Result<String, CliError> {
    String::from_utf8(bytes).map_err(|e| CliError::InvalidUtf8 {
        source: source_label.to_owned(),
        byte_offset: e.utf8_error().valid_up_to(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
