/// CLI error types with associated exit codes.
///
/// [`CliError`] is the top-level error type for the `access-checkout` binary.
/// Every variant maps to a stable exit code (1 or 2) via
/// [`CliError::exit_code`]:
///
/// - Exit code **2**: input failure. A file could not be read, the rule set
///   does not parse, or an argument is unusable. Nothing was validated or
///   sent.
/// - Exit code **1**: logical failure. The tool ran, but the card details are
///   not complete or the service refused to create a session.
use std::fmt;
use std::path::PathBuf;

use access_checkout_core::CheckoutError;

// ---------------------------------------------------------------------------
// CliError
// ---------------------------------------------------------------------------

/// All error conditions that the `access-checkout` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    // --- Exit code 2: input failures ---
    /// A file argument could not be found on the filesystem.
    FileNotFound { path: PathBuf },

    /// The process lacks permission to read a file.
    PermissionDenied { path: PathBuf },

    /// The input exceeds the configured `--max-file-size` limit.
    FileTooLarge {
        /// `"-"` for stdin, or the filesystem path.
        source: String,
        limit: u64,
        /// Known for disk files only.
        actual: Option<u64>,
    },

    /// The input bytes are not valid UTF-8.
    InvalidUtf8 { source: String, byte_offset: usize },

    StdinReadError { detail: String },

    IoError { source: String, detail: String },

    /// The card rule set could not be parsed.
    ConfigInvalid { source: String, detail: String },

    /// An argument was accepted by the parser but cannot be used, such as a
    /// malformed base URL, expiry date or log filter.
    InvalidArgument { detail: String },

    // --- Exit code 1: logical failures ---
    /// One or more card fields are not complete.
    ///
    /// The field results have already been printed.
    InvalidCardDetails,

    /// Discovery or session creation failed.
    SessionFailed(CheckoutError),
}

impl CliError {
    /// Returns the process exit code for this error.
    ///
    /// - `2`: input failure (file not found, bad rule set, bad argument).
    /// - `1`: logical failure (incomplete card details, refused session).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidUtf8 { .. }
            | Self::StdinReadError { .. }
            | Self::IoError { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidArgument { .. } => 2,

            Self::InvalidCardDetails | Self::SessionFailed(_) => 1,
        }
    }

    /// Returns a human-readable error message suitable for printing to stderr.
    pub fn message(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!("error: file not found: {}", path.display())
            }
            Self::PermissionDenied { path } => {
                format!("error: permission denied: {}", path.display())
            }
            Self::FileTooLarge {
                source,
                limit,
                actual: Some(actual),
            } => {
                format!("error: file too large: {source} is {actual} bytes, limit is {limit} bytes")
            }
            Self::FileTooLarge {
                source,
                limit,
                actual: None,
            } => {
                format!("error: file too large: {source} exceeded limit of {limit} bytes")
            }
            Self::InvalidUtf8 {
                source,
                byte_offset,
            } => {
                format!(
                    "error: invalid UTF-8 in {source}: first invalid byte at offset {byte_offset}"
                )
            }
            Self::StdinReadError { detail } => {
                format!("error: failed to read stdin: {detail}")
            }
            Self::IoError { source, detail } => {
                format!("error: I/O error on {source}: {detail}")
            }
            Self::ConfigInvalid { source, detail } => {
                format!("error: invalid card configuration in {source}: {detail}")
            }
            Self::InvalidArgument { detail } => format!("error: {detail}"),
            Self::InvalidCardDetails => "error: card details are not complete".to_owned(),
            Self::SessionFailed(e) => format!("error: {} failure: {e}", e.kind()),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SessionFailed(e) => Some(e),
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidUtf8 { .. }
            | Self::StdinReadError { .. }
            | Self::IoError { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidCardDetails => None,
        }
    }
}

/// Client configuration problems are the caller's input; everything else
/// happened while talking to the service.
impl From<CheckoutError> for CliError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Configuration { message } => Self::InvalidArgument { detail: message },
            other @ (CheckoutError::Discovery { .. }
            | CheckoutError::ClientValidation { .. }
            | CheckoutError::HttpTransport { .. }
            | CheckoutError::Server { .. }
            | CheckoutError::Deserialization { .. }) => Self::SessionFailed(other),
        }
    }
}

/// Wraps a write failure on one of the standard streams.
pub fn stream_error(stream: &str, e: &std::io::Error) -> CliError {
    CliError::IoError {
        source: stream.to_owned(),
        detail: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
