/// Error taxonomy for discovery and session submission.
///
/// [`CheckoutError`] is the single error type returned by the network-facing
/// parts of the crate. Validators never fail and have no error type.
///
/// Server error codes arrive as strings. [`RequestError`] and
/// [`ValidationRuleName`] map the known ones to variants and degrade unknown
/// codes to a sentinel, so a new server code never turns into a
/// deserialization failure.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Boxed cause attached to transport and discovery failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message used when a transport failure carries no message of its own.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "An exception was thrown when trying to establish a connection";

/// Message for every failure while resolving a service endpoint.
pub const DISCOVERY_FAILED_MESSAGE: &str =
    "An error was thrown when trying to make a connection to the service";

/// Message for a 5xx response that does not explain itself.
pub const SERVER_ERROR_MESSAGE: &str = "The server failed to process the request";

// ---------------------------------------------------------------------------
// CheckoutError
// ---------------------------------------------------------------------------

/// Every failure a discovery or session request can produce.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// An endpoint could not be resolved. Always retryable by the caller.
    #[error("{message}")]
    Discovery {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The server rejected the request content (4xx with a structured body).
    #[error("{error}: {message}")]
    ClientValidation {
        error: RequestError,
        message: String,
        validation_rules: Vec<ValidationRule>,
    },

    /// The exchange failed below the API level: connection failure, timeout,
    /// malformed redirect, or a 4xx without a readable body.
    #[error("{message}")]
    HttpTransport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The server failed (5xx).
    #[error("{message}")]
    Server { message: String },

    /// A success response could not be interpreted.
    #[error("{message}")]
    Deserialization { message: String },

    /// The client, a rule set, or the supplied card details are unusable.
    #[error("{message}")]
    Configuration { message: String },
}

impl CheckoutError {
    pub fn discovery(source: impl Into<BoxError>) -> Self {
        Self::Discovery {
            message: DISCOVERY_FAILED_MESSAGE.to_owned(),
            source: Some(source.into()),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::HttpTransport {
            message: message.into(),
            source: None,
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Client validation failures need different input, and deserialization
    /// or configuration failures will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Discovery { .. } | Self::HttpTransport { .. } | Self::Server { .. } => true,
            Self::ClientValidation { .. }
            | Self::Deserialization { .. }
            | Self::Configuration { .. } => false,
        }
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "discovery",
            Self::ClientValidation { .. } => "client_validation",
            Self::HttpTransport { .. } => "http_transport",
            Self::Server { .. } => "server",
            Self::Deserialization { .. } => "deserialization",
            Self::Configuration { .. } => "configuration",
        }
    }
}

// ---------------------------------------------------------------------------
// RequestError
// ---------------------------------------------------------------------------

/// Top-level error code of a rejected request, with its HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum RequestError {
    BodyIsNotJson,
    BodyIsEmpty,
    BodyDoesNotMatchSchema,
    ResourceNotFound,
    EndpointNotFound,
    MethodNotAllowed,
    UnsupportedAcceptHeader,
    UnsupportedContentType,
    InternalErrorOccurred,
    /// Any code this client does not know.
    UnknownError,
}

impl RequestError {
    const ALL: [Self; 10] = [
        Self::BodyIsNotJson,
        Self::BodyIsEmpty,
        Self::BodyDoesNotMatchSchema,
        Self::ResourceNotFound,
        Self::EndpointNotFound,
        Self::MethodNotAllowed,
        Self::UnsupportedAcceptHeader,
        Self::UnsupportedContentType,
        Self::InternalErrorOccurred,
        Self::UnknownError,
    ];

    /// Wire name, e.g. `bodyDoesNotMatchSchema`.
    pub fn name(self) -> &'static str {
        match self {
            Self::BodyIsNotJson => "bodyIsNotJson",
            Self::BodyIsEmpty => "bodyIsEmpty",
            Self::BodyDoesNotMatchSchema => "bodyDoesNotMatchSchema",
            Self::ResourceNotFound => "resourceNotFound",
            Self::EndpointNotFound => "endpointNotFound",
            Self::MethodNotAllowed => "methodNotAllowed",
            Self::UnsupportedAcceptHeader => "unsupportedAcceptHeader",
            Self::UnsupportedContentType => "unsupportedContentType",
            Self::InternalErrorOccurred => "internalErrorOccurred",
            Self::UnknownError => "unknownError",
        }
    }

    /// HTTP status the server uses for this code.
    pub fn status(self) -> u16 {
        match self {
            Self::BodyIsNotJson | Self::BodyIsEmpty | Self::BodyDoesNotMatchSchema => 400,
            Self::ResourceNotFound | Self::EndpointNotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::UnsupportedAcceptHeader => 406,
            Self::UnsupportedContentType => 415,
            Self::InternalErrorOccurred | Self::UnknownError => 500,
        }
    }

    /// Maps a wire name to a variant; unknown names give
    /// [`RequestError::UnknownError`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == name)
            .unwrap_or(Self::UnknownError)
    }
}

impl From<String> for RequestError {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<RequestError> for &'static str {
    fn from(error: RequestError) -> Self {
        error.name()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ValidationRuleName / ValidationRule
// ---------------------------------------------------------------------------

/// Code of a single field-level violation reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ValidationRuleName {
    UnrecognizedField,
    FieldHasInvalidValue,
    PanFailedLuhnCheck,
    FieldIsMissing,
    StringIsTooShort,
    StringIsTooLong,
    FieldMustBeInteger,
    IntegerIsTooSmall,
    IntegerIsTooLarge,
    FieldMustBeNumber,
    FieldMustBeString,
    FieldMustBeBoolean,
    FieldMustBeObject,
    FieldMustBeArray,
    FieldIsNull,
    FieldIsEmpty,
    FieldIsNotAllowed,
    NumberIsTooSmall,
    NumberIsTooLarge,
    StringFailedRegexCheck,
    DateHasInvalidFormat,
    /// Any code this client does not know.
    Unknown,
}

impl ValidationRuleName {
    const ALL: [Self; 22] = [
        Self::UnrecognizedField,
        Self::FieldHasInvalidValue,
        Self::PanFailedLuhnCheck,
        Self::FieldIsMissing,
        Self::StringIsTooShort,
        Self::StringIsTooLong,
        Self::FieldMustBeInteger,
        Self::IntegerIsTooSmall,
        Self::IntegerIsTooLarge,
        Self::FieldMustBeNumber,
        Self::FieldMustBeString,
        Self::FieldMustBeBoolean,
        Self::FieldMustBeObject,
        Self::FieldMustBeArray,
        Self::FieldIsNull,
        Self::FieldIsEmpty,
        Self::FieldIsNotAllowed,
        Self::NumberIsTooSmall,
        Self::NumberIsTooLarge,
        Self::StringFailedRegexCheck,
        Self::DateHasInvalidFormat,
        Self::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::UnrecognizedField => "unrecognizedField",
            Self::FieldHasInvalidValue => "fieldHasInvalidValue",
            Self::PanFailedLuhnCheck => "panFailedLuhnCheck",
            Self::FieldIsMissing => "fieldIsMissing",
            Self::StringIsTooShort => "stringIsTooShort",
            Self::StringIsTooLong => "stringIsTooLong",
            Self::FieldMustBeInteger => "fieldMustBeInteger",
            Self::IntegerIsTooSmall => "integerIsTooSmall",
            Self::IntegerIsTooLarge => "integerIsTooLarge",
            Self::FieldMustBeNumber => "fieldMustBeNumber",
            Self::FieldMustBeString => "fieldMustBeString",
            Self::FieldMustBeBoolean => "fieldMustBeBoolean",
            Self::FieldMustBeObject => "fieldMustBeObject",
            Self::FieldMustBeArray => "fieldMustBeArray",
            Self::FieldIsNull => "fieldIsNull",
            Self::FieldIsEmpty => "fieldIsEmpty",
            Self::FieldIsNotAllowed => "fieldIsNotAllowed",
            Self::NumberIsTooSmall => "numberIsTooSmall",
            Self::NumberIsTooLarge => "numberIsTooLarge",
            Self::StringFailedRegexCheck => "stringFailedRegexCheck",
            Self::DateHasInvalidFormat => "dateHasInvalidFormat",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a wire name to a variant; unknown names give
    /// [`ValidationRuleName::Unknown`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == name)
            .unwrap_or(Self::Unknown)
    }
}

impl From<String> for ValidationRuleName {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ValidationRuleName> for &'static str {
    fn from(rule: ValidationRuleName) -> Self {
        rule.name()
    }
}

impl fmt::Display for ValidationRuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field-level violation echoed back by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(rename = "errorName")]
    pub name: ValidationRuleName,
    #[serde(default)]
    pub message: String,
    /// JSON path of the offending field, e.g. `$.cardNumber`.
    #[serde(default)]
    pub json_path: String,
}
