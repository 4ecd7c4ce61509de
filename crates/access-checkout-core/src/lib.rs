#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod client;
pub mod error;
pub mod luhn;
pub mod rules;
pub mod rules_parse;
pub mod validation;

pub use api::{
    CardBinClient, CardBinRequest, CardBinResponse, CardBinService, CardBrandLookup,
    CardSessionRequest, CvcSessionRequest, DiscoverLinks, DiscoveryCache, DiscoveryClient,
    ExpiryDate, HalDocument, HalLink, HttpClient, HttpRequest, HttpResponse, HttpTimeouts, Method,
    ReqwestHttpClient, SessionRequest, SessionRequestSender, SessionResponse, TransportError,
};
pub use client::{
    AccessCheckoutClient, AccessCheckoutClientBuilder, CardDetails, SessionType, parse_expiry_date,
};
pub use error::{CheckoutError, RequestError, ValidationRule, ValidationRuleName};
pub use luhn::luhn_valid;
pub use rules::{
    CardBrand, CardBrandImage, CardConfiguration, CardDefaults, CardValidationRule, RuleError,
};
pub use rules_parse::{
    CardConfigurationError, parse_card_configuration, parse_card_configuration_or_builtin,
};
pub use validation::{
    BrandMatch, CardFields, Clock, SystemClock, ValidationCoordinator, ValidationReport,
    ValidationResult, apply_rule, can_update_date, resolve_brand, validate_cvv, validate_date,
    validate_pan,
};

/// Returns the current version of the access-checkout-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
