//! Discovery and session protocol client.
//!
//! The flow for one session request is strictly sequential: the
//! [`DiscoveryClient`] walks HAL links from the base URL to the service
//! endpoint, then the [`SessionRequestSender`] posts the payload there and
//! maps the response. The [`CardBinClient`] answers a separate question,
//! which card networks a PAN belongs to. All network access goes through
//! the [`HttpClient`] trait.

pub mod cache;
pub mod card_bin;
pub mod discovery;
pub mod hal;
pub mod http;
pub mod session;

pub use cache::DiscoveryCache;
pub use card_bin::{
    CardBinClient, CardBinRequest, CardBinResponse, CardBinService, CardBrandLookup, co_brands,
};
pub use discovery::{DiscoverLinks, DiscoveryClient};
pub use hal::{HalDocument, HalLink};
pub use http::{
    HttpClient, HttpRequest, HttpResponse, HttpTimeouts, Method, ReqwestHttpClient,
    TransportError,
};
pub use session::{
    CardSessionRequest, CvcSessionRequest, ExpiryDate, SessionRequest, SessionRequestSender,
    SessionResponse,
};

/// Generic HAL media type used for the root discovery document.
pub const HAL_MEDIA_TYPE: &str = "application/hal+json";

/// Media type of the verified-tokens service.
pub const VERIFIED_TOKENS_MEDIA_TYPE: &str = "application/vnd.worldpay.verified-tokens-v1.hal+json";

/// Media type of the sessions service.
pub const SESSIONS_MEDIA_TYPE: &str = "application/vnd.worldpay.sessions-v1.hal+json";

/// Header identifying this client to the server.
pub const SDK_HEADER: &str = "X-WP-SDK";

/// Value of [`SDK_HEADER`].
pub fn sdk_header_value() -> String {
    format!("access-checkout-rs/{}", crate::version())
}
