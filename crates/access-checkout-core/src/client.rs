//! Caller-facing session client.
//!
//! [`AccessCheckoutClient`] ties a base URL and merchant identity to a
//! [`SessionRequestSender`] and turns [`CardDetails`] into session requests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

use crate::api::discovery::parse_base_url;
use crate::api::{
    CardBinClient, CardBinService, CardSessionRequest, CvcSessionRequest, DiscoverLinks,
    DiscoveryCache, ExpiryDate, HttpClient, HttpTimeouts, ReqwestHttpClient, SessionRequest,
    SessionRequestSender, SessionResponse,
};
use crate::error::CheckoutError;
use crate::validation::date::inflate_year;
use crate::validation::{Clock, SystemClock};

/// Kind of session to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Full card details, exchanged through the verified-tokens service.
    Card,
    /// CVC only, exchanged through the sessions service.
    Cvc,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cvc => "cvc",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Raw card details as entered by the user.
///
/// Fields are optional; which ones are required depends on the session type.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pan: Option<String>,
    expiry_date: Option<String>,
    cvc: Option<String>,
}

impl CardDetails {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pan(mut self, pan: impl Into<String>) -> Self {
        self.pan = Some(pan.into());
        self
    }

    /// Sets the expiry date, written `MM/YY` or `MMYY`.
    #[must_use]
    pub fn expiry_date(mut self, expiry_date: impl Into<String>) -> Self {
        self.expiry_date = Some(expiry_date.into());
        self
    }

    #[must_use]
    pub fn cvc(mut self, cvc: impl Into<String>) -> Self {
        self.cvc = Some(cvc.into());
        self
    }
}

// Card data stays out of logs and panic messages.
impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("pan", &self.pan.as_ref().map(|_| "<redacted>"))
            .field("expiry_date", &self.expiry_date)
            .field("cvc", &self.cvc.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn required<'a>(value: Option<&'a String>, what: &str) -> Result<&'a str, CheckoutError> {
    value
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CheckoutError::configuration(format!("Expected {what} to be provided")))
}

/// Parses `MM/YY` or `MMYY` into a month and a four-digit year.
///
/// # Errors
///
/// Returns [`CheckoutError::Configuration`] for any other shape or for a
/// month outside 1–12.
pub fn parse_expiry_date(value: &str, clock: &dyn Clock) -> Result<ExpiryDate, CheckoutError> {
    let invalid = || {
        CheckoutError::configuration(format!(
            "Expected expiry date in format MM/YY or MMYY but found {value}"
        ))
    };
    let compact: String = value.trim().chars().filter(|c| *c != '/').collect();
    let slashes = value.matches('/').count();
    if compact.len() != 4 || !compact.bytes().all(|b| b.is_ascii_digit()) || slashes > 1 {
        return Err(invalid());
    }
    let (month, year) = compact.split_at(2);
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    let year = inflate_year(year, clock.now())
        .and_then(|y| u32::try_from(y).ok())
        .ok_or_else(invalid)?;
    Ok(ExpiryDate { month, year })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Creates sessions against one service instance for one merchant.
pub struct AccessCheckoutClient {
    base_url: String,
    merchant_id: String,
    sender: SessionRequestSender,
    cache: Arc<DiscoveryCache>,
    card_bin: Arc<CardBinClient>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AccessCheckoutClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCheckoutClient")
            .field("base_url", &self.base_url)
            .field("merchant_id", &self.merchant_id)
            .finish_non_exhaustive()
    }
}

impl AccessCheckoutClient {
    pub fn builder() -> AccessCheckoutClientBuilder {
        AccessCheckoutClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// Co-brand lookup for this merchant. Services from the same client
    /// share one BIN cache.
    pub fn card_bin_service(&self) -> CardBinService {
        CardBinService::new(Arc::clone(&self.card_bin), self.merchant_id.clone())
    }

    /// Resolves the endpoint at the end of `links` from the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Discovery`] when any hop fails.
    pub async fn discover(&self, links: &DiscoverLinks) -> Result<Url, CheckoutError> {
        self.sender.discovery().discover(&self.base_url, links).await
    }

    /// Builds the request body for `session_type` from `details`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Configuration`] when a field the session type
    /// needs is missing or malformed.
    pub fn session_request(
        &self,
        session_type: SessionType,
        details: &CardDetails,
    ) -> Result<SessionRequest, CheckoutError> {
        let identity = self.merchant_id.clone();
        match session_type {
            SessionType::Card => {
                let pan = required(details.pan.as_ref(), "card number")?;
                let expiry = required(details.expiry_date.as_ref(), "expiry date")?;
                let cvc = required(details.cvc.as_ref(), "cvc")?;
                Ok(SessionRequest::Card(CardSessionRequest {
                    card_number: pan.to_owned(),
                    card_expiry_date: parse_expiry_date(expiry, self.clock.as_ref())?,
                    cvc: cvc.to_owned(),
                    identity,
                }))
            }
            SessionType::Cvc => {
                let cvc = required(details.cvc.as_ref(), "cvc")?;
                Ok(SessionRequest::Cvc(CvcSessionRequest {
                    cvc: cvc.to_owned(),
                    identity,
                }))
            }
        }
    }

    /// Creates one session.
    ///
    /// # Errors
    ///
    /// Returns the [`CheckoutError`] of the first failing step. Missing card
    /// fields fail before any network access.
    pub async fn generate_session(
        &self,
        session_type: SessionType,
        details: &CardDetails,
    ) -> Result<SessionResponse, CheckoutError> {
        let request = self.session_request(session_type, details)?;
        tracing::debug!(%session_type, "generating session");
        self.sender.send(&request, &self.base_url).await
    }

    /// Creates a session for each requested type, one after another.
    ///
    /// Repeated types are created once. Every request is built before the
    /// first one is sent, so a missing field never leaves a half-finished
    /// batch behind.
    ///
    /// # Errors
    ///
    /// Returns the first error; sessions created before it are discarded.
    pub async fn generate_sessions(
        &self,
        session_types: &[SessionType],
        details: &CardDetails,
    ) -> Result<BTreeMap<SessionType, SessionResponse>, CheckoutError> {
        let mut requests = BTreeMap::new();
        for &session_type in session_types {
            if !requests.contains_key(&session_type) {
                requests.insert(session_type, self.session_request(session_type, details)?);
            }
        }

        let mut sessions = BTreeMap::new();
        for (session_type, request) in requests {
            tracing::debug!(%session_type, "generating session");
            let response = self.sender.send(&request, &self.base_url).await?;
            sessions.insert(session_type, response);
        }
        Ok(sessions)
    }

    /// Runs [`generate_session`](Self::generate_session) on the tokio
    /// runtime and hands the outcome to `callback` exactly once.
    pub fn spawn_generate_session<F>(
        self: &Arc<Self>,
        session_type: SessionType,
        details: CardDetails,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<SessionResponse, CheckoutError>) + Send + 'static,
    {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = client.generate_session(session_type, &details).await;
            callback(outcome);
        })
    }

    /// Callback form of [`generate_sessions`](Self::generate_sessions).
    pub fn spawn_generate_sessions<F>(
        self: &Arc<Self>,
        session_types: Vec<SessionType>,
        details: CardDetails,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<BTreeMap<SessionType, SessionResponse>, CheckoutError>) + Send + 'static,
    {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = client.generate_sessions(&session_types, &details).await;
            callback(outcome);
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures an [`AccessCheckoutClient`].
#[derive(Default)]
pub struct AccessCheckoutClientBuilder {
    base_url: Option<String>,
    merchant_id: Option<String>,
    http: Option<Arc<dyn HttpClient>>,
    cache: Option<Arc<DiscoveryCache>>,
    clock: Option<Arc<dyn Clock>>,
    timeouts: HttpTimeouts,
}

impl AccessCheckoutClientBuilder {
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Replaces the default `reqwest` transport. Timeouts are then the
    /// transport's own business.
    #[must_use]
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Shares a discovery cache with other clients.
    #[must_use]
    pub fn discovery_cache(mut self, cache: Arc<DiscoveryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: HttpTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Clock used to expand two-digit expiry years.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    ///
    /// Returns [`CheckoutError::Configuration`] when the base URL or merchant
    /// id is missing or blank, when the base URL does not parse, or when the
    /// default transport cannot be built.
    pub fn build(self) -> Result<AccessCheckoutClient, CheckoutError> {
        let base_url = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CheckoutError::configuration("Expected base url to be provided"))?;
        parse_base_url(&base_url)
            .map_err(|_| CheckoutError::configuration(format!("Invalid base url: {base_url}")))?;
        let merchant_id = self
            .merchant_id
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| CheckoutError::configuration("Expected merchant ID to be provided"))?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(self.timeouts)?),
        };
        let cache = self.cache.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let card_bin = Arc::new(CardBinClient::new(Arc::clone(&http), &base_url)?);
        Ok(AccessCheckoutClient {
            base_url,
            merchant_id,
            sender: SessionRequestSender::new(http, Arc::clone(&cache)),
            cache,
            card_bin,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use chrono::{DateTime, TimeZone, Utc};
    use reqwest::StatusCode;

    use super::*;
    use crate::api::http::{Method, MockHttpClient};
    use crate::api::{HttpRequest, HttpResponse};

    const BASE: &str = "https://try.example.com/";

    fn fixed_clock() -> Arc<dyn Clock> {
        let now: DateTime<Utc> = Utc
            .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .single()
            .expect("valid instant");
        Arc::new(now)
    }

    /// Serves both discovery trees and answers every POST with a session
    /// named after the path it was posted to.
    fn service_response(request: &HttpRequest) -> HttpResponse {
        let body = match (request.method, request.url.path()) {
            (Method::Get, "/") => {
                r#"{"_links":{
                    "service:verifiedTokens":{"href":"https://try.example.com/verifiedTokens"},
                    "service:sessions":{"href":"https://try.example.com/sessions"}}}"#
                    .to_owned()
            }
            (Method::Get, "/verifiedTokens") => {
                r#"{"_links":{"verifiedTokens:sessions":{"href":"https://try.example.com/verifiedTokens/sessions"}}}"#
                    .to_owned()
            }
            (Method::Get, _) => {
                r#"{"_links":{"sessions:paymentsCvc":{"href":"https://try.example.com/sessions/payments/cvc"}}}"#
                    .to_owned()
            }
            (Method::Post, "/verifiedTokens/sessions") => {
                r#"{"_links":{"verifiedTokens:session":{"href":"https://try.example.com/verifiedTokens/sessions/card-1"}}}"#
                    .to_owned()
            }
            (Method::Post, _) => {
                r#"{"_links":{"sessions:session":{"href":"https://try.example.com/sessions/cvc-1"}}}"#
                    .to_owned()
            }
        };
        let status = match request.method {
            Method::Get => StatusCode::OK,
            Method::Post => StatusCode::CREATED,
        };
        HttpResponse::new(status, body)
    }

    fn client_with(mock: MockHttpClient) -> AccessCheckoutClient {
        AccessCheckoutClient::builder()
            .base_url(BASE)
            .merchant_id("merchant-1")
            .http_client(Arc::new(mock))
            .clock(fixed_clock())
            .build()
            .expect("client")
    }

    fn full_details() -> CardDetails {
        CardDetails::new()
            .pan("4111111111111111")
            .expiry_date("12/30")
            .cvc("123")
    }

    #[test]
    fn expiry_formats() {
        let clock = fixed_clock();
        assert_eq!(
            parse_expiry_date("12/30", clock.as_ref()).expect("slash form"),
            ExpiryDate { month: 12, year: 2030 }
        );
        assert_eq!(
            parse_expiry_date("0727", clock.as_ref()).expect("compact form"),
            ExpiryDate { month: 7, year: 2027 }
        );
        for bad in ["13/30", "00/30", "1/30", "12-30", "12/3", "ab/cd", "1/2/30", ""] {
            assert!(
                parse_expiry_date(bad, clock.as_ref()).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn builder_requires_base_url_and_merchant() {
        let err = AccessCheckoutClient::builder()
            .merchant_id("m")
            .build()
            .expect_err("no base url");
        assert_eq!(err.to_string(), "Expected base url to be provided");

        let err = AccessCheckoutClient::builder()
            .base_url("  ")
            .merchant_id("m")
            .build()
            .expect_err("blank base url");
        assert!(matches!(err, CheckoutError::Configuration { .. }));

        let err = AccessCheckoutClient::builder()
            .base_url("not a url")
            .merchant_id("m")
            .build()
            .expect_err("bad base url");
        assert_eq!(err.to_string(), "Invalid base url: not a url");

        let err = AccessCheckoutClient::builder()
            .base_url(BASE)
            .build()
            .expect_err("no merchant");
        assert_eq!(err.to_string(), "Expected merchant ID to be provided");
    }

    #[test]
    fn card_bin_services_share_one_client() {
        let client = client_with(MockHttpClient::new());
        let first = client.card_bin_service();
        let second = client.card_bin_service();
        assert_eq!(first.checkout_id(), "merchant-1");
        assert!(Arc::ptr_eq(first.client(), second.client()));
        assert!(
            first
                .client()
                .endpoint()
                .as_str()
                .ends_with("/public/card/bindetails")
        );
    }

    #[test]
    fn card_request_carries_all_fields() {
        let client = client_with(MockHttpClient::new());
        let request = client
            .session_request(SessionType::Card, &full_details())
            .expect("request");
        assert_eq!(
            request,
            SessionRequest::Card(CardSessionRequest {
                card_number: "4111111111111111".to_owned(),
                card_expiry_date: ExpiryDate { month: 12, year: 2030 },
                cvc: "123".to_owned(),
                identity: "merchant-1".to_owned(),
            })
        );
    }

    #[test]
    fn cvc_request_needs_only_cvc() {
        let client = client_with(MockHttpClient::new());
        let request = client
            .session_request(SessionType::Cvc, &CardDetails::new().cvc("1234"))
            .expect("request");
        assert_eq!(
            request,
            SessionRequest::Cvc(CvcSessionRequest {
                cvc: "1234".to_owned(),
                identity: "merchant-1".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn missing_field_fails_without_network() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().never();
        let client = client_with(mock);
        let err = client
            .generate_sessions(
                &[SessionType::Cvc, SessionType::Card],
                &CardDetails::new().cvc("123"),
            )
            .await
            .expect_err("pan missing");
        assert_eq!(err.to_string(), "Expected card number to be provided");
    }

    #[tokio::test]
    async fn generates_card_and_cvc_sessions() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|req| Ok(service_response(&req)));
        let client = client_with(mock);
        let sessions = client
            .generate_sessions(
                &[SessionType::Card, SessionType::Cvc, SessionType::Card],
                &full_details(),
            )
            .await
            .expect("sessions");
        assert_eq!(sessions.len(), 2);
        assert_eq!(
            sessions[&SessionType::Card].session_reference,
            "https://try.example.com/verifiedTokens/sessions/card-1"
        );
        assert_eq!(
            sessions[&SessionType::Cvc].session_reference,
            "https://try.example.com/sessions/cvc-1"
        );
        // Two hops per service, each cached.
        assert_eq!(client.cache().len(), 4);
    }

    #[tokio::test]
    async fn callback_receives_exactly_one_outcome() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|req| Ok(service_response(&req)));
        let client = Arc::new(client_with(mock));
        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .spawn_generate_session(SessionType::Cvc, CardDetails::new().cvc("123"), move |outcome| {
                let sent = tx.send(outcome);
                assert!(sent.is_ok());
            })
            .await
            .expect("task");
        let outcome = rx.await.expect("one completion");
        assert_eq!(
            outcome.expect("session").session_reference,
            "https://try.example.com/sessions/cvc-1"
        );
    }

    #[tokio::test]
    async fn callback_receives_batch_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "")));
        let client = Arc::new(client_with(mock));
        let (tx, rx) = tokio::sync::oneshot::channel();
        client
            .spawn_generate_sessions(vec![SessionType::Card], full_details(), move |outcome| {
                let sent = tx.send(outcome);
                assert!(sent.is_ok());
            })
            .await
            .expect("task");
        let err = rx.await.expect("one completion").expect_err("discovery fails");
        assert!(matches!(err, CheckoutError::Discovery { .. }), "{err:?}");
        assert!(err.is_retryable());
    }

    #[test]
    fn debug_output_hides_card_data() {
        let rendered = format!("{:?}", full_details());
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("123"));
        assert!(rendered.contains("12/30"));
    }
}
