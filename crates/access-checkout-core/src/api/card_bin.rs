//! Card BIN lookup.
//!
//! The card configuration resolves one brand from the leading digits of a
//! PAN. Co-branded cards belong to more than one network, and only the BIN
//! service knows the full list. [`CardBinClient`] queries that service and
//! caches answers by BIN prefix. [`CardBinService`] turns the answer into
//! [`CardBrand`] values, delivering the extra brands after the fact.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{BoxError, CheckoutError};
use crate::rules::CardBrand;

use super::discovery::parse_base_url;
use super::http::{HttpClient, HttpRequest};
use super::session::transport_error;
use super::{SDK_HEADER, sdk_header_value};

/// Path of the BIN details endpoint, relative to the base URL.
pub const CARD_BIN_ENDPOINT: &str = "public/card/bindetails";

pub const API_VERSION_HEADER: &str = "WP-Api-Version";
pub const API_VERSION: &str = "1";
pub const CALLER_ID_HEADER: &str = "WP-CallerId";
/// Caller id the BIN service accepts for SDK traffic.
pub const CALLER_ID: &str = "checkoutandroid";

/// Number of leading PAN digits that key the response cache.
pub const CACHE_KEY_LENGTH: usize = 12;

/// Attempts per lookup before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBinRequest {
    pub card_number: String,
    pub checkout_id: String,
}

impl fmt::Debug for CardBinRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardBinRequest")
            .field("card_number", &"<redacted>")
            .field("checkout_id", &self.checkout_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBinResponse {
    /// Every network the card belongs to, lowercase.
    pub brand: Vec<String>,
    pub funding_type: String,
    pub luhn_compliant: bool,
}

/// Decodes a BIN details body.
///
/// # Errors
///
/// Returns [`CheckoutError::Deserialization`] for an empty body, malformed
/// JSON, or a document missing `brand` or `fundingType`.
pub fn parse_card_bin_response(body: &str) -> Result<CardBinResponse, CheckoutError> {
    if body.trim().is_empty() {
        return Err(CheckoutError::deserialization("Cannot deserialize empty string"));
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| CheckoutError::deserialization(format!("Cannot interpret json: {e}")))?;
    let brand = value
        .get("brand")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| CheckoutError::deserialization("Missing array: 'brand'"))?
        .iter()
        .map(|b| {
            b.as_str()
                .map(str::to_owned)
                .ok_or_else(|| CheckoutError::deserialization("Invalid array entry: 'brand'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let funding_type = value
        .get("fundingType")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| CheckoutError::deserialization("Missing property: 'fundingType'"))?
        .to_owned();
    let luhn_compliant = value
        .get("luhnCompliant")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    Ok(CardBinResponse {
        brand,
        funding_type,
        luhn_compliant,
    })
}

/// Leading digits of `pan` used as the cache key, when there are enough.
pub fn cache_key(pan: &str) -> Option<&str> {
    pan.get(..CACHE_KEY_LENGTH)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Outcome of a single failed attempt.
enum AttemptError {
    /// The server rejected the request as malformed.
    Rejected(CheckoutError),
    Retryable(CheckoutError),
}

/// Queries the BIN details endpoint with bounded retry and a prefix cache.
pub struct CardBinClient {
    http: Arc<dyn HttpClient>,
    endpoint: Url,
    cache: DashMap<String, CardBinResponse>,
}

impl fmt::Debug for CardBinClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardBinClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl CardBinClient {
    /// # Errors
    ///
    /// Returns [`CheckoutError::Configuration`] when `base_url` is blank or
    /// not an absolute URL.
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Result<Self, CheckoutError> {
        let invalid = || CheckoutError::configuration(format!("Invalid base url: {base_url}"));
        let mut base = parse_base_url(base_url).map_err(|_| invalid())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(CARD_BIN_ENDPOINT).map_err(|_| invalid())?;
        Ok(Self {
            http,
            endpoint,
            cache: DashMap::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The cached response for the BIN prefix of `pan`, if any.
    pub fn cached(&self, pan: &str) -> Option<CardBinResponse> {
        let key = cache_key(pan)?;
        self.cache.get(key).map(|entry| entry.value().clone())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Looks up the card in `request`, answering from the cache when the
    /// BIN prefix was seen before.
    ///
    /// # Errors
    ///
    /// A 4xx answer fails at once with [`CheckoutError::HttpTransport`].
    /// Other failures are retried up to [`MAX_ATTEMPTS`] times, then reported
    /// as [`CheckoutError::HttpTransport`] carrying the last failure as its
    /// source.
    pub async fn fetch(&self, request: &CardBinRequest) -> Result<CardBinResponse, CheckoutError> {
        if let Some(hit) = self.cached(&request.card_number) {
            tracing::debug!("card BIN answered from cache");
            return Ok(hit);
        }
        let body = serde_json::to_string(request).map_err(|e| {
            CheckoutError::deserialization(format!("Cannot serialize card BIN request: {e}"))
        })?;

        let mut last = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(&body).await {
                Ok(response) => {
                    if let Some(key) = cache_key(&request.card_number) {
                        self.cache.insert(key.to_owned(), response.clone());
                    }
                    return Ok(response);
                }
                Err(AttemptError::Rejected(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => {
                    tracing::debug!(
                        attempt,
                        max = MAX_ATTEMPTS,
                        error = %e,
                        "card BIN lookup failed"
                    );
                    last = Some(e);
                }
            }
        }
        Err(CheckoutError::HttpTransport {
            message: format!("Failed after {MAX_ATTEMPTS} attempts"),
            source: last.map(|e| Box::new(e) as BoxError),
        })
    }

    async fn attempt(&self, body: &str) -> Result<CardBinResponse, AttemptError> {
        let request = HttpRequest::post(self.endpoint.clone(), body.to_owned())
            .header("Content-Type", "application/json")
            .header(API_VERSION_HEADER, API_VERSION)
            .header(CALLER_ID_HEADER, CALLER_ID)
            .header(SDK_HEADER, sdk_header_value());
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| AttemptError::Retryable(transport_error(e)))?;

        let status = response.status;
        if status.is_client_error() {
            return Err(AttemptError::Rejected(CheckoutError::transport(format!(
                "HTTP response code: {}",
                status.as_u16()
            ))));
        }
        if !status.is_success() {
            return Err(AttemptError::Retryable(CheckoutError::Server {
                message: format!("HTTP response code: {}", status.as_u16()),
            }));
        }
        parse_card_bin_response(&response.body).map_err(AttemptError::Retryable)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Brands known right away, plus the lookup still running for the rest.
#[derive(Debug)]
pub struct CardBrandLookup {
    pub brands: Vec<CardBrand>,
    /// Set when a lookup was started. Its callback runs only on success.
    pub pending: Option<JoinHandle<()>>,
}

impl CardBrandLookup {
    fn ready(brands: Vec<CardBrand>) -> Self {
        Self {
            brands,
            pending: None,
        }
    }
}

/// Resolves co-brands of a card through a shared [`CardBinClient`].
#[derive(Debug, Clone)]
pub struct CardBinService {
    client: Arc<CardBinClient>,
    checkout_id: String,
}

impl CardBinService {
    pub fn new(client: Arc<CardBinClient>, checkout_id: impl Into<String>) -> Self {
        Self {
            client,
            checkout_id: checkout_id.into(),
        }
    }

    pub fn client(&self) -> &Arc<CardBinClient> {
        &self.client
    }

    pub fn checkout_id(&self) -> &str {
        &self.checkout_id
    }

    /// Brands of `pan`, starting from the `initial` brand the card
    /// configuration matched.
    ///
    /// Without an initial brand the result is empty. Shorter PANs and
    /// uncached prefixes give `[initial]` straight away. For an uncached
    /// prefix a lookup is spawned on the current tokio runtime and
    /// `on_brands` receives the full list when it succeeds. Lookup failures
    /// are logged and dropped.
    pub fn card_brands<F>(
        &self,
        initial: Option<&CardBrand>,
        pan: &str,
        on_brands: F,
    ) -> CardBrandLookup
    where
        F: FnOnce(Vec<CardBrand>) + Send + 'static,
    {
        let Some(initial) = initial else {
            return CardBrandLookup::ready(Vec::new());
        };
        if cache_key(pan).is_none() {
            return CardBrandLookup::ready(vec![initial.clone()]);
        }
        if let Some(hit) = self.client.cached(pan) {
            return CardBrandLookup::ready(co_brands(initial, &hit));
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no tokio runtime, skipping card BIN lookup");
            return CardBrandLookup::ready(vec![initial.clone()]);
        };

        let client = Arc::clone(&self.client);
        let request = CardBinRequest {
            card_number: pan.to_owned(),
            checkout_id: self.checkout_id.clone(),
        };
        let brand = initial.clone();
        let pending = runtime.spawn(async move {
            match client.fetch(&request).await {
                Ok(response) => on_brands(co_brands(&brand, &response)),
                Err(e) => tracing::warn!(error = %e, "card BIN lookup failed"),
            }
        });
        CardBrandLookup {
            brands: vec![initial.clone()],
            pending: Some(pending),
        }
    }
}

/// Expands `initial` into one brand per network named in `response`.
///
/// Each network becomes a copy of `initial` under that name, so the
/// validation rules stay those of the matched brand. Names compare without
/// regard to case. An empty list, or one naming only `initial`, gives
/// `[initial]`.
pub fn co_brands(initial: &CardBrand, response: &CardBinResponse) -> Vec<CardBrand> {
    match response.brand.as_slice() {
        [] => vec![initial.clone()],
        [only] if only.eq_ignore_ascii_case(initial.name()) => vec![initial.clone()],
        names => {
            let mut brands: Vec<CardBrand> = Vec::with_capacity(names.len());
            for name in names {
                if !brands.iter().any(|b| b.name().eq_ignore_ascii_case(name)) {
                    brands.push(initial.renamed(name.as_str()));
                }
            }
            brands
        }
    }
}
