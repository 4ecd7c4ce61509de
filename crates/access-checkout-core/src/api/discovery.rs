//! Hypermedia link walking.
//!
//! Resolving an endpoint means following an ordered list of link relations
//! from a base URL, fetching one HAL document per hop. Each hop is memoised in
//! the [`DiscoveryCache`], so once a path is known it costs no requests, and a
//! walk that failed part-way resumes from the first unresolved hop when the
//! caller retries. There is no internal retry.

use std::sync::Arc;

use url::Url;

use crate::error::{BoxError, CheckoutError};

use super::{
    DiscoveryCache, HAL_MEDIA_TYPE, HalDocument, HttpClient, HttpRequest, SESSIONS_MEDIA_TYPE,
    VERIFIED_TOKENS_MEDIA_TYPE,
};

/// Ordered relations leading from a base URL to a service endpoint, plus the
/// media type spoken by that service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverLinks {
    relations: Vec<String>,
    media_type: String,
}

impl DiscoverLinks {
    /// # Errors
    ///
    /// Returns [`CheckoutError::Configuration`] when `relations` is empty.
    pub fn new<I, S>(relations: I, media_type: impl Into<String>) -> Result<Self, CheckoutError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let relations: Vec<String> = relations.into_iter().map(Into::into).collect();
        if relations.is_empty() {
            return Err(CheckoutError::configuration(
                "discovery requires at least one link relation",
            ));
        }
        Ok(Self {
            relations,
            media_type: media_type.into(),
        })
    }

    fn preset(relations: [&str; 2], media_type: &str) -> Self {
        Self {
            relations: relations.iter().map(|r| (*r).to_owned()).collect(),
            media_type: media_type.to_owned(),
        }
    }

    /// Card sessions through the verified-tokens service.
    pub fn verified_tokens() -> Self {
        Self::preset(
            ["service:verifiedTokens", "verifiedTokens:sessions"],
            VERIFIED_TOKENS_MEDIA_TYPE,
        )
    }

    /// CVC-only sessions.
    pub fn sessions_cvc() -> Self {
        Self::preset(["service:sessions", "sessions:paymentsCvc"], SESSIONS_MEDIA_TYPE)
    }

    /// Card sessions through the sessions service.
    pub fn sessions_card() -> Self {
        Self::preset(["service:sessions", "sessions:card"], SESSIONS_MEDIA_TYPE)
    }

    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Parses and checks a caller-supplied base URL.
///
/// # Errors
///
/// Returns [`CheckoutError::Discovery`] for a blank or unparseable URL.
pub fn parse_base_url(base_url: &str) -> Result<Url, CheckoutError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(CheckoutError::Discovery {
            message: "No URL supplied".to_owned(),
            source: None,
        });
    }
    Url::parse(trimmed).map_err(|e| CheckoutError::Discovery {
        message: format!("Invalid URL supplied: {trimmed}"),
        source: Some(Box::new(e)),
    })
}

/// Resolves service endpoints by walking HAL links.
#[derive(Clone)]
pub struct DiscoveryClient {
    http: Arc<dyn HttpClient>,
    cache: Arc<DiscoveryCache>,
}

impl DiscoveryClient {
    pub fn new(http: Arc<dyn HttpClient>, cache: Arc<DiscoveryCache>) -> Self {
        Self { http, cache }
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// Resolves the endpoint reached by following `links` from `base_url`.
    ///
    /// The root document is requested as generic HAL; later hops use the
    /// service's media type.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Discovery`] when the base URL is invalid or
    /// any hop fails. No partial result is returned and the cache keeps every
    /// hop resolved so far.
    pub async fn discover(&self, base_url: &str, links: &DiscoverLinks) -> Result<Url, CheckoutError> {
        let mut current = parse_base_url(base_url)?;
        for (hop, relation) in links.relations.iter().enumerate() {
            if let Some(cached) = self.cache.get(&current, relation) {
                tracing::debug!(url = %current, relation, "discovery cache hit");
                current = cached;
                continue;
            }
            let accept = if hop == 0 {
                HAL_MEDIA_TYPE
            } else {
                links.media_type.as_str()
            };
            let resolved = self
                .fetch_link(&current, relation, accept)
                .await
                .map_err(|cause| {
                    tracing::debug!(url = %current, relation, error = %cause, "discovery failed");
                    CheckoutError::discovery(cause)
                })?;
            current = self.cache.get_or_insert(current, relation, resolved);
        }
        tracing::debug!(endpoint = %current, "discovery resolved");
        Ok(current)
    }

    async fn fetch_link(&self, url: &Url, relation: &str, accept: &str) -> Result<Url, BoxError> {
        tracing::debug!(%url, relation, "fetching discovery document");
        let request = HttpRequest::get(url.clone())
            .header("Accept", accept)
            .header("Content-Type", accept);
        let response = self.http.execute(request).await.map_err(|e| {
            let message = e.to_string();
            let message = if message.is_empty() {
                crate::error::CONNECTION_FAILED_MESSAGE.to_owned()
            } else {
                message
            };
            CheckoutError::HttpTransport {
                message,
                source: Some(Box::new(e)),
            }
        })?;
        if !response.status.is_success() {
            return Err(Box::new(CheckoutError::transport(format!(
                "Discovery request to {url} returned {}",
                response.status
            ))));
        }
        let document = HalDocument::parse(&response.body)?;
        let href = document.require_href(relation)?;
        let target = url.join(href)?;
        Ok(target)
    }
}
