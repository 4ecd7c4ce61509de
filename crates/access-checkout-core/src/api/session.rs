//! Session creation: discovery, submission, and response mapping.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{
    CONNECTION_FAILED_MESSAGE, CheckoutError, RequestError, SERVER_ERROR_MESSAGE, ValidationRule,
};

use super::hal::{HalDocument, HalLink};
use super::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use super::{DiscoverLinks, DiscoveryCache, DiscoveryClient, SDK_HEADER, sdk_header_value};

// ---------------------------------------------------------------------------
// Request and response payloads
// ---------------------------------------------------------------------------

/// Expiry as sent on the wire: month 1–12, four-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpiryDate {
    pub month: u32,
    pub year: u32,
}

/// Body of a card session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSessionRequest {
    pub card_number: String,
    pub card_expiry_date: ExpiryDate,
    pub cvc: String,
    pub identity: String,
}

/// Body of a CVC-only session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CvcSessionRequest {
    pub cvc: String,
    pub identity: String,
}

/// A session request for one of the supported services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// Card details exchanged through the verified-tokens service.
    Card(CardSessionRequest),
    /// A CVC exchanged through the sessions service.
    Cvc(CvcSessionRequest),
}

impl SessionRequest {
    /// Discovery path to the endpoint that accepts this request.
    pub fn links(&self) -> DiscoverLinks {
        match self {
            Self::Card(_) => DiscoverLinks::verified_tokens(),
            Self::Cvc(_) => DiscoverLinks::sessions_cvc(),
        }
    }

    /// Relation of the session link in a success response.
    pub fn session_relation(&self) -> &'static str {
        match self {
            Self::Card(_) => "verifiedTokens:session",
            Self::Cvc(_) => "sessions:session",
        }
    }

    fn to_json(&self) -> Result<String, CheckoutError> {
        let json = match self {
            Self::Card(card) => serde_json::to_string(card),
            Self::Cvc(cvc) => serde_json::to_string(cvc),
        };
        json.map_err(|e| CheckoutError::deserialization(format!("cannot serialize request: {e}")))
    }
}

/// A created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Opaque, single-use session reference URL.
    pub session_reference: String,
    pub curies: Vec<HalLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientErrorBody {
    error_name: RequestError,
    #[serde(default)]
    message: String,
    #[serde(default)]
    validation_errors: Vec<ValidationRule>,
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Resolves the session endpoint and submits session requests to it.
#[derive(Clone)]
pub struct SessionRequestSender {
    http: Arc<dyn HttpClient>,
    discovery: DiscoveryClient,
}

impl SessionRequestSender {
    pub fn new(http: Arc<dyn HttpClient>, cache: Arc<DiscoveryCache>) -> Self {
        let discovery = DiscoveryClient::new(Arc::clone(&http), cache);
        Self { http, discovery }
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    /// Creates a session for `request` at the service found from `base_url`.
    ///
    /// Discovery completes before anything is posted; when it fails the
    /// discovery error is returned and no POST is made. At most one redirect
    /// is followed.
    ///
    /// # Errors
    ///
    /// Returns exactly one [`CheckoutError`] describing the first failure.
    pub async fn send(
        &self,
        request: &SessionRequest,
        base_url: &str,
    ) -> Result<SessionResponse, CheckoutError> {
        let links = request.links();
        let endpoint = self.discovery.discover(base_url, &links).await?;
        let body = request.to_json()?;

        tracing::debug!(%endpoint, "submitting session request");
        let mut response = self.post(endpoint.clone(), &body, links.media_type()).await?;
        if response.status.is_redirection() {
            let target = redirect_target(&endpoint, &response)?;
            tracing::debug!(from = %endpoint, to = %target, "following redirect");
            response = self.post(target, &body, links.media_type()).await?;
            if response.status.is_redirection() {
                return Err(CheckoutError::transport(format!(
                    "Response from server was a second redirect HTTP response code: {}",
                    response.status.as_u16()
                )));
            }
        }
        map_response(response, request.session_relation())
    }

    async fn post(&self, url: Url, body: &str, media_type: &str) -> Result<HttpResponse, CheckoutError> {
        let request = HttpRequest::post(url, body.to_owned())
            .header("Content-Type", media_type)
            .header("Accept", media_type)
            .header(SDK_HEADER, sdk_header_value());
        self.http.execute(request).await.map_err(transport_error)
    }
}

pub(crate) fn transport_error(e: TransportError) -> CheckoutError {
    let message = e.to_string();
    let message = if message.trim().is_empty() {
        CONNECTION_FAILED_MESSAGE.to_owned()
    } else {
        message
    };
    CheckoutError::HttpTransport {
        message,
        source: Some(Box::new(e)),
    }
}

fn redirect_target(endpoint: &Url, response: &HttpResponse) -> Result<Url, CheckoutError> {
    let location = response
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            CheckoutError::transport(format!(
                "Response from server was a redirect HTTP response code: {} but did not include a Location header",
                response.status.as_u16()
            ))
        })?;
    endpoint.join(location).map_err(|e| CheckoutError::HttpTransport {
        message: format!("Redirect Location header is not a valid URL: {location}"),
        source: Some(Box::new(e)),
    })
}

/// Maps a final (non-redirect) response to a session or an error.
fn map_response(response: HttpResponse, relation: &str) -> Result<SessionResponse, CheckoutError> {
    let status = response.status;
    if status.is_success() {
        return success_response(response, relation);
    }
    if status.is_client_error() {
        return Err(client_error(status, &response.body));
    }
    if status.is_server_error() {
        let message = serde_json::from_str::<ServerErrorBody>(&response.body)
            .ok()
            .and_then(|body| body.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_owned());
        return Err(CheckoutError::Server { message });
    }
    Err(CheckoutError::transport(format!(
        "Unexpected response status: {status}"
    )))
}

fn success_response(response: HttpResponse, relation: &str) -> Result<SessionResponse, CheckoutError> {
    if response.body.trim().is_empty() {
        return match response.location {
            Some(location) if !location.trim().is_empty() => Ok(SessionResponse {
                session_reference: location,
                curies: Vec::new(),
            }),
            Some(_) | None => Err(CheckoutError::deserialization(
                "Cannot deserialize empty string",
            )),
        };
    }

    let document = HalDocument::parse(&response.body)?;
    let curies = document.curies();
    match (document.href(relation), response.location) {
        (Some(href), _) => Ok(SessionResponse {
            session_reference: href.to_owned(),
            curies,
        }),
        (None, Some(location)) if !location.trim().is_empty() => Ok(SessionResponse {
            session_reference: location,
            curies,
        }),
        (None, Some(_) | None) => Err(CheckoutError::deserialization(format!(
            "Missing property: '{relation}'"
        ))),
    }
}

fn client_error(status: StatusCode, body: &str) -> CheckoutError {
    match serde_json::from_str::<ClientErrorBody>(body) {
        Ok(parsed) => CheckoutError::ClientValidation {
            error: parsed.error_name,
            message: parsed.message,
            validation_rules: parsed.validation_errors,
        },
        Err(_) if body.trim().is_empty() => {
            CheckoutError::transport(format!("Error message was: {status}"))
        }
        Err(_) => CheckoutError::transport(format!(
            "Error message was: {status}. Error response was: {body}"
        )),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::wildcard_enum_match_arm)]

    use std::sync::Mutex;

    use super::*;
    use crate::api::http::{Method, MockHttpClient};
    use crate::api::{SESSIONS_MEDIA_TYPE, VERIFIED_TOKENS_MEDIA_TYPE};
    use crate::error::ValidationRuleName;

    const BASE: &str = "https://try.example.com/";
    const ENDPOINT: &str = "https://try.example.com/verifiedTokens/sessions";
    const SESSION: &str = "https://try.example.com/verifiedTokens/sessions/abc123";

    fn card_request() -> SessionRequest {
        SessionRequest::Card(CardSessionRequest {
            card_number: "4111111111111111".to_owned(),
            card_expiry_date: ExpiryDate { month: 12, year: 2030 },
            cvc: "123".to_owned(),
            identity: "merchant-1".to_owned(),
        })
    }

    fn discovery_response(request: &HttpRequest) -> HttpResponse {
        let body = match request.url.path() {
            "/" => r#"{"_links":{"service:verifiedTokens":{"href":"https://try.example.com/verifiedTokens"}}}"#,
            _ => r#"{"_links":{"verifiedTokens:sessions":{"href":"https://try.example.com/verifiedTokens/sessions"}}}"#,
        };
        HttpResponse::new(StatusCode::OK, body)
    }

    fn session_body() -> String {
        format!(
            r#"{{"_links":{{"verifiedTokens:session":{{"href":"{SESSION}"}},"curies":[{{"href":"https://try.example.com/rels/verifiedTokens/{{rel}}.json","name":"verifiedTokens","templated":true}}]}}}}"#
        )
    }

    /// A mock that answers discovery GETs and hands every POST to `post`.
    fn mock_with_post<F>(post: F) -> MockHttpClient
    where
        F: FnMut(HttpRequest) -> Result<HttpResponse, TransportError> + Send + 'static,
    {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == Method::Get)
            .returning(|req| Ok(discovery_response(&req)));
        mock.expect_execute()
            .withf(|req| req.method == Method::Post)
            .returning(post);
        mock
    }

    fn sender(mock: MockHttpClient) -> SessionRequestSender {
        SessionRequestSender::new(Arc::new(mock), Arc::new(DiscoveryCache::new()))
    }

    #[tokio::test]
    async fn created_session_is_returned() {
        let mock = mock_with_post(|_| Ok(HttpResponse::new(StatusCode::CREATED, session_body())));
        let response = sender(mock)
            .send(&card_request(), BASE)
            .await
            .expect("session");
        assert_eq!(response.session_reference, SESSION);
        assert_eq!(response.curies.len(), 1);
        assert_eq!(response.curies[0].name.as_deref(), Some("verifiedTokens"));
    }

    #[tokio::test]
    async fn post_carries_body_and_headers() {
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        let mock = mock_with_post(move |req| {
            if let Ok(mut slot) = captured.lock() {
                *slot = Some(req);
            }
            Ok(HttpResponse::new(StatusCode::CREATED, session_body()))
        });
        sender(mock).send(&card_request(), BASE).await.expect("session");

        let request = seen.lock().expect("lock").take().expect("post captured");
        assert_eq!(request.url.as_str(), ENDPOINT);
        assert_eq!(request.header_value("Content-Type"), Some(VERIFIED_TOKENS_MEDIA_TYPE));
        assert_eq!(request.header_value("Accept"), Some(VERIFIED_TOKENS_MEDIA_TYPE));
        assert!(
            request
                .header_value(SDK_HEADER)
                .is_some_and(|v| v.starts_with("access-checkout-rs/"))
        );
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().expect("body")).expect("json body");
        assert_eq!(body["cardNumber"], "4111111111111111");
        assert_eq!(body["cardExpiryDate"]["month"], 12);
        assert_eq!(body["cardExpiryDate"]["year"], 2030);
        assert_eq!(body["cvc"], "123");
        assert_eq!(body["identity"], "merchant-1");
    }

    #[tokio::test]
    async fn cvc_request_uses_sessions_service() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == Method::Get)
            .returning(|req| {
                let body = if req.url.path() == "/" {
                    r#"{"_links":{"service:sessions":{"href":"https://try.example.com/sessions"}}}"#
                } else {
                    r#"{"_links":{"sessions:paymentsCvc":{"href":"https://try.example.com/sessions/payments/cvc"}}}"#
                };
                Ok(HttpResponse::new(StatusCode::OK, body))
            });
        mock.expect_execute()
            .withf(|req| {
                req.method == Method::Post
                    && req.url.path() == "/sessions/payments/cvc"
                    && req.header_value("Content-Type") == Some(SESSIONS_MEDIA_TYPE)
            })
            .returning(|_| {
                Ok(HttpResponse::new(
                    StatusCode::CREATED,
                    r#"{"_links":{"sessions:session":{"href":"https://try.example.com/sessions/xyz"}}}"#,
                ))
            });
        let request = SessionRequest::Cvc(CvcSessionRequest {
            cvc: "123".to_owned(),
            identity: "merchant-1".to_owned(),
        });
        let response = sender(mock).send(&request, BASE).await.expect("session");
        assert_eq!(response.session_reference, "https://try.example.com/sessions/xyz");
        assert!(response.curies.is_empty());
    }

    #[tokio::test]
    async fn discovery_failure_skips_post() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == Method::Get)
            .returning(|_| Err(TransportError::Connection("connection refused".to_owned())));
        mock.expect_execute()
            .withf(|req| req.method == Method::Post)
            .never();
        let err = sender(mock)
            .send(&card_request(), BASE)
            .await
            .expect_err("discovery fails");
        assert!(matches!(err, CheckoutError::Discovery { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn luhn_rejection_maps_to_client_validation() {
        let mock = mock_with_post(|_| {
            Ok(HttpResponse::new(
                StatusCode::BAD_REQUEST,
                r#"{
                    "errorName": "bodyDoesNotMatchSchema",
                    "message": "The json body provided does not match the expected schema",
                    "validationErrors": [
                        { "errorName": "panFailedLuhnCheck", "message": "The identified field contains a PAN that has failed the Luhn check.", "jsonPath": "$.cardNumber" }
                    ]
                }"#,
            ))
        });
        let err = sender(mock)
            .send(&card_request(), BASE)
            .await
            .expect_err("rejected");
        match err {
            CheckoutError::ClientValidation {
                error,
                validation_rules,
                ..
            } => {
                assert_eq!(error, RequestError::BodyDoesNotMatchSchema);
                assert_eq!(validation_rules.len(), 1);
                assert_eq!(validation_rules[0].name, ValidationRuleName::PanFailedLuhnCheck);
                assert_eq!(validation_rules[0].json_path, "$.cardNumber");
            }
            other => panic!("expected ClientValidation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_error_name_degrades_to_sentinel() {
        let mock = mock_with_post(|_| {
            Ok(HttpResponse::new(
                StatusCode::BAD_REQUEST,
                r#"{"errorName":"somethingNew","message":"new"}"#,
            ))
        });
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("rejected");
        match err {
            CheckoutError::ClientValidation { error, .. } => {
                assert_eq!(error, RequestError::UnknownError);
            }
            other => panic!("expected ClientValidation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unstructured_client_error_carries_status_line() {
        let mock = mock_with_post(|_| Ok(HttpResponse::new(StatusCode::NOT_FOUND, "<html>gone</html>")));
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("rejected");
        match err {
            CheckoutError::HttpTransport { message, .. } => {
                assert!(message.contains("404 Not Found"), "{message}");
                assert!(message.contains("<html>gone</html>"), "{message}");
            }
            other => panic!("expected HttpTransport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_uses_server_message() {
        let mock = mock_with_post(|_| {
            Ok(HttpResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"errorName":"internalErrorOccurred","message":"Something went wrong"}"#,
            ))
        });
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        match err {
            CheckoutError::Server { message } => assert_eq!(message, "Something went wrong"),
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_without_message_uses_default() {
        let mock = mock_with_post(|_| Ok(HttpResponse::new(StatusCode::BAD_GATEWAY, "")));
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        match err {
            CheckoutError::Server { message } => assert_eq!(message, SERVER_ERROR_MESSAGE),
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_on_post() {
        let mock = mock_with_post(|_| Err(TransportError::Connection(String::new())));
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        match err {
            CheckoutError::HttpTransport { message, source } => {
                assert_eq!(message, CONNECTION_FAILED_MESSAGE);
                assert!(source.is_some());
            }
            other => panic!("expected HttpTransport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_redirect_is_followed() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == Method::Get)
            .returning(|req| Ok(discovery_response(&req)));
        mock.expect_execute()
            .withf(|req| req.method == Method::Post && req.url.as_str() == ENDPOINT)
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(StatusCode::TEMPORARY_REDIRECT, "").with_location("/moved/sessions"))
            });
        mock.expect_execute()
            .withf(|req| req.method == Method::Post && req.url.path() == "/moved/sessions")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::CREATED, session_body())));
        let response = sender(mock).send(&card_request(), BASE).await.expect("session");
        assert_eq!(response.session_reference, SESSION);
    }

    #[tokio::test]
    async fn redirect_without_location_is_transport_error() {
        let mock = mock_with_post(|_| Ok(HttpResponse::new(StatusCode::FOUND, "")));
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        match err {
            CheckoutError::HttpTransport { message, .. } => {
                assert!(message.contains("302"), "{message}");
                assert!(message.contains("Location"), "{message}");
            }
            other => panic!("expected HttpTransport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_redirect_is_not_followed() {
        let mock = mock_with_post(|_| {
            Ok(HttpResponse::new(StatusCode::TEMPORARY_REDIRECT, "").with_location("/again"))
        });
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        assert!(matches!(err, CheckoutError::HttpTransport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn location_header_backs_up_empty_body() {
        let mock = mock_with_post(|_| {
            Ok(HttpResponse::new(StatusCode::CREATED, "").with_location(SESSION))
        });
        let response = sender(mock).send(&card_request(), BASE).await.expect("session");
        assert_eq!(response.session_reference, SESSION);
    }

    #[tokio::test]
    async fn unreadable_success_body_is_deserialization_error() {
        let mock = mock_with_post(|_| Ok(HttpResponse::new(StatusCode::CREATED, "{\"_links\":{}}")));
        let err = sender(mock).send(&card_request(), BASE).await.expect_err("failed");
        match err {
            CheckoutError::Deserialization { message } => {
                assert_eq!(message, "Missing property: 'verifiedTokens:session'");
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
