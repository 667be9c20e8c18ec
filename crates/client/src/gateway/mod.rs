//! HTTP gateway to the Mercato backend.
//!
//! # Architecture
//!
//! - One `reqwest::Client` with the configured base address and timeout
//! - The bearer token of the active identity is attached to every request
//! - 401 is reported as [`GatewayError::Unauthorized`]; it is never retried
//!   and never clears the session, that decision belongs to the caller
//! - No retry policy: every failure is returned on the first attempt
//! - Response bodies are decoded into the schemas in [`wire`], where backend
//!   defaulting rules live

pub mod wire;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::session::ActiveIdentity;

use wire::ErrorBody;

/// Longest slice of a response body copied into logs.
const LOG_BODY_LIMIT: usize = 500;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (timeout, refused connection, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend answered 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend-supplied message, or the canonical reason.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The base address cannot carry the requested path.
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

impl GatewayError {
    /// Message supplied by the backend, if it answered at all.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message) | Self::NotFound(message) => Some(message),
            Self::Status { message, .. } => Some(message),
            Self::Http(_) | Self::Parse(_) | Self::Endpoint(_) => None,
        }
    }

    /// Whether the request never got an answer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Request/response pipeline shared by every store.
///
/// Cheap to clone; owns no state besides the HTTP connection pool. The bearer
/// token is read from the shared [`ActiveIdentity`] on every call.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: Url,
    identity: ActiveIdentity,
}

impl Gateway {
    /// Create a gateway for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, identity: ActiveIdentity) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.api_base_url.clone(),
                identity,
            }),
        })
    }

    /// Base address requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve path segments against the base address.
    ///
    /// Segments are percent-encoded individually, so IDs can never escape
    /// their position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Endpoint(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match self.inner.identity.bearer() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = ErrorBody::message_from(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        match status {
            StatusCode::UNAUTHORIZED => {
                debug!(%message, "backend rejected authorization");
                Err(GatewayError::Unauthorized(message))
            }
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(message)),
            _ => {
                tracing::error!(
                    status = %status,
                    body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                    "backend returned non-success status"
                );
                Err(GatewayError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "failed to parse backend response"
            );
            GatewayError::Parse(e)
        })
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on transport failure, non-success status or a
    /// body that does not match `T`.
    #[instrument(skip(self, segments, query), fields(path = %segments.join("/")))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let mut url = self.endpoint(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let body = self.send(self.request(Method::GET, url)).await?;
        Self::decode(&body)
    }

    /// `POST` a JSON body and decode the JSON answer.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on transport failure, non-success status or a
    /// body that does not match `T`.
    #[instrument(skip(self, segments, body), fields(path = %segments.join("/")))]
    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let body = self.send(self.request(Method::POST, url).json(body)).await?;
        Self::decode(&body)
    }

    /// `PUT` a JSON body and decode the JSON answer.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on transport failure, non-success status or a
    /// body that does not match `T`.
    #[instrument(skip(self, segments, body), fields(path = %segments.join("/")))]
    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let body = self.send(self.request(Method::PUT, url).json(body)).await?;
        Self::decode(&body)
    }

    /// Send a request whose answer body is irrelevant.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on transport failure or non-success status.
    #[instrument(skip(self, method, segments, body), fields(method = %method, path = %segments.join("/")))]
    pub async fn execute<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let request = self.request(method, url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        self.send(request).await.map(drop)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> Gateway {
        let config = ClientConfig::for_base_url(Url::parse(base).unwrap());
        Gateway::new(&config, ActiveIdentity::default()).unwrap()
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let gw = gateway("http://localhost:5000/api");
        assert_eq!(
            gw.endpoint(&["users", "login"]).unwrap().as_str(),
            "http://localhost:5000/api/users/login"
        );

        let trailing = gateway("http://localhost:5000/api/");
        assert_eq!(
            trailing.endpoint(&["products"]).unwrap().as_str(),
            "http://localhost:5000/api/products"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let gw = gateway("http://localhost:5000/api");
        assert_eq!(
            gw.endpoint(&["products", "a/b c"]).unwrap().as_str(),
            "http://localhost:5000/api/products/a%2Fb%20c"
        );
    }

    #[test]
    fn test_backend_message() {
        let err = GatewayError::Status {
            status: 409,
            message: "User already exists".into(),
        };
        assert_eq!(err.backend_message(), Some("User already exists"));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let gw = gateway("http://127.0.0.1:9/api");
        let err = gw
            .get::<serde_json::Value>(&["products"], &[])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
