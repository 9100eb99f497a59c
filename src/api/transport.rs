//! HTTP transport seam between [`super::ApiClient`] and the network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use super::ApiError;
use crate::config::VergeConfig;

/// Header carrying the bearer token on every authenticated request.
pub const TOKEN_HEADER: &str = "x-yottabyte-token";

/// HTTP verbs used against the management API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    /// Read-only collection query.
    Get,
    /// Token issuance.
    Post,
}

/// A fully resolved request handed to a [`Transport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters, encoded by the transport.
    pub query: Vec<(String, String)>,
    /// Bearer token sent as [`TOKEN_HEADER`] when present.
    pub token: Option<String>,
    /// JSON body; never set for [`Method::Get`].
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Returns the value of the named query parameter, if present.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response returned by a [`Transport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Future returned by transport operations.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, ApiError>> + Send + 'a>>;

/// Sends HTTP requests on behalf of the API client.
///
/// Implementations report only failures to obtain a response; status
/// interpretation belongs to the caller.
pub trait Transport {
    /// Sends `request` and returns the raw response.
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with the given certificate policy and per-request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be
    /// initialised.
    pub fn new(accept_invalid_certs: bool, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Transport {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Builds a transport from [`VergeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be
    /// initialised.
    pub fn from_config(config: &VergeConfig) -> Result<Self, ApiError> {
        Self::new(config.accept_invalid_certs(), config.request_timeout())
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let transport_error = |err: reqwest::Error| ApiError::Transport {
                url: request.url.clone(),
                message: err.to_string(),
            };

            let mut builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
            }
            .header(CONTENT_TYPE, "application/json");

            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(token) = &request.token {
                builder = builder.header(TOKEN_HEADER, token);
            }
            if request.method == Method::Post
                && let Some(body) = &request.body
            {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(transport_error)?;
            Ok(HttpResponse { status, body })
        })
    }
}
