//! Client for the VergeOS management API.
//!
//! [`ApiClient`] turns a path on the management host into an authenticated
//! request, hands it to a [`Transport`], and decodes the JSON answer. Every
//! remote failure is reported as an [`ApiError`] carrying the URL, and for
//! status failures the HTTP status and raw body. Nothing is retried here.

mod error;
mod transport;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::VergeConfig;

pub use error::ApiError;
pub use transport::{
    HttpRequest, HttpResponse, Method, ReqwestTransport, TOKEN_HEADER, Transport,
    TransportFuture,
};

/// Path prefix of the versioned collection namespace.
pub const API_PREFIX: &str = "/api/v4";

/// Authenticated JSON client bound to one management host.
#[derive(Clone, Debug)]
pub struct ApiClient<T> {
    base_url: String,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    /// Builds a client for the configured host using `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: &VergeConfig) -> Result<Self, ApiError> {
        Ok(Self::new(
            config.base_url(),
            ReqwestTransport::from_config(config)?,
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client rooted at `base_url` (scheme and host, no trailing
    /// slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            transport,
        }
    }

    /// Builds the absolute URL for a host-relative path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends one request and decodes the JSON response.
    ///
    /// `path` is relative to the host root. The token, when given, travels in
    /// the [`TOKEN_HEADER`] header. `body` is ignored for [`Method::Get`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Remote`] for non-success statuses,
    /// [`ApiError::Transport`] when no response arrives, and
    /// [`ApiError::Decode`] when the body is not valid JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let request = HttpRequest {
            method,
            url: self.url(path),
            query: query
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
            token: token.map(str::to_owned),
            body: match method {
                Method::Get => None,
                Method::Post => body,
            },
        };

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(ApiError::Remote {
                url: request.url,
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|err| ApiError::Decode {
            url: request.url,
            message: err.to_string(),
        })
    }

    /// Queries a collection under [`API_PREFIX`] and decodes each record.
    ///
    /// A `null` payload is treated as an empty collection.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::request`] failures and returns
    /// [`ApiError::Decode`] when the payload is not a list of `R`.
    pub async fn list<R: DeserializeOwned>(
        &self,
        collection: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<R>, ApiError> {
        let path = format!("{API_PREFIX}/{collection}");
        let payload = self
            .request(Method::Get, &path, Some(token), None, query)
            .await?;
        if payload.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(payload).map_err(|err| ApiError::Decode {
            url: self.url(&path),
            message: err.to_string(),
        })
    }
}
