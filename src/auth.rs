//! API token acquisition.
//!
//! A configured token is trusted as-is. Otherwise the resolver logs in with
//! the configured user and password. The token endpoint lives under `/api`
//! on most appliances and at the host root on others, so both locations are
//! tried in order, each exactly once.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, Method, Transport};
use crate::credentials::Credentials;

/// Token issuance paths, in the order they are attempted.
pub const TOKEN_PATHS: [&str; 2] = ["/api/sys/tokens", "/sys/tokens"];

/// Field of the issuance response holding the token.
const TOKEN_FIELD: &str = "$key";

/// Errors raised while obtaining an API token.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AuthError {
    /// Raised when neither a token nor a login/password pair is configured.
    #[error(
        "no API token or login configured: set VERGEOS_TOKEN, or VERGEOS_USER and VERGEOS_PASS"
    )]
    MissingCredentials,
    /// Raised when every issuance path failed.
    #[error("authentication failed: {}", render_attempts(.attempts))]
    Rejected {
        /// One entry per attempted path, in attempt order.
        attempts: Vec<ApiError>,
    },
}

fn render_attempts(attempts: &[ApiError]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Produces the bearer token for a run.
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    credentials: Credentials,
    token_paths: Vec<String>,
}

impl CredentialResolver {
    /// Creates a resolver that tries [`TOKEN_PATHS`] when logging in.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token_paths: TOKEN_PATHS.iter().map(|path| (*path).to_owned()).collect(),
        }
    }

    /// Replaces the ordered list of issuance paths.
    #[must_use]
    pub fn with_token_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.token_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Returns a token, logging in when none was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] when no token, user, or
    /// password is available and [`AuthError::Rejected`] when every issuance
    /// path fails.
    pub async fn resolve<T: Transport>(&self, client: &ApiClient<T>) -> Result<String, AuthError> {
        if let Some(token) = &self.credentials.token {
            debug!("using configured API token");
            return Ok(token.clone());
        }

        let (Some(user), Some(password)) = (&self.credentials.user, &self.credentials.password)
        else {
            return Err(AuthError::MissingCredentials);
        };

        info!("authenticating as {user}");
        let body = json!({ "login": user, "password": password });
        let mut attempts = Vec::with_capacity(self.token_paths.len());
        for path in &self.token_paths {
            match Self::request_token(client, path, &body).await {
                Ok(token) => {
                    debug!("token issued by {path}");
                    return Ok(token);
                }
                Err(err) => {
                    warn!("token request to {path} failed: {err}");
                    attempts.push(err);
                }
            }
        }

        Err(AuthError::Rejected { attempts })
    }

    async fn request_token<T: Transport>(
        client: &ApiClient<T>,
        path: &str,
        body: &Value,
    ) -> Result<String, ApiError> {
        let response = client
            .request(Method::Post, path, None, Some(body.clone()), &[])
            .await?;
        extract_token(&response).ok_or_else(|| ApiError::Decode {
            url: client.url(path),
            message: format!("response lacks a `{TOKEN_FIELD}` token"),
        })
    }
}

fn extract_token(response: &Value) -> Option<String> {
    match response.get(TOKEN_FIELD)? {
        Value::String(token) if !token.trim().is_empty() => Some(token.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
