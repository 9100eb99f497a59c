//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default management host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "192.168.1.111";
/// Token file consulted when no token file is configured.
pub const DEFAULT_TOKEN_FILE: &str = "~/.vergeos-token";
/// Credentials file consulted when no credentials file is configured.
pub const DEFAULT_CREDENTIALS_FILE: &str = "~/.vergeos-credentials";

/// Connection and credential settings for the VergeOS management API,
/// derived from environment variables and configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "VERGEOS",
    discovery(
        app_name = "verge-ip",
        env_var = "VERGE_IP_CONFIG_PATH",
        config_file_name = "verge-ip.toml",
        dotfile_name = ".verge-ip.toml",
        project_file_name = "verge-ip.toml"
    )
)]
pub struct VergeConfig {
    /// Management host name or address. A value without a scheme is reached
    /// over HTTPS; `http://` and `https://` prefixes are honoured verbatim.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    pub host: String,
    /// Pre-issued API token. When present it is used without verification
    /// and no login request is made.
    pub token: Option<String>,
    /// Login name used to request a token.
    pub user: Option<String>,
    /// Password paired with [`Self::user`].
    pub pass: Option<String>,
    /// File holding a pre-issued token, consulted when [`Self::token`] is
    /// unset. Supports `~/` expansion; falls back to [`DEFAULT_TOKEN_FILE`].
    pub token_file: Option<String>,
    /// Shell-style credentials file (`VERGEOS_PASS="..."`) consulted when
    /// [`Self::pass`] is unset. Supports `~/` expansion; falls back to
    /// [`DEFAULT_CREDENTIALS_FILE`].
    pub credentials_file: Option<String>,
    /// Validate the appliance's TLS certificate. VergeOS appliances usually
    /// serve a self-signed certificate, so validation is off unless enabled.
    #[ortho_config(default = false)]
    pub verify_tls: bool,
    /// Pause between unsuccessful lookups while waiting, in seconds.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound for a single HTTP exchange, in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn guidance(&self) -> String {
        format!(
            "set {} or add {} to verge-ip.toml",
            self.env_var, self.toml_key
        )
    }
}

impl VergeConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.guidance()
            )));
        }
        Ok(())
    }

    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: {}",
                metadata.description,
                metadata.guidance()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("verge-ip")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply the offending value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the host is blank and
    /// [`ConfigError::Invalid`] when a duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.host,
            &FieldMetadata::new("VergeOS host", "VERGEOS_HOST", "host"),
        )?;
        Self::require_positive(
            self.poll_interval_secs,
            &FieldMetadata::new(
                "poll interval",
                "VERGEOS_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            ),
        )?;
        Self::require_positive(
            self.request_timeout_secs,
            &FieldMetadata::new(
                "request timeout",
                "VERGEOS_REQUEST_TIMEOUT_SECS",
                "request_timeout_secs",
            ),
        )?;
        Ok(())
    }

    /// Returns the root URL of the management service, without a trailing
    /// slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_owned()
        } else {
            format!("https://{host}")
        }
    }

    /// Whether invalid or self-signed certificates are accepted.
    #[must_use]
    pub const fn accept_invalid_certs(&self) -> bool {
        !self.verify_tls
    }

    /// Token file to consult, configured or default.
    #[must_use]
    pub fn token_file_path(&self) -> &str {
        self.token_file.as_deref().unwrap_or(DEFAULT_TOKEN_FILE)
    }

    /// Credentials file to consult, configured or default.
    #[must_use]
    pub fn credentials_file_path(&self) -> &str {
        self.credentials_file
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIALS_FILE)
    }

    /// Pause between unsuccessful lookups.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound for a single HTTP exchange.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
