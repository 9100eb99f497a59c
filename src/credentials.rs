//! Local credential sources.
//!
//! A token or password can come from configuration directly or from a file
//! on disk. Each place is modelled as a [`CredentialSource`]; callers list the
//! sources in priority order and [`first_available`] returns the first one
//! that yields a non-empty value.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::config::VergeConfig;

/// Key looked up in shell-style credentials files.
pub const PASSWORD_KEY: &str = "VERGEOS_PASS";

/// Errors raised while reading credential files.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// Raised when a credential file exists but cannot be read.
    #[error("failed to read credential file `{path}`: {message}")]
    FileRead {
        /// Expanded path that failed to read.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
}

/// One place a secret may be found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CredentialSource {
    /// Value supplied directly through configuration.
    Explicit(Option<String>),
    /// File whose entire trimmed contents are the secret.
    File(Utf8PathBuf),
    /// Shell-style `KEY="value"` file searched for a single key.
    KeyedFile {
        /// File to search.
        path: Utf8PathBuf,
        /// Variable name whose value is returned.
        key: String,
    },
}

impl CredentialSource {
    /// Builds a [`Self::File`] source, expanding a leading `~/`.
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::File(expand_tilde(path))
    }

    /// Builds a [`Self::KeyedFile`] source, expanding a leading `~/`.
    #[must_use]
    pub fn keyed_file(path: &str, key: impl Into<String>) -> Self {
        Self::KeyedFile {
            path: expand_tilde(path),
            key: key.into(),
        }
    }

    /// Returns the secret held by this source, if any.
    ///
    /// Blank values and missing files both yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::FileRead`] when a file exists but cannot be
    /// read.
    pub fn lookup(&self) -> Result<Option<String>, CredentialError> {
        match self {
            Self::Explicit(value) => Ok(non_blank(value.as_deref())),
            Self::File(path) => {
                Ok(read_optional(path)?.and_then(|content| non_blank(Some(&content))))
            }
            Self::KeyedFile { path, key } => Ok(read_optional(path)?
                .and_then(|content| find_key(&content, key))
                .and_then(|value| non_blank(Some(&value)))),
        }
    }
}

/// Returns the first non-empty value produced by `sources`, in order.
///
/// # Errors
///
/// Returns the first [`CredentialError`] raised while consulting a source
/// that precedes any successful lookup.
pub fn first_available(sources: &[CredentialSource]) -> Result<Option<String>, CredentialError> {
    for source in sources {
        if let Some(value) = source.lookup()? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Secrets gathered from configuration and credential files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Credentials {
    /// Pre-issued API token.
    pub token: Option<String>,
    /// Login name.
    pub user: Option<String>,
    /// Password for [`Self::user`].
    pub password: Option<String>,
}

impl Credentials {
    /// Collects credentials from the configured sources.
    ///
    /// The token comes from the explicit value and then the token file; the
    /// password from the explicit value and then the credentials file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when a configured file cannot be read.
    pub fn from_config(config: &VergeConfig) -> Result<Self, CredentialError> {
        let token_sources = [
            CredentialSource::Explicit(config.token.clone()),
            CredentialSource::file(config.token_file_path()),
        ];
        let password_sources = [
            CredentialSource::Explicit(config.pass.clone()),
            CredentialSource::keyed_file(config.credentials_file_path(), PASSWORD_KEY),
        ];

        Ok(Self {
            token: first_available(&token_sources)?,
            user: non_blank(config.user.as_deref()),
            password: first_available(&password_sources)?,
        })
    }
}

/// Extracts the value assigned to `key` in shell-style `KEY=value` text.
///
/// Lines may be prefixed with `export`; matching single or double quotes
/// around the value are removed. Comment lines are ignored.
#[must_use]
pub fn find_key(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            return None;
        }
        let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let (name, value) = assignment.split_once('=')?;
        (name.trim() == key).then(|| unquote(value.trim()).to_owned())
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

fn expand_tilde(path: &str) -> Utf8PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return Utf8PathBuf::from(format!("{}/{rest}", home.to_string_lossy()));
    }
    Utf8PathBuf::from(path)
}

fn read_optional(path: &Utf8Path) -> Result<Option<String>, CredentialError> {
    match read_to_string_ambient(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CredentialError::FileRead {
            path: path.to_owned(),
            message: err.to_string(),
        }),
    }
}

fn read_to_string_ambient(path: &Utf8Path) -> io::Result<String> {
    let (dir_path, file_path) = if path.is_absolute() {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path has no parent directory: {path}"),
            )
        })?;
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path has no file name: {path}"),
            )
        })?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path)
    };

    let dir = Dir::open_ambient_dir(dir_path, ambient_authority())?;
    dir.read_to_string(file_path)
}
