//! Vault wire protocols.
//!
//! A [`VaultBackend`] knows how one kind of vault grants tokens and serves
//! secrets. Session handling, caching and retries live above it.

pub mod hashicorp;
pub mod secret_server;

pub use hashicorp::{HashicorpBackend, KvVersion};
pub use secret_server::SecretServerBackend;

use crate::error::{AuthError, AuthResult, ConfigError, ConfigResult};
use crate::secret::SecretDocument;
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use secrecy::SecretString;
use std::fmt;
use url::Url;

/// Credentials for a password grant.
pub struct GrantRequest<'a> {
    /// Login name
    pub username: &'a str,
    /// Password
    pub password: &'a SecretString,
    /// Domain for domain-scoped grants
    pub domain: Option<&'a str>,
}

/// Why a secret read failed, before the provider name is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Vault refused the session token (401/403)
    Rejected,
    /// No secret at this path or id
    NotFound,
    /// Request exceeded the timeout
    Timeout,
    /// Connection failed
    Unreachable(String),
    /// Any other non-success status
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Body could not be parsed
    InvalidResponse(String),
}

impl From<reqwest::Error> for ReadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// One kind of vault.
#[async_trait]
pub trait VaultBackend: Send + Sync + fmt::Debug {
    /// Human-readable vault kind.
    fn kind(&self) -> &'static str;

    /// Base URL requests are issued against.
    fn base_url(&self) -> &Url;

    /// Whether the vault offers the strategy.
    fn supports(&self, strategy: AuthStrategy) -> bool;

    /// Exchange a username and password for a session.
    async fn password_grant(&self, request: GrantRequest<'_>) -> AuthResult<Session>;

    /// Check a path or id before any network call and return its canonical
    /// form, which is both the request target and the cache key.
    ///
    /// # Errors
    ///
    /// Returns the reason the reference is unusable.
    fn normalize_reference(&self, path_or_id: &str) -> Result<String, String> {
        let trimmed = path_or_id.trim();
        if trimmed.is_empty() {
            Err("path or id must not be empty".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// Read every field of a secret using the session's token.
    async fn read_secret(
        &self,
        session: &Session,
        path_or_id: &str,
    ) -> Result<SecretDocument, ReadError>;
}

/// Parse and normalize a base URL (no trailing slash).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] for unparsable or non-HTTP URLs.
pub fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }

    Ok(url)
}

/// Append percent-encoded path segments to a base URL, keeping the base path.
pub(crate) fn endpoint_url<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Url {
    let mut url = base.clone();
    // http(s) base URLs always have a path
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Map a grant transport failure.
pub(crate) fn grant_transport_error(err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::unreachable(format!("timed out: {err}"))
    } else {
        AuthError::unreachable(err.to_string())
    }
}

/// Turn a non-success grant response into an error.
///
/// 4xx means the credentials were refused; anything else is treated as the
/// auth endpoint being unavailable.
pub(crate) async fn grant_failure(response: Response) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if status.is_client_error() {
        AuthError::rejected(status.as_u16(), text)
    } else {
        AuthError::unreachable(format!("Status {status}: {text}"))
    }
}

/// Classify a non-success secret response.
pub(crate) async fn read_failure(response: Response) -> ReadError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ReadError::Rejected,
        StatusCode::NOT_FOUND => ReadError::NotFound,
        _ => ReadError::Status {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        },
    }
}

/// Render a JSON field value as the string stored in a secret field.
pub(crate) fn field_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
