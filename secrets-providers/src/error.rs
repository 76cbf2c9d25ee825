//! Error types for provider configuration, authorization and secret reads.
//!
//! Configuration errors are fatal at startup. Authorization and secret
//! errors are `Clone` because a single vault read may be awaited by many
//! callers at once.

use crate::selector::AuthStrategy;
use secrets_common::{HttpClientError, Retryable};
use thiserror::Error;

/// Invalid provider configuration, reported at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Cloud deployment without a tenant
    #[error("tenant is required when cloud_based is true")]
    MissingTenant,

    /// No authorization strategy matches the credential fields
    #[error("no valid authorization method: provide username and password, or a token")]
    NoValidAuthorizationMethod,

    /// On-premise deployment without a base URL
    #[error("base_url is required")]
    MissingBaseUrl,

    /// Base URL could not be parsed
    #[error("invalid base_url {url}: {reason}")]
    InvalidBaseUrl {
        /// The configured URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Selected strategy is not offered by the vault
    #[error("{backend} does not support the {strategy} authorization method")]
    UnsupportedStrategy {
        /// Selected strategy
        strategy: AuthStrategy,
        /// Vault kind
        backend: &'static str,
    },

    /// Provider name does not map to a known vault kind
    #[error("cannot infer vault kind for provider {0:?}; set `kind` explicitly")]
    UnknownProviderKind(String),

    /// HTTP client setup failed (CA bundle, TLS)
    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] HttpClientError),

    /// Configuration value has the wrong shape
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to obtain a session from a vault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Network failure or timeout talking to the auth endpoint
    #[error("vault auth endpoint unreachable: {0}")]
    Unreachable(String),

    /// Vault refused the credentials
    #[error("vault rejected credentials (status {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// A pre-issued token was rejected on use and cannot be renewed
    #[error("static access token was rejected and cannot be refreshed")]
    StaticTokenCannotRefresh,

    /// Grant succeeded but the response could not be understood
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),

    /// Strategy is not offered by the vault
    #[error("authorization method {0} is not supported by this vault")]
    UnsupportedStrategy(AuthStrategy),
}

impl AuthError {
    /// Create an unreachable error.
    #[must_use]
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a rejected error.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl Retryable for AuthError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Result type for authorization.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure to read a secret. Always names the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Read rejected even after a fresh session
    #[error("[{provider}] unauthorized to read {path}")]
    Unauthorized {
        /// Provider name
        provider: String,
        /// Secret path or id
        path: String,
    },

    /// Read exceeded the configured timeout
    #[error("[{provider}] timed out reading {path}")]
    Timeout {
        /// Provider name
        provider: String,
        /// Secret path or id
        path: String,
    },

    /// Secret does not exist
    #[error("[{provider}] secret not found: {path}")]
    NotFound {
        /// Provider name
        provider: String,
        /// Secret path or id
        path: String,
    },

    /// Secret exists but has no such field
    #[error("[{provider}] secret {path} has no field {field:?}")]
    FieldNotFound {
        /// Provider name
        provider: String,
        /// Secret path or id
        path: String,
        /// Requested field
        field: String,
    },

    /// Reference is empty or malformed for this vault
    #[error("[{provider}] invalid secret reference: {reason}")]
    InvalidReference {
        /// Provider name
        provider: String,
        /// Why the reference was rejected
        reason: String,
    },

    /// Network failure talking to the secret endpoint
    #[error("[{provider}] vault unreachable: {message}")]
    Unreachable {
        /// Provider name
        provider: String,
        /// Transport message
        message: String,
    },

    /// Unexpected HTTP status from the vault
    #[error("[{provider}] vault returned status {status}: {message}")]
    Vault {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response body could not be understood
    #[error("[{provider}] invalid secret response: {message}")]
    InvalidResponse {
        /// Provider name
        provider: String,
        /// Parser message
        message: String,
    },

    /// Session could not be established
    #[error("[{provider}] authorization failed: {source}")]
    Auth {
        /// Provider name
        provider: String,
        /// Underlying authorization error
        #[source]
        source: AuthError,
    },
}

impl SecretError {
    /// Name of the provider the error originated from.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Unauthorized { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::FieldNotFound { provider, .. }
            | Self::InvalidReference { provider, .. }
            | Self::Unreachable { provider, .. }
            | Self::Vault { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::Auth { provider, .. } => provider,
        }
    }
}

impl Retryable for SecretError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Unreachable { .. } => true,
            Self::Vault { status, .. } => *status >= 500,
            Self::Auth { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for secret reads.
pub type SecretResult<T> = Result<T, SecretError>;

/// Provider registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No provider registered under this name
    #[error("unknown secrets provider: {0}")]
    UnknownProvider(String),

    /// A provider with this name is already registered
    #[error("secrets provider registered twice: {0}")]
    DuplicateProvider(String),

    /// A configured provider could not be built
    #[error("secrets provider {provider} misconfigured: {source}")]
    Config {
        /// Provider name
        provider: String,
        /// Underlying configuration error
        #[source]
        source: ConfigError,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Any error surfaced by the public entry points.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Registry lookup or construction failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Secret read failed
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Configuration was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}
