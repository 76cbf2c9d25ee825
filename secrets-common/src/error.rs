//! Shared error types and retryability classification.
//!
//! Every provider error type implements [`Retryable`] so the shared
//! [`RetryPolicy`](crate::RetryPolicy) can decide whether a failed
//! operation is worth another attempt.

use std::path::PathBuf;
use thiserror::Error;

/// Classification of an error as transient or permanent.
pub trait Retryable {
    /// Check if this error is transient and the operation may succeed on retry.
    fn is_retryable(&self) -> bool;
}

/// Errors raised while building an HTTP client for a vault.
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// The CA bundle file could not be read
    #[error("Failed to read CA bundle {path}: {source}")]
    CaBundleRead {
        /// Path of the bundle
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle did not contain usable PEM certificates
    #[error("Invalid CA bundle {path}: {reason}")]
    InvalidCaBundle {
        /// Path of the bundle
        path: PathBuf,
        /// Why the bundle was rejected
        reason: String,
    },

    /// The underlying client could not be built
    #[error("HTTP client build failed: {0}")]
    Build(#[from] reqwest::Error),
}

impl HttpClientError {
    /// Create an invalid CA bundle error.
    #[must_use]
    pub fn invalid_ca_bundle(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidCaBundle {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl Retryable for HttpClientError {
    fn is_retryable(&self) -> bool {
        false
    }
}
