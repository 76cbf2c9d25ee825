//! Shared library for cross-cutting concerns of the secret provider crates.
//!
//! This crate provides:
//! - Error retryability classification
//! - HTTP client configuration and building, including custom CA bundles
//! - Retry policies with exponential backoff
//! - Tracing subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use error::{HttpClientError, Retryable};
pub use http::{HttpConfig, build_http_client};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
