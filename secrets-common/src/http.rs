//! HTTP client configuration and building.
//!
//! Every vault gets its own client so timeouts and trusted roots can be
//! configured per provider.

use crate::error::HttpClientError;
use reqwest::{Certificate, Client, ClientBuilder};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Extra PEM bundle of trusted root certificates
    pub ca_bundle_path: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("secrets-providers/", env!("CARGO_PKG_VERSION")).to_string(),
            ca_bundle_path: None,
        }
    }
}

impl HttpConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Trust the certificates in the given PEM bundle.
    #[must_use]
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle_path = Some(path.into());
        self
    }
}

/// Build a configured HTTP client.
///
/// Uses rustls and adds the certificates of `ca_bundle_path`, if set, as
/// trusted roots.
///
/// # Errors
///
/// Returns an error if the CA bundle cannot be read or holds no
/// certificates, or if the client cannot be built.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, HttpClientError> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls();

    if let Some(path) = &config.ca_bundle_path {
        for cert in load_ca_bundle(path)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}

fn load_ca_bundle(path: &PathBuf) -> Result<Vec<Certificate>, HttpClientError> {
    let pem = std::fs::read(path).map_err(|source| HttpClientError::CaBundleRead {
        path: path.clone(),
        source,
    })?;

    let certs = Certificate::from_pem_bundle(&pem)
        .map_err(|e| HttpClientError::invalid_ca_bundle(path.clone(), e.to_string()))?;

    if certs.is_empty() {
        return Err(HttpClientError::invalid_ca_bundle(
            path.clone(),
            "no PEM certificates found",
        ));
    }

    tracing::debug!(path = %path.display(), count = certs.len(), "Loaded CA bundle");
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert!(config.ca_bundle_path.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent")
            .with_ca_bundle("/etc/ssl/bundle.pem");

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.ca_bundle_path, Some(PathBuf::from("/etc/ssl/bundle.pem")));
    }

    #[test]
    fn test_build_client() {
        let result = build_http_client(&HttpConfig::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_ca_bundle_rejected() {
        let config = HttpConfig::default().with_ca_bundle("/nonexistent/ca-bundle.pem");
        let err = build_http_client(&config).unwrap_err();
        assert!(matches!(err, HttpClientError::CaBundleRead { .. }));
    }

    #[test]
    fn test_ca_bundle_without_certificates_rejected() {
        let path = std::env::temp_dir().join(format!("empty-bundle-{}.pem", std::process::id()));
        std::fs::write(&path, b"not a certificate").unwrap();

        let err = build_http_client(&HttpConfig::default().with_ca_bundle(&path)).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, HttpClientError::InvalidCaBundle { .. }));
    }
}
