//! Provider configuration.

use crate::backend::KvVersion;
use crate::bundle::RawCredentials;
use crate::client::ClientOptions;
use crate::error::ConfigResult;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Vault product behind a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// HashiCorp Vault
    #[serde(alias = "hashicorp", alias = "vault")]
    HashicorpVault,
    /// Delinea/Thycotic Secret Server
    #[serde(alias = "secret_server")]
    Thycotic,
}

impl ProviderKind {
    /// Kind implied by a conventional provider name.
    #[must_use]
    pub fn infer(provider: &str) -> Option<Self> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "hashicorp_vault" | "hashicorp" | "vault" => Some(Self::HashicorpVault),
            "thycotic" | "secret_server" => Some(Self::Thycotic),
            _ => None,
        }
    }
}

/// Settings of one provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Vault kind; inferred from the provider name when unset
    pub kind: Option<ProviderKind>,
    /// Credential fields
    #[serde(flatten)]
    pub credentials: RawCredentials,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Secret cache TTL in seconds; no caching when unset
    pub cache_ttl_secs: Option<u64>,
    /// Seconds before expiry at which sessions are replaced (default: 30)
    pub session_margin_secs: u64,
    /// HashiCorp KV mount (default: "secret")
    pub mount_point: String,
    /// HashiCorp KV engine version (default: 2)
    pub kv_version: KvVersion,
    /// Top-level domain of Secret Server cloud tenants (default: "com")
    pub tld: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: None,
            credentials: RawCredentials::default(),
            timeout_secs: 30,
            cache_ttl_secs: None,
            session_margin_secs: 30,
            mount_point: "secret".to_string(),
            kv_version: KvVersion::default(),
            tld: "com".to_string(),
        }
    }
}

impl ProviderSettings {
    /// Settings for a vault kind with the given credentials.
    #[must_use]
    pub fn new(kind: ProviderKind, credentials: RawCredentials) -> Self {
        Self {
            kind: Some(kind),
            credentials,
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Enable the secret cache.
    #[must_use]
    pub const fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    /// Set the HashiCorp KV mount and version.
    #[must_use]
    pub fn with_kv(mut self, mount_point: impl Into<String>, kv_version: KvVersion) -> Self {
        self.mount_point = mount_point.into();
        self.kv_version = kv_version;
        self
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client tuning derived from these settings.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            cache_ttl: self.cache_ttl_secs.map(Duration::from_secs),
            session_margin: Duration::from_secs(self.session_margin_secs),
        }
    }
}

/// Provider settings keyed by provider name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig {
    providers: BTreeMap<String, ProviderSettings>,
}

impl ProvidersConfig {
    /// Parse a JSON mapping of provider name to settings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Invalid`] when the mapping has the wrong shape.
    pub fn from_value(value: serde_json::Value) -> ConfigResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Add or replace a provider.
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(name.into(), settings);
        self
    }

    /// Settings of one provider.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    /// Providers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderSettings)> {
        self.providers.iter().map(|(name, settings)| (name.as_str(), settings))
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
