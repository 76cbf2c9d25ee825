//! Credential bundle: validated credential fields for one provider.

use crate::error::{ConfigError, ConfigResult};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Credential fields as they arrive from configuration.
///
/// Every string is optional and an empty string means "not set", so hosts
/// can pass environment lookups through without filtering them.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCredentials {
    /// Login name for password grants
    pub username: Option<String>,
    /// Password for password grants
    pub password: Option<String>,
    /// Pre-issued access token
    pub token: Option<String>,
    /// Domain for domain-scoped password grants
    pub domain: Option<String>,
    /// Cloud tenant name
    pub tenant: Option<String>,
    /// Whether the vault is a cloud tenant rather than a self-hosted URL
    #[serde(deserialize_with = "deserialize_truthy")]
    pub cloud_based: bool,
    /// PEM bundle of extra trusted certificates
    pub ca_bundle_path: Option<String>,
    /// Vault base URL
    #[serde(alias = "url")]
    pub base_url: Option<String>,
}

impl fmt::Debug for RawCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("domain", &self.domain)
            .field("tenant", &self.tenant)
            .field("cloud_based", &self.cloud_based)
            .field("ca_bundle_path", &self.ca_bundle_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Validated, immutable credential fields for one provider.
#[derive(Clone)]
pub struct CredentialBundle {
    username: Option<String>,
    password: Option<SecretString>,
    token: Option<SecretString>,
    domain: Option<String>,
    tenant: Option<String>,
    cloud_based: bool,
    ca_bundle_path: Option<PathBuf>,
    base_url: Option<String>,
}

impl CredentialBundle {
    /// Normalize and validate raw credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTenant`] when `cloud_based` is set
    /// without a tenant.
    pub fn build(raw: RawCredentials) -> ConfigResult<Self> {
        let bundle = Self {
            username: present(raw.username),
            password: present(raw.password).map(SecretString::from),
            token: present(raw.token).map(SecretString::from),
            domain: present(raw.domain),
            tenant: present(raw.tenant),
            cloud_based: raw.cloud_based,
            ca_bundle_path: present(raw.ca_bundle_path).map(PathBuf::from),
            base_url: present(raw.base_url),
        };

        if bundle.cloud_based && bundle.tenant.is_none() {
            return Err(ConfigError::MissingTenant);
        }

        Ok(bundle)
    }

    /// Deserialize a configuration mapping and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the mapping has the wrong shape,
    /// or any error of [`CredentialBundle::build`].
    pub fn from_mapping(raw_config: serde_json::Value) -> ConfigResult<Self> {
        Self::build(serde_json::from_value(raw_config)?)
    }

    /// Login name, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password, if set.
    #[must_use]
    pub const fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Pre-issued token, if set.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Domain, if set.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Cloud tenant, if set.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Whether the vault is a cloud tenant.
    #[must_use]
    pub const fn cloud_based(&self) -> bool {
        self.cloud_based
    }

    /// Extra trusted certificates, if set.
    #[must_use]
    pub fn ca_bundle_path(&self) -> Option<&Path> {
        self.ca_bundle_path.as_deref()
    }

    /// Base URL, if set.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("username", &self.username)
            .field("password", &self.password.is_some())
            .field("token", &self.token.is_some())
            .field("domain", &self.domain)
            .field("tenant", &self.tenant)
            .field("cloud_based", &self.cloud_based)
            .field("ca_bundle_path", &self.ca_bundle_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Interpret a configuration value as a boolean.
///
/// Accepts JSON booleans, numbers (non-zero is true) and the strings
/// `true`/`yes`/`on`/`1` in any case. Anything else is false.
fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Truthy {
        Bool(bool),
        Int(i64),
        Text(String),
        Null(()),
    }

    Ok(match Truthy::deserialize(deserializer)? {
        Truthy::Bool(b) => b,
        Truthy::Int(n) => n != 0,
        Truthy::Text(s) => is_truthy(&s),
        Truthy::Null(()) => false,
    })
}

/// Whether a configuration string means "enabled".
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1" | "y" | "t"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_empty_strings_are_absent() {
        let bundle = CredentialBundle::from_mapping(json!({
            "username": "svc",
            "password": "",
            "token": "   ",
            "domain": "",
        }))
        .unwrap();

        assert_eq!(bundle.username(), Some("svc"));
        assert!(bundle.password().is_none());
        assert!(bundle.token().is_none());
        assert!(bundle.domain().is_none());
    }

    #[test]
    fn test_cloud_without_tenant_rejected() {
        let err = CredentialBundle::from_mapping(json!({
            "cloud_based": true,
            "tenant": "",
            "token": "abc123",
        }))
        .unwrap_err();

        assert!(matches!(err, ConfigError::MissingTenant));
    }

    #[test]
    fn test_cloud_with_tenant_accepted() {
        let bundle = CredentialBundle::from_mapping(json!({
            "cloud_based": "True",
            "tenant": "acme",
        }))
        .unwrap();

        assert!(bundle.cloud_based());
        assert_eq!(bundle.tenant(), Some("acme"));
    }

    #[test]
    fn test_cloud_based_string_values() {
        for (value, expected) in [
            (json!("false"), false),
            (json!("0"), false),
            (json!(""), false),
            (json!(null), false),
            (json!("yes"), true),
            (json!(1), true),
            (json!(true), true),
        ] {
            let raw: RawCredentials =
                serde_json::from_value(json!({ "cloud_based": value })).unwrap();
            assert_eq!(raw.cloud_based, expected, "value {value}");
        }
    }

    #[test]
    fn test_url_alias() {
        let bundle = CredentialBundle::from_mapping(json!({
            "url": "http://vault:8200",
            "token": "nautobot",
        }))
        .unwrap();

        assert_eq!(bundle.base_url(), Some("http://vault:8200"));
        assert_eq!(bundle.token().unwrap().expose_secret(), "nautobot");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let raw: RawCredentials = serde_json::from_value(json!({
            "username": "svc",
            "password": "hunter2-password",
            "token": "tok-123456",
        }))
        .unwrap();
        let raw_debug = format!("{raw:?}");
        assert!(!raw_debug.contains("hunter2-password"));
        assert!(!raw_debug.contains("tok-123456"));

        let bundle = CredentialBundle::build(raw).unwrap();
        let debug = format!("{bundle:?}");
        assert!(!debug.contains("hunter2-password"));
        assert!(!debug.contains("tok-123456"));
        assert!(debug.contains("svc"));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let err = CredentialBundle::from_mapping(json!({ "username": ["a", "b"] })).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
