//! Provider registry: provider names to ready secret clients.

use crate::client::SecretClient;
use crate::config::ProvidersConfig;
use crate::error::{ProviderError, RegistryError, RegistryResult};
use crate::secret::{SecretRef, SecretValue};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, instrument};

/// Collects clients before the registry is sealed.
#[derive(Default)]
pub struct RegistryBuilder {
    clients: HashMap<String, SecretClient>,
}

impl RegistryBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProvider`] if the name is taken.
    pub fn register(
        mut self,
        name: impl Into<String>,
        client: SecretClient,
    ) -> RegistryResult<Self> {
        let name = name.into();
        if self.clients.contains_key(&name) {
            return Err(RegistryError::DuplicateProvider(name));
        }
        self.clients.insert(name, client);
        Ok(self)
    }

    /// Seal the registry.
    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            clients: self.clients,
        }
    }
}

/// Read-only mapping of provider names to clients.
///
/// Built once at startup; share it behind an `Arc`.
pub struct ProviderRegistry {
    clients: HashMap<String, SecretClient>,
}

impl ProviderRegistry {
    /// Start building a registry by hand.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build a client for every configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] naming the first provider whose
    /// settings are invalid.
    pub fn from_config(config: &ProvidersConfig) -> RegistryResult<Self> {
        let mut builder = RegistryBuilder::new();
        for (name, settings) in config.iter() {
            let client = SecretClient::from_settings(name, settings).map_err(|source| {
                RegistryError::Config {
                    provider: name.to_string(),
                    source,
                }
            })?;
            builder = builder.register(name, client)?;
        }

        let registry = builder.build();
        info!(providers = ?registry.providers(), "Secrets providers ready");
        Ok(registry)
    }

    /// The client registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`] for unregistered names.
    pub fn resolve(&self, name: &str) -> RegistryResult<&SecretClient> {
        self.clients
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the reference's provider and read the secret.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Registry`] for unknown providers and
    /// [`ProviderError::Secret`] when the read fails.
    #[instrument(skip(self, secret), fields(provider = %secret.provider_name))]
    pub async fn get_secret(&self, secret: &SecretRef) -> Result<SecretValue, ProviderError> {
        let client = self.resolve(&secret.provider_name)?;
        Ok(client.get_secret(secret).await?)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::PasswordGrantAuthorizer;
    use crate::bundle::RawCredentials;
    use crate::client::ClientOptions;
    use crate::config::{ProviderKind, ProviderSettings};
    use crate::error::{ConfigError, SecretError};
    use crate::selector::AuthStrategy;
    use crate::testing::MockBackend;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn mock_client(name: &str) -> SecretClient {
        let backend = Arc::new(MockBackend::new().with_secret("db", &[("password", "s3cr3t")]));
        let authorizer = Arc::new(PasswordGrantAuthorizer::new(
            backend.clone(),
            "svc",
            SecretString::from("pw"),
        ));
        SecretClient::new(name, backend, authorizer, ClientOptions::default())
    }

    fn credentials(fields: serde_json::Value) -> RawCredentials {
        serde_json::from_value(fields).unwrap()
    }

    #[tokio::test]
    async fn test_get_secret_through_registry() {
        let registry = ProviderRegistry::builder()
            .register("thycotic", mock_client("thycotic"))
            .unwrap()
            .build();

        let value = registry
            .get_secret(&SecretRef::new("thycotic", "db").with_field("password"))
            .await
            .unwrap();

        assert_eq!(value.expose(), b"s3cr3t");
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let registry = ProviderRegistry::builder()
            .register("thycotic", mock_client("thycotic"))
            .unwrap()
            .build();

        let err = registry
            .get_secret(&SecretRef::new("aws", "db"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Registry(RegistryError::UnknownProvider(ref name)) if name == "aws"
        ));
    }

    #[tokio::test]
    async fn test_secret_errors_pass_through() {
        let registry = ProviderRegistry::builder()
            .register("thycotic", mock_client("thycotic"))
            .unwrap()
            .build();

        let err = registry
            .get_secret(&SecretRef::new("thycotic", "missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Secret(SecretError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_registration() {
        let result = ProviderRegistry::builder()
            .register("vault", mock_client("vault"))
            .unwrap()
            .register("vault", mock_client("vault"));

        assert!(matches!(
            result,
            Err(RegistryError::DuplicateProvider(ref name)) if name == "vault"
        ));
    }

    #[test]
    fn test_from_config() {
        let config = ProvidersConfig::default()
            .with_provider(
                "thycotic",
                ProviderSettings::new(
                    ProviderKind::Thycotic,
                    credentials(serde_json::json!({
                        "username": "svc",
                        "password": "pw",
                        "domain": "CORP",
                        "base_url": "https://ss.internal/SecretServer"
                    })),
                ),
            )
            .with_provider(
                "hashicorp_vault",
                ProviderSettings {
                    credentials: credentials(serde_json::json!({
                        "token": "hvs.abc",
                        "url": "https://vault.internal:8200"
                    })),
                    ..Default::default()
                },
            );

        let registry = ProviderRegistry::from_config(&config).unwrap();

        assert_eq!(registry.providers(), vec!["hashicorp_vault", "thycotic"]);
        assert_eq!(
            registry.resolve("thycotic").unwrap().strategy(),
            AuthStrategy::DomainPasswordGrant
        );
        assert_eq!(
            registry.resolve("hashicorp_vault").unwrap().strategy(),
            AuthStrategy::AccessToken
        );
    }

    #[test]
    fn test_from_config_names_failing_provider() {
        let config = ProvidersConfig::default().with_provider(
            "thycotic",
            ProviderSettings::new(
                ProviderKind::Thycotic,
                credentials(serde_json::json!({
                    "username": "svc",
                    "password": "pw",
                    "cloud_based": true
                })),
            ),
        );

        let err = ProviderRegistry::from_config(&config).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Config {
                ref provider,
                source: ConfigError::MissingTenant,
            } if provider == "thycotic"
        ));
    }

    #[test]
    fn test_from_config_unknown_kind() {
        let config = ProvidersConfig::default().with_provider(
            "aws",
            ProviderSettings {
                credentials: credentials(serde_json::json!({ "token": "abc" })),
                ..Default::default()
            },
        );

        let err = ProviderRegistry::from_config(&config).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Config { source: ConfigError::UnknownProviderKind(_), .. }
        ));
    }

    #[test]
    fn test_from_config_domain_grant_unsupported_by_hashicorp() {
        let config = ProvidersConfig::default().with_provider(
            "hashicorp_vault",
            ProviderSettings {
                credentials: credentials(serde_json::json!({
                    "username": "svc",
                    "password": "pw",
                    "domain": "CORP",
                    "url": "https://vault.internal:8200"
                })),
                ..Default::default()
            },
        );

        let err = ProviderRegistry::from_config(&config).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Config {
                source: ConfigError::UnsupportedStrategy {
                    strategy: AuthStrategy::DomainPasswordGrant,
                    ..
                },
                ..
            }
        ));
    }
}
