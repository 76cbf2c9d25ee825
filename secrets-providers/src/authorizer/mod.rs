//! Authorizers: one per strategy, plus the shared session manager.

mod access_token;
mod manager;
mod password;

pub use access_token::AccessTokenAuthorizer;
pub use manager::SessionManager;
pub use password::{DomainPasswordGrantAuthorizer, PasswordGrantAuthorizer};

use crate::backend::VaultBackend;
use crate::bundle::CredentialBundle;
use crate::error::{AuthResult, ConfigError, ConfigResult};
use crate::selector::{self, AuthStrategy};
use crate::session::Session;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Obtains sessions from a vault using one strategy.
#[async_trait]
pub trait Authorizer: Send + Sync + fmt::Debug {
    /// Strategy this authorizer implements.
    fn strategy(&self) -> AuthStrategy;

    /// Obtain a new session.
    async fn authorize(&self) -> AuthResult<Session>;

    /// Replace a stale or rejected session.
    ///
    /// Always performs a new exchange for grant-based strategies.
    async fn refresh(&self) -> AuthResult<Session> {
        self.authorize().await
    }
}

/// Build the authorizer selected for a bundle.
///
/// # Errors
///
/// Returns [`ConfigError::NoValidAuthorizationMethod`] when no strategy
/// applies and [`ConfigError::UnsupportedStrategy`] when the vault does not
/// offer the selected one.
pub fn for_bundle(
    bundle: &CredentialBundle,
    backend: Arc<dyn VaultBackend>,
) -> ConfigResult<Arc<dyn Authorizer>> {
    let strategy = selector::select(bundle)?;
    if !backend.supports(strategy) {
        return Err(ConfigError::UnsupportedStrategy {
            strategy,
            backend: backend.kind(),
        });
    }

    // select() only returns a strategy whose fields are present
    let missing = || ConfigError::NoValidAuthorizationMethod;

    Ok(match strategy {
        AuthStrategy::PasswordGrant => Arc::new(PasswordGrantAuthorizer::new(
            backend,
            bundle.username().ok_or_else(missing)?,
            bundle.password().ok_or_else(missing)?.clone(),
        )),
        AuthStrategy::DomainPasswordGrant => Arc::new(DomainPasswordGrantAuthorizer::new(
            backend,
            bundle.username().ok_or_else(missing)?,
            bundle.password().ok_or_else(missing)?.clone(),
            bundle.domain().ok_or_else(missing)?,
        )),
        AuthStrategy::AccessToken => Arc::new(AccessTokenAuthorizer::new(
            bundle.token().ok_or_else(missing)?.clone(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HashicorpBackend, KvVersion, SecretServerBackend, parse_base_url};
    use serde_json::json;

    fn secret_server() -> Arc<dyn VaultBackend> {
        Arc::new(SecretServerBackend::new(
            parse_base_url("https://pam.example.com").unwrap(),
            reqwest::Client::new(),
        ))
    }

    fn vault() -> Arc<dyn VaultBackend> {
        Arc::new(HashicorpBackend::new(
            parse_base_url("http://vault:8200").unwrap(),
            "secret",
            KvVersion::V2,
            reqwest::Client::new(),
        ))
    }

    fn bundle(value: serde_json::Value) -> CredentialBundle {
        CredentialBundle::from_mapping(value).unwrap()
    }

    #[test]
    fn test_selected_strategy_is_kept() {
        let cases = [
            (json!({"username": "svc", "password": "pw"}), AuthStrategy::PasswordGrant),
            (
                json!({"username": "svc", "password": "pw", "domain": "corp"}),
                AuthStrategy::DomainPasswordGrant,
            ),
            (json!({"token": "abc123"}), AuthStrategy::AccessToken),
        ];

        for (value, expected) in cases {
            let authorizer = for_bundle(&bundle(value), secret_server()).unwrap();
            assert_eq!(authorizer.strategy(), expected);
        }
    }

    #[test]
    fn test_unsupported_strategy_rejected() {
        let err = for_bundle(
            &bundle(json!({"username": "svc", "password": "pw", "domain": "corp"})),
            vault(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::UnsupportedStrategy {
                strategy: AuthStrategy::DomainPasswordGrant,
                backend: "hashicorp_vault",
            }
        ));
    }

    #[test]
    fn test_no_credentials_rejected() {
        let err = for_bundle(&bundle(json!({})), vault()).unwrap_err();
        assert!(matches!(err, ConfigError::NoValidAuthorizationMethod));
    }
}
