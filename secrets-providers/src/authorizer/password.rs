use super::Authorizer;
use crate::backend::{GrantRequest, VaultBackend};
use crate::error::AuthResult;
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

/// Exchanges a username and password for a token.
#[derive(Debug)]
pub struct PasswordGrantAuthorizer {
    backend: Arc<dyn VaultBackend>,
    username: String,
    password: SecretString,
}

impl PasswordGrantAuthorizer {
    /// Create a password grant authorizer.
    #[must_use]
    pub fn new(
        backend: Arc<dyn VaultBackend>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            backend,
            username: username.into(),
            password,
        }
    }
}

#[async_trait]
impl Authorizer for PasswordGrantAuthorizer {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::PasswordGrant
    }

    async fn authorize(&self) -> AuthResult<Session> {
        self.backend
            .password_grant(GrantRequest {
                username: &self.username,
                password: &self.password,
                domain: None,
            })
            .await
    }
}

/// Exchanges a username and password for a token within a domain.
#[derive(Debug)]
pub struct DomainPasswordGrantAuthorizer {
    backend: Arc<dyn VaultBackend>,
    username: String,
    password: SecretString,
    domain: String,
}

impl DomainPasswordGrantAuthorizer {
    /// Create a domain-scoped password grant authorizer.
    #[must_use]
    pub fn new(
        backend: Arc<dyn VaultBackend>,
        username: impl Into<String>,
        password: SecretString,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            username: username.into(),
            password,
            domain: domain.into(),
        }
    }
}

#[async_trait]
impl Authorizer for DomainPasswordGrantAuthorizer {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::DomainPasswordGrant
    }

    async fn authorize(&self) -> AuthResult<Session> {
        self.backend
            .password_grant(GrantRequest {
                username: &self.username,
                password: &self.password,
                domain: Some(&self.domain),
            })
            .await
    }
}
