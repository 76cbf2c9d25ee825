use super::Authorizer;
use crate::error::AuthResult;
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use secrecy::SecretString;

/// Presents a pre-issued token as-is.
///
/// No network exchange happens; refreshing yields the same token. A vault
/// rejecting the token is only noticed when a secret is read.
#[derive(Debug)]
pub struct AccessTokenAuthorizer {
    token: SecretString,
}

impl AccessTokenAuthorizer {
    /// Wrap a pre-issued token.
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Authorizer for AccessTokenAuthorizer {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::AccessToken
    }

    async fn authorize(&self) -> AuthResult<Session> {
        Ok(Session::static_token(self.token.clone()))
    }
}
