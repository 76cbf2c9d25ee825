//! Authorization strategy selection.
//!
//! Precedence over the presence of credential fields:
//!
//! | username | password | token | domain | strategy              |
//! |----------|----------|-------|--------|-----------------------|
//! | set      | set      | any   | unset  | `PasswordGrant`       |
//! | set      | set      | any   | set    | `DomainPasswordGrant` |
//! | unset    | unset    | set   | any    | `AccessToken`         |
//! | set      | unset    | set   | any    | `AccessToken`         |
//! | unset    | set      | set   | any    | `AccessToken`         |
//!
//! Anything else has no valid authorization method.

use crate::bundle::CredentialBundle;
use crate::error::{ConfigError, ConfigResult};
use std::fmt;

/// How a provider authenticates against its vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStrategy {
    /// Username and password exchanged for a token
    PasswordGrant,
    /// Username and password exchanged for a token within a domain
    DomainPasswordGrant,
    /// Pre-issued token used as-is
    AccessToken,
}

impl AuthStrategy {
    /// Stable lowercase name, used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PasswordGrant => "password_grant",
            Self::DomainPasswordGrant => "domain_password_grant",
            Self::AccessToken => "access_token",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which credential fields are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    /// Username is set
    pub username: bool,
    /// Password is set
    pub password: bool,
    /// Token is set
    pub token: bool,
    /// Domain is set
    pub domain: bool,
}

impl Presence {
    /// Presence of the credential fields of a bundle.
    #[must_use]
    pub fn of(bundle: &CredentialBundle) -> Self {
        Self {
            username: bundle.username().is_some(),
            password: bundle.password().is_some(),
            token: bundle.token().is_some(),
            domain: bundle.domain().is_some(),
        }
    }
}

/// Select the strategy for a combination of present fields.
///
/// # Errors
///
/// Returns [`ConfigError::NoValidAuthorizationMethod`] when neither a full
/// username/password pair nor a token is present.
pub const fn select_strategy(presence: Presence) -> ConfigResult<AuthStrategy> {
    match (presence.username, presence.password, presence.token, presence.domain) {
        (true, true, _, false) => Ok(AuthStrategy::PasswordGrant),
        (true, true, _, true) => Ok(AuthStrategy::DomainPasswordGrant),
        (_, _, true, _) => Ok(AuthStrategy::AccessToken),
        _ => Err(ConfigError::NoValidAuthorizationMethod),
    }
}

/// Select the strategy for a credential bundle.
///
/// # Errors
///
/// See [`select_strategy`].
pub fn select(bundle: &CredentialBundle) -> ConfigResult<AuthStrategy> {
    select_strategy(Presence::of(bundle))
}
