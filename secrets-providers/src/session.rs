//! Vault sessions.

use secrecy::SecretString;
use std::time::{Duration, Instant};

/// Default margin before expiry at which a session stops being used.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(30);

/// An access token obtained from a vault.
///
/// Sessions are never mutated; a refresh produces a new one.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    obtained_at: Instant,
    expires_at: Option<Instant>,
    renewable: bool,
}

impl Session {
    /// Session from a grant that expires after `ttl`.
    #[must_use]
    pub fn expiring(access_token: SecretString, ttl: Duration) -> Self {
        let obtained_at = Instant::now();
        Self {
            access_token,
            obtained_at,
            expires_at: obtained_at.checked_add(ttl),
            renewable: true,
        }
    }

    /// Session from a grant without an expiry (e.g. a zero Vault lease).
    #[must_use]
    pub fn non_expiring(access_token: SecretString) -> Self {
        Self {
            access_token,
            obtained_at: Instant::now(),
            expires_at: None,
            renewable: true,
        }
    }

    /// Session wrapping a pre-issued token that cannot be renewed.
    #[must_use]
    pub fn static_token(access_token: SecretString) -> Self {
        Self {
            access_token,
            obtained_at: Instant::now(),
            expires_at: None,
            renewable: false,
        }
    }

    /// Bearer token presented to the vault.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// When the token was obtained.
    #[must_use]
    pub const fn obtained_at(&self) -> Instant {
        self.obtained_at
    }

    /// When the token expires, if ever.
    #[must_use]
    pub const fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether a new grant can replace this session.
    #[must_use]
    pub const fn is_renewable(&self) -> bool {
        self.renewable
    }

    /// True iff now is before `expires_at - margin`.
    #[must_use]
    pub fn is_valid(&self, margin: Duration) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => Instant::now()
                .checked_add(margin)
                .is_some_and(|deadline| deadline < expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_fresh_session_valid() {
        let session = Session::expiring(SecretString::from("tok"), Duration::from_secs(1200));
        assert!(session.is_valid(DEFAULT_SAFETY_MARGIN));
        assert!(session.is_renewable());
    }

    #[test]
    fn test_session_inside_margin_invalid() {
        let session = Session::expiring(SecretString::from("tok"), Duration::from_secs(20));
        assert!(!session.is_valid(DEFAULT_SAFETY_MARGIN));
        assert!(session.is_valid(Duration::from_secs(5)));
    }

    #[test]
    fn test_expired_session_invalid() {
        let session = Session::expiring(SecretString::from("tok"), Duration::ZERO);
        assert!(!session.is_valid(Duration::ZERO));
    }

    #[test]
    fn test_static_token_never_expires() {
        let session = Session::static_token(SecretString::from("abc123"));
        assert!(session.is_valid(Duration::from_secs(u64::from(u32::MAX))));
        assert!(!session.is_renewable());
        assert_eq!(session.access_token().expose_secret(), "abc123");
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::static_token(SecretString::from("very-secret-token"));
        assert!(!format!("{session:?}").contains("very-secret-token"));
    }
}
