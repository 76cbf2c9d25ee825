//! In-memory authorizer and backend for unit tests.

use crate::authorizer::Authorizer;
use crate::backend::{GrantRequest, ReadError, VaultBackend};
use crate::error::{AuthError, AuthResult};
use crate::secret::{SecretDocument, SecretField};
use crate::selector::AuthStrategy;
use crate::session::Session;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use url::Url;

#[derive(Debug)]
pub struct MockAuthorizer {
    calls: AtomicU32,
    delay: Duration,
    ttl: Duration,
    failure: Option<AuthError>,
}

impl MockAuthorizer {
    pub const fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            ttl: Duration::from_secs(3600),
            failure: None,
        }
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn failing_with(mut self, error: AuthError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    fn strategy(&self) -> AuthStrategy {
        AuthStrategy::PasswordGrant
    }

    async fn authorize(&self) -> AuthResult<Session> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Session::expiring(SecretString::from(format!("token-{n}")), self.ttl)),
        }
    }
}

/// Backend serving secrets from memory and counting network calls.
#[derive(Debug)]
pub struct MockBackend {
    base_url: Url,
    secrets: HashMap<String, Vec<(String, String)>>,
    grants: AtomicU32,
    reads: AtomicU32,
    read_delay: Duration,
    rejections: AtomicU32,
    read_failure: Mutex<Option<ReadError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            base_url: Url::parse("https://vault.test").unwrap(),
            secrets: HashMap::new(),
            grants: AtomicU32::new(0),
            reads: AtomicU32::new(0),
            read_delay: Duration::ZERO,
            rejections: AtomicU32::new(0),
            read_failure: Mutex::new(None),
        }
    }

    pub fn with_secret(mut self, path: &str, fields: &[(&str, &str)]) -> Self {
        self.secrets.insert(
            path.to_string(),
            fields.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        );
        self
    }

    pub const fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Reject the next `n` reads as unauthorized.
    pub fn reject_next_reads(&self, n: u32) {
        self.rejections.store(n, Ordering::SeqCst);
    }

    /// Fail every read with `error`.
    pub fn fail_reads(&self, error: ReadError) {
        *self.read_failure.lock().unwrap() = Some(error);
    }

    pub fn grants(&self) -> u32 {
        self.grants.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VaultBackend for MockBackend {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn supports(&self, _strategy: AuthStrategy) -> bool {
        true
    }

    async fn password_grant(&self, _request: GrantRequest<'_>) -> AuthResult<Session> {
        let n = self.grants.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session::expiring(
            SecretString::from(format!("grant-{n}")),
            Duration::from_secs(3600),
        ))
    }

    async fn read_secret(
        &self,
        _session: &Session,
        path_or_id: &str,
    ) -> Result<SecretDocument, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.read_delay).await;

        let failure = self.read_failure.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }

        let rejected = self
            .rejections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(ReadError::Rejected);
        }

        self.secrets
            .get(path_or_id)
            .map(|fields| {
                SecretDocument::new(
                    fields
                        .iter()
                        .map(|(k, v)| SecretField::new(k.clone(), v.clone()))
                        .collect(),
                )
            })
            .ok_or(ReadError::NotFound)
    }
}
