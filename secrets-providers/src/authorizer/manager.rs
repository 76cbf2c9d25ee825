//! Shared session state for one authorizer.

use super::Authorizer;
use crate::error::AuthResult;
use crate::selector::AuthStrategy;
use crate::session::{DEFAULT_SAFETY_MARGIN, Session};
use secrets_common::{RetryConfig, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Holds the current session of an authorizer for all callers.
///
/// At most one authorization exchange is in flight at a time; callers that
/// arrive while it runs wait and reuse its session.
#[derive(Debug)]
pub struct SessionManager {
    authorizer: Arc<dyn Authorizer>,
    current: RwLock<Option<Arc<Session>>>,
    exchange: Mutex<()>,
    margin: Duration,
    retry: RetryPolicy,
}

impl SessionManager {
    /// Manage sessions of `authorizer` with the default safety margin.
    #[must_use]
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            authorizer,
            current: RwLock::new(None),
            exchange: Mutex::new(()),
            margin: DEFAULT_SAFETY_MARGIN,
            retry: RetryPolicy::new(RetryConfig::default()),
        }
    }

    /// Set the margin before expiry at which sessions are replaced.
    #[must_use]
    pub const fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// Set the retry policy for unreachable auth endpoints.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Strategy of the managed authorizer.
    #[must_use]
    pub fn strategy(&self) -> AuthStrategy {
        self.authorizer.strategy()
    }

    /// Whether a session can still be used.
    #[must_use]
    pub fn is_valid(&self, session: &Session) -> bool {
        session.is_valid(self.margin)
    }

    /// A usable session, authorizing first if there is none or it expired.
    ///
    /// # Errors
    ///
    /// Returns the authorizer's error once retries are exhausted.
    #[instrument(skip(self), fields(strategy = %self.strategy()))]
    pub async fn session(&self) -> AuthResult<Arc<Session>> {
        if let Some(session) = self.valid_session().await {
            return Ok(session);
        }

        let _exchange = self.exchange.lock().await;
        if let Some(session) = self.valid_session().await {
            debug!("Reusing session established by a concurrent caller");
            return Ok(session);
        }

        self.establish(false).await
    }

    /// Replace a session the vault rejected.
    ///
    /// If another caller already replaced `rejected`, its session is
    /// returned instead of authorizing again.
    ///
    /// # Errors
    ///
    /// Returns the authorizer's error once retries are exhausted.
    #[instrument(skip(self, rejected), fields(strategy = %self.strategy()))]
    pub async fn refresh(&self, rejected: &Arc<Session>) -> AuthResult<Arc<Session>> {
        let _exchange = self.exchange.lock().await;

        if let Some(current) = self.current.read().await.clone() {
            if !Arc::ptr_eq(&current, rejected) && self.is_valid(&current) {
                debug!("Session already refreshed by a concurrent caller");
                return Ok(current);
            }
        }

        self.current.write().await.take();
        self.establish(true).await
    }

    /// Drop the current session so the next call authorizes again.
    pub async fn invalidate(&self) {
        self.current.write().await.take();
    }

    async fn valid_session(&self) -> Option<Arc<Session>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|session| self.is_valid(session))
            .cloned()
    }

    /// Run the exchange. Callers hold `exchange`.
    async fn establish(&self, refresh: bool) -> AuthResult<Arc<Session>> {
        let authorizer = &self.authorizer;
        let result = self
            .retry
            .execute(|| async move {
                if refresh {
                    authorizer.refresh().await
                } else {
                    authorizer.authorize().await
                }
            })
            .await;

        match result {
            Ok(session) => {
                let session = Arc::new(session);
                *self.current.write().await = Some(Arc::clone(&session));
                info!(refresh, "Vault session established");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, refresh, "Vault authorization failed");
                Err(e)
            }
        }
    }
}
