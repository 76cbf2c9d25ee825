//! Secret client: authorized, cached, single-flight secret reads.

use crate::authorizer::{self, Authorizer, SessionManager};
use crate::backend::{
    HashicorpBackend, ReadError, SecretServerBackend, VaultBackend, parse_base_url,
};
use crate::bundle::CredentialBundle;
use crate::cache::SecretCache;
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::{AuthError, ConfigError, ConfigResult, SecretError, SecretResult};
use crate::secret::{SecretDocument, SecretRef, SecretValue};
use crate::selector::AuthStrategy;
use crate::session::{DEFAULT_SAFETY_MARGIN, Session};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use secrets_common::{HttpConfig, build_http_client};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, instrument, warn};

type InflightRead = Shared<BoxFuture<'static, SecretResult<Arc<SecretDocument>>>>;

/// A read shared by every caller of one key; `id` tells successive reads
/// of the same key apart.
struct Inflight {
    id: u64,
    read: InflightRead,
}

/// Tuning for a [`SecretClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long documents are cached; `None` disables caching
    pub cache_ttl: Option<Duration>,
    /// Margin before expiry at which sessions are replaced
    pub session_margin: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            cache_ttl: None,
            session_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

impl ClientOptions {
    /// Cache documents for `ttl`.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the session safety margin.
    #[must_use]
    pub const fn with_session_margin(mut self, margin: Duration) -> Self {
        self.session_margin = margin;
        self
    }
}

struct Inner {
    provider: String,
    backend: Arc<dyn VaultBackend>,
    sessions: SessionManager,
    cache: SecretCache,
    inflight: Mutex<HashMap<String, Inflight>>,
    next_read: AtomicU64,
}

/// Reads secrets from one vault on behalf of many concurrent callers.
///
/// Cloning is cheap; clones share sessions, cache and in-flight reads.
#[derive(Clone)]
pub struct SecretClient {
    inner: Arc<Inner>,
}

impl SecretClient {
    /// Assemble a client from its parts.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        backend: Arc<dyn VaultBackend>,
        authorizer: Arc<dyn Authorizer>,
        options: ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider: provider.into(),
                backend,
                sessions: SessionManager::new(authorizer).with_margin(options.session_margin),
                cache: SecretCache::new(options.cache_ttl),
                inflight: Mutex::new(HashMap::new()),
                next_read: AtomicU64::new(0),
            }),
        }
    }

    /// Build the client for a configured provider.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found: unknown vault kind,
    /// invalid credentials, missing or invalid URL, unusable CA bundle or a
    /// strategy the vault does not offer.
    pub fn from_settings(provider: &str, settings: &ProviderSettings) -> ConfigResult<Self> {
        let kind = settings
            .kind
            .or_else(|| ProviderKind::infer(provider))
            .ok_or_else(|| ConfigError::UnknownProviderKind(provider.to_string()))?;

        let bundle = CredentialBundle::build(settings.credentials.clone())?;

        let mut http_config = HttpConfig::default().with_timeout(settings.timeout());
        if let Some(path) = bundle.ca_bundle_path() {
            http_config = http_config.with_ca_bundle(path);
        }
        let http = build_http_client(&http_config)?;

        let backend: Arc<dyn VaultBackend> = match kind {
            ProviderKind::HashicorpVault => Arc::new(HashicorpBackend::new(
                parse_base_url(bundle.base_url().ok_or(ConfigError::MissingBaseUrl)?)?,
                settings.mount_point.as_str(),
                settings.kv_version,
                http,
            )),
            ProviderKind::Thycotic => Arc::new(SecretServerBackend::from_bundle(
                &bundle,
                &settings.tld,
                http,
            )?),
        };

        let authorizer = authorizer::for_bundle(&bundle, Arc::clone(&backend))?;
        info!(
            provider,
            kind = backend.kind(),
            strategy = %authorizer.strategy(),
            base_url = %backend.base_url(),
            "Configured secrets provider"
        );

        Ok(Self::new(provider, backend, authorizer, settings.client_options()))
    }

    /// Provider name errors are reported under.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.inner.provider
    }

    /// Strategy selected for this provider.
    #[must_use]
    pub fn strategy(&self) -> AuthStrategy {
        self.inner.sessions.strategy()
    }

    /// Read a secret.
    ///
    /// Returns the named field, or the whole document as a JSON object when
    /// the reference names no field.
    ///
    /// # Errors
    ///
    /// Returns a [`SecretError`] naming this provider. A rejected session is
    /// refreshed and the read retried once before `Unauthorized` is returned.
    #[instrument(
        skip(self, secret),
        fields(provider = %self.inner.provider, path = %secret.path_or_id)
    )]
    pub async fn get_secret(&self, secret: &SecretRef) -> SecretResult<SecretValue> {
        let path = self
            .inner
            .backend
            .normalize_reference(&secret.path_or_id)
            .map_err(|reason| SecretError::InvalidReference {
                provider: self.inner.provider.clone(),
                reason,
            })?;

        let document = self.document(&path).await?;

        match &secret.field {
            None => Ok(document.to_json_bytes()),
            Some(field) => document
                .get(field)
                .map(SecretValue::from)
                .ok_or_else(|| SecretError::FieldNotFound {
                    provider: self.inner.provider.clone(),
                    path,
                    field: field.clone(),
                }),
        }
    }

    /// Drop the cached document for a path or id.
    pub async fn invalidate(&self, path_or_id: &str) -> bool {
        match self.inner.backend.normalize_reference(path_or_id) {
            Ok(key) => self.inner.cache.invalidate(&key).await,
            Err(_) => false,
        }
    }

    /// Drop every cached document.
    pub async fn clear_cache(&self) {
        self.inner.cache.clear().await;
    }

    /// Cached document, or the result of the single in-flight read for `key`.
    async fn document(&self, key: &str) -> SecretResult<Arc<SecretDocument>> {
        if let Some(document) = self.inner.cache.get(key).await {
            debug!("Secret served from cache");
            return Ok(document);
        }

        let read = {
            let mut inflight = self.inner.inflight.lock().await;

            // a read may have completed between the miss and the lock
            if let Some(document) = self.inner.cache.get(key).await {
                return Ok(document);
            }

            if let Some(current) = inflight.get(key) {
                debug!("Joining in-flight read");
                current.read.clone()
            } else {
                let id = self.inner.next_read.fetch_add(1, Ordering::Relaxed);
                let read = self.inner.spawn_read(key.to_string(), id);
                inflight.insert(
                    key.to_string(),
                    Inflight {
                        id,
                        read: read.clone(),
                    },
                );
                read
            }
        };

        read.await
    }
}

impl Inner {
    /// Run the read for `key` on its own task so it finishes, and clears its
    /// in-flight entry, even when every caller waiting on it is cancelled.
    fn spawn_read(self: &Arc<Self>, key: String, id: u64) -> InflightRead {
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.fetch(&key).await;
            let mut inflight = inner.inflight.lock().await;
            if inflight.get(&key).is_some_and(|current| current.id == id) {
                inflight.remove(&key);
            }
            result
        }
        .in_current_span());

        let provider = self.provider.clone();
        async move {
            task.await.unwrap_or_else(|e| {
                Err(SecretError::Unreachable {
                    provider,
                    message: format!("secret read task failed: {e}"),
                })
            })
        }
        .boxed()
        .shared()
    }

    async fn fetch(&self, path: &str) -> SecretResult<Arc<SecretDocument>> {
        let session = self
            .sessions
            .session()
            .await
            .map_err(|e| self.auth_error(e))?;

        let document = match self.backend.read_secret(&session, path).await {
            Ok(document) => document,
            Err(ReadError::Rejected) => self.retry_rejected(&session, path).await?,
            Err(e) => return Err(self.read_error(path, e)),
        };

        let document = Arc::new(document);
        self.cache.insert(path, Arc::clone(&document)).await;
        debug!(fields = document.len(), "Secret read from vault");
        Ok(document)
    }

    /// One refresh and one retry after the vault rejected `session`.
    async fn retry_rejected(
        &self,
        session: &Arc<Session>,
        path: &str,
    ) -> SecretResult<SecretDocument> {
        if !session.is_renewable() {
            warn!("Vault rejected the static access token");
            return Err(self.auth_error(AuthError::StaticTokenCannotRefresh));
        }

        info!("Vault rejected the session, refreshing");
        let session = self
            .sessions
            .refresh(session)
            .await
            .map_err(|e| self.auth_error(e))?;

        match self.backend.read_secret(&session, path).await {
            Ok(document) => Ok(document),
            Err(ReadError::Rejected) => {
                warn!("Vault rejected the refreshed session");
                Err(SecretError::Unauthorized {
                    provider: self.provider.clone(),
                    path: path.to_string(),
                })
            }
            Err(e) => Err(self.read_error(path, e)),
        }
    }

    fn auth_error(&self, source: AuthError) -> SecretError {
        SecretError::Auth {
            provider: self.provider.clone(),
            source,
        }
    }

    fn read_error(&self, path: &str, error: ReadError) -> SecretError {
        let provider = self.provider.clone();
        let path = path.to_string();
        match error {
            ReadError::Rejected => SecretError::Unauthorized { provider, path },
            ReadError::NotFound => SecretError::NotFound { provider, path },
            ReadError::Timeout => SecretError::Timeout { provider, path },
            ReadError::Unreachable(message) => SecretError::Unreachable { provider, message },
            ReadError::Status { status, message } => SecretError::Vault {
                provider,
                status,
                message,
            },
            ReadError::InvalidResponse(message) => {
                SecretError::InvalidResponse { provider, message }
            }
        }
    }
}

impl fmt::Debug for SecretClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretClient")
            .field("provider", &self.inner.provider)
            .field("kind", &self.inner.backend.kind())
            .field("strategy", &self.strategy())
            .field("caching", &self.inner.cache.is_enabled())
            .finish_non_exhaustive()
    }
}
