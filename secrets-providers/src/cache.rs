//! Read-through cache of secret documents.
//!
//! Disabled unless a TTL is configured. Expired entries are evicted when
//! they are next read.

use crate::secret::SecretDocument;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A cached secret document.
#[derive(Debug, Clone)]
pub struct CachedSecret {
    /// The document
    pub value: Arc<SecretDocument>,
    /// When it was read from the vault
    pub fetched_at: Instant,
    /// How long it may be served
    pub ttl: Duration,
}

impl CachedSecret {
    /// Whether the entry may still be served.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// Secret documents keyed by path or id.
#[derive(Debug, Default)]
pub struct SecretCache {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, CachedSecret>>,
}

impl SecretCache {
    /// Cache entries for `ttl`; `None` disables caching.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Whether documents are cached at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    /// Fresh document for `key`, evicting it if it expired.
    pub async fn get(&self, key: &str) -> Option<Arc<SecretDocument>> {
        self.ttl?;

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh() => return Some(Arc::clone(&entry.value)),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_fresh()) {
            entries.remove(key);
        }
        None
    }

    /// Store a freshly read document.
    pub async fn insert(&self, key: &str, value: Arc<SecretDocument>) {
        let Some(ttl) = self.ttl else { return };
        self.entries.write().await.insert(
            key.to_string(),
            CachedSecret {
                value,
                fetched_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop the entry for `key`.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SecretField;

    fn doc() -> Arc<SecretDocument> {
        Arc::new(SecretDocument::new(vec![SecretField::new("password", "pw")]))
    }

    #[tokio::test]
    async fn test_disabled_by_default() {
        let cache = SecretCache::new(None);
        cache.insert("db", doc()).await;

        assert!(!cache.is_enabled());
        assert!(cache.get("db").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables() {
        assert!(!SecretCache::new(Some(Duration::ZERO)).is_enabled());
    }

    #[tokio::test]
    async fn test_fresh_entry_served() {
        let cache = SecretCache::new(Some(Duration::from_secs(60)));
        let value = doc();
        cache.insert("db", Arc::clone(&value)).await;

        let cached = cache.get("db").await.unwrap();
        assert!(Arc::ptr_eq(&cached, &value));
    }

    #[tokio::test]
    async fn test_expired_entry_evicted_on_read() {
        let cache = SecretCache::new(Some(Duration::from_millis(20)));
        cache.insert("db", doc()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get("db").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = SecretCache::new(Some(Duration::from_secs(60)));
        cache.insert("a", doc()).await;
        cache.insert("b", doc()).await;

        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
