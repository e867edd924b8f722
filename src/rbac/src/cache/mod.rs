//! Distributed role-cache gateway
//!
//! The cache is the "maybe-unavailable" collaborator: it holds a per-user
//! snapshot of role names with a TTL, and every caller is expected to absorb
//! its errors. A missing or unreachable cache only costs latency: the
//! resolver falls back to the policy store, which stays authoritative.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub mod redis;

pub use self::redis::RedisRoleCache;

/// Namespaced cache key for a user's role names.
///
/// Stable across process restarts so previously cached entries remain valid.
pub fn role_cache_key(user_id: &str) -> String {
    format!("rbac:user:{}:roles", user_id)
}

/// Key-value cache of per-user role-name sets
#[async_trait]
pub trait RoleCache: Send + Sync {
    /// Fetch the cached role names for a user.
    ///
    /// `Ok(None)` is the typed miss; `Err` means the cache layer itself
    /// failed and the caller should fall back to the store.
    async fn get_roles(&self, user_id: &str) -> Result<Option<Vec<String>>>;

    /// Store a user's role names with a time-to-live
    async fn set_roles(&self, user_id: &str, roles: &[String], ttl: Duration) -> Result<()>;

    /// Drop a user's entry so the next resolve re-reads the store
    async fn invalidate(&self, user_id: &str) -> Result<()>;
}

/// Cached entry with its expiry deadline
#[derive(Clone)]
struct CachedEntry {
    roles: Vec<String>,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(roles: Vec<String>, ttl: Duration) -> Self {
        Self {
            roles,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process role cache for tests and single-node runs
///
/// Thread-safe via `DashMap`; expired entries are dropped lazily on read.
#[derive(Default)]
pub struct InMemoryRoleCache {
    entries: DashMap<String, CachedEntry>,
}

impl InMemoryRoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, counting not-yet-evicted expired ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RoleCache for InMemoryRoleCache {
    async fn get_roles(&self, user_id: &str) -> Result<Option<Vec<String>>> {
        let key = role_cache_key(user_id);

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(&key);
                return Ok(None);
            }
            return Ok(Some(entry.roles.clone()));
        }

        Ok(None)
    }

    async fn set_roles(&self, user_id: &str, roles: &[String], ttl: Duration) -> Result<()> {
        let key = role_cache_key(user_id);
        self.entries.insert(key, CachedEntry::new(roles.to_vec(), ttl));
        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> Result<()> {
        self.entries.remove(&role_cache_key(user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shape() {
        assert_eq!(role_cache_key("u1"), "rbac:user:u1:roles");
    }

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let cache = InMemoryRoleCache::new();
        let roles = vec!["admin".to_string()];

        assert!(cache.get_roles("u1").await.unwrap().is_none());

        cache
            .set_roles("u1", &roles, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get_roles("u1").await.unwrap(), Some(roles));

        cache.invalidate("u1").await.unwrap();
        assert!(cache.get_roles("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = InMemoryRoleCache::new();
        cache
            .set_roles("u1", &["user".to_string()], Duration::from_millis(20))
            .await
            .unwrap();

        assert!(cache.get_roles("u1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get_roles("u1").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = InMemoryRoleCache::new();
        cache
            .set_roles("u1", &["user".to_string()], Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set_roles("u1", &["admin".to_string()], Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get_roles("u1").await.unwrap(),
            Some(vec!["admin".to_string()])
        );
    }
}
