//! User-role resolution with cache-aside lookup
//!
//! Resolution order: distributed cache first, policy store on a miss, then a
//! detached write-back so the next check hits the cache. The store is the
//! only hard dependency; any cache failure downgrades to a store read.

use crate::cache::RoleCache;
use crate::error::Result;
use crate::store::PolicyStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default lifetime for cached role sets
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Resolves a user identifier to the set of role names bound to it
pub struct RoleResolver {
    store: Arc<dyn PolicyStore>,
    cache: Arc<dyn RoleCache>,
    cache_ttl: Duration,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn PolicyStore>, cache: Arc<dyn RoleCache>) -> Self {
        Self::with_ttl(store, cache, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(
        store: Arc<dyn PolicyStore>,
        cache: Arc<dyn RoleCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Resolve the role names currently bound to `user_id`.
    ///
    /// A user with zero roles resolves to an empty list. Cache errors are
    /// logged and absorbed; only a store failure propagates, since the store
    /// is authoritative and a decision cannot be made without it.
    pub async fn resolve(&self, user_id: &str) -> Result<Vec<String>> {
        match self.cache.get_roles(user_id).await {
            Ok(Some(roles)) => {
                debug!(user_id = %user_id, "role cache hit");
                return Ok(roles);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %user_id, "role cache unavailable, falling back to store: {}", e);
            }
        }

        let roles = self.store.roles_for_user(user_id).await?;

        if !roles.is_empty() {
            // Fire-and-forget write-back: the check must not wait on the
            // cache, and a failed populate only costs the next read.
            let cache = Arc::clone(&self.cache);
            let user_id = user_id.to_string();
            let roles_to_cache = roles.clone();
            let ttl = self.cache_ttl;
            tokio::spawn(async move {
                if let Err(e) = cache.set_roles(&user_id, &roles_to_cache, ttl).await {
                    warn!(user_id = %user_id, "failed to populate role cache: {}", e);
                }
            });
        }

        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryRoleCache;
    use crate::error::RbacError;
    use crate::store::InMemoryPolicyStore;
    use crate::types::{Role, User};
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    /// Cache double whose every operation fails, for transparency tests
    struct UnreachableCache;

    #[async_trait]
    impl RoleCache for UnreachableCache {
        async fn get_roles(&self, _user_id: &str) -> Result<Option<Vec<String>>> {
            Err(RbacError::Cache("connection refused".to_string()))
        }

        async fn set_roles(
            &self,
            _user_id: &str,
            _roles: &[String],
            _ttl: Duration,
        ) -> Result<()> {
            Err(RbacError::Cache("connection refused".to_string()))
        }

        async fn invalidate(&self, _user_id: &str) -> Result<()> {
            Err(RbacError::Cache("connection refused".to_string()))
        }
    }

    fn test_user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    async fn seeded_store() -> (Arc<InMemoryPolicyStore>, String) {
        let store = Arc::new(InMemoryPolicyStore::new());
        let user = test_user("alice");
        let role = Role::new("admin");
        store.create_user(&user).await.unwrap();
        store.create_role(&role).await.unwrap();
        store.add_user_role(user.id, role.id).await.unwrap();
        (store, user.id.to_string())
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_store_and_populates() {
        let (store, user_id) = seeded_store().await;
        let cache = Arc::new(InMemoryRoleCache::new());
        let resolver = RoleResolver::new(store, cache.clone());

        let roles = resolver.resolve(&user_id).await.unwrap();
        assert_eq!(roles, vec!["admin".to_string()]);

        // The write-back is detached; give it a moment to land.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get_roles(&user_id).await.unwrap(), Some(roles));
    }

    #[tokio::test]
    async fn test_hit_skips_store() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let cache = Arc::new(InMemoryRoleCache::new());
        cache
            .set_roles("u1", &["editor".to_string()], Duration::from_secs(60))
            .await
            .unwrap();

        // The store has no such user at all; a hit never consults it.
        let resolver = RoleResolver::new(store, cache);
        let roles = resolver.resolve("u1").await.unwrap();
        assert_eq!(roles, vec!["editor".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_failure_is_absorbed() {
        let (store, user_id) = seeded_store().await;
        let resolver = RoleResolver::new(store, Arc::new(UnreachableCache));

        let roles = resolver.resolve(&user_id).await.unwrap();
        assert_eq!(roles, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_roles_is_empty_not_error() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let user = test_user("bob");
        store.create_user(&user).await.unwrap();

        let resolver = RoleResolver::new(store, Arc::new(InMemoryRoleCache::new()));
        let roles = resolver.resolve(&user.id.to_string()).await.unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let cache = Arc::new(InMemoryRoleCache::new());
        let resolver = RoleResolver::new(store, cache.clone());

        resolver.resolve("00000000-0000-0000-0000-000000000000").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.is_empty());
    }
}
