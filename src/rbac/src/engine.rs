//! Authorization engine
//!
//! Composes the role-permission graph and the user-role resolver to answer
//! "may user U perform action P", and owns the mutation-triggered reload
//! protocol that keeps the graph consistent with the policy store.
//!
//! # Architecture
//!
//! ```text
//! check_access ──► RoleResolver ──► RoleCache (best-effort)
//!                       │
//!                       └─────────► PolicyStore (authoritative)
//!                                        │
//! mutations ────► PolicyStore ──► load_policy ──► PermissionGraph (swap)
//! ```
//!
//! The graph cell is a `parking_lot::RwLock` holding an `Arc`: checks clone
//! the `Arc` under the read lock and evaluate against that snapshot, while
//! `load_policy` builds the replacement graph from store data *before*
//! taking the write lock, which it holds only for the pointer swap. A reader
//! therefore observes either the entirely-old or entirely-new graph and
//! never blocks on store I/O.

use crate::cache::RoleCache;
use crate::error::Result;
use crate::graph::PermissionGraph;
use crate::resolver::{RoleResolver, DEFAULT_CACHE_TTL};
use crate::store::PolicyStore;
use crate::types::{
    AssignPermissionRequest, AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest,
    Permission, Role, RoleWithPermissions, UnassignPermissionRequest, UnassignRoleRequest,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Role-based access control engine
pub struct RbacEngine {
    store: Arc<dyn PolicyStore>,
    cache: Arc<dyn RoleCache>,
    resolver: RoleResolver,
    graph: RwLock<Arc<PermissionGraph>>,
}

impl RbacEngine {
    /// Create an engine over a store and cache with the default role-cache TTL.
    ///
    /// The graph starts empty; call [`load_policy`](Self::load_policy) at
    /// bootstrap to populate it.
    pub fn new(store: Arc<dyn PolicyStore>, cache: Arc<dyn RoleCache>) -> Self {
        Self::with_cache_ttl(store, cache, DEFAULT_CACHE_TTL)
    }

    /// Create an engine with a custom role-cache TTL
    pub fn with_cache_ttl(
        store: Arc<dyn PolicyStore>,
        cache: Arc<dyn RoleCache>,
        cache_ttl: Duration,
    ) -> Self {
        let resolver = RoleResolver::with_ttl(Arc::clone(&store), Arc::clone(&cache), cache_ttl);
        Self {
            store,
            cache,
            resolver,
            graph: RwLock::new(Arc::new(PermissionGraph::default())),
        }
    }

    /// Rebuild the role-permission graph from the policy store and swap it in.
    ///
    /// Safe to call while checks are in flight: construction happens off to
    /// the side and the write lock is held only for the swap. On failure the
    /// previous graph keeps serving.
    pub async fn load_policy(&self) -> Result<()> {
        let roles = self.store.roles_with_permissions().await?;
        let graph = PermissionGraph::build(
            roles
                .into_iter()
                .map(|r| (r.role.name, r.permissions)),
        )?;

        info!("RBAC policy loaded: {} roles", graph.len());

        *self.graph.write() = Arc::new(graph);
        Ok(())
    }

    /// Number of roles in the currently active graph
    pub fn loaded_roles(&self) -> usize {
        self.graph.read().len()
    }

    /// Decide whether `user_id` holds `required_permission` through any of
    /// its roles.
    ///
    /// `Ok(false)` is a legitimate deny; an error means the decision could
    /// not be made because the policy store was unreachable. Cache failures
    /// never surface here.
    pub async fn check_access(&self, user_id: &str, required_permission: &str) -> Result<bool> {
        let role_names = self.resolver.resolve(user_id).await?;

        // Snapshot the graph once per check; grants are monotonic across
        // roles, so the first granting role decides.
        let graph = Arc::clone(&self.graph.read());

        for role in &role_names {
            if graph.is_granted(role, required_permission) {
                debug!(user_id = %user_id, role = %role, permission = %required_permission, "access granted");
                return Ok(true);
            }
        }

        debug!(user_id = %user_id, permission = %required_permission, "access denied");
        Ok(false)
    }

    /// Create a role and reload the graph
    pub async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role> {
        let role = Role::new(&req.name);
        self.store.create_role(&role).await?;
        self.reload_after_write("create_role").await;
        Ok(role)
    }

    /// Create a permission and reload the graph
    pub async fn create_permission(&self, req: &CreatePermissionRequest) -> Result<Permission> {
        let permission = Permission::new(&req.name);
        self.store.create_permission(&permission).await?;
        self.reload_after_write("create_permission").await;
        Ok(permission)
    }

    /// Grant a permission to a role and reload the graph
    pub async fn assign_permission_to_role(&self, req: &AssignPermissionRequest) -> Result<()> {
        let role = self.store.role_by_name(&req.role_name).await?;
        let permission = self.store.permission_by_name(&req.perm_name).await?;

        self.store.add_role_permission(role.id, permission.id).await?;
        self.reload_after_write("assign_permission_to_role").await;
        Ok(())
    }

    /// Revoke a permission from a role and reload the graph.
    ///
    /// Revoking a grant that does not exist is an `AssociationNotFound`
    /// error, so operator mistakes surface immediately.
    pub async fn remove_permission_from_role(
        &self,
        req: &UnassignPermissionRequest,
    ) -> Result<()> {
        let role = self.store.role_by_name(&req.role_name).await?;
        let permission = self.store.permission_by_name(&req.perm_name).await?;

        self.store
            .remove_role_permission(role.id, permission.id)
            .await?;
        self.reload_after_write("remove_permission_from_role").await;
        Ok(())
    }

    /// Bind a role to a user and invalidate that user's cached role set.
    ///
    /// User bindings do not shape the graph, so no reload happens; the
    /// invalidation forces the next check to re-read the store.
    pub async fn assign_role_to_user(&self, req: &AssignRoleRequest) -> Result<()> {
        let user = self.store.user_by_id(&req.user_id).await?;
        let role = self.store.role_by_name(&req.role_name).await?;

        self.store.add_user_role(user.id, role.id).await?;
        self.invalidate_user(&req.user_id).await;
        Ok(())
    }

    /// Unbind a role from a user and invalidate that user's cached role set
    pub async fn remove_role_from_user(&self, req: &UnassignRoleRequest) -> Result<()> {
        let user = self.store.user_by_id(&req.user_id).await?;
        let role = self.store.role_by_name(&req.role_name).await?;

        self.store.remove_user_role(user.id, role.id).await?;
        self.invalidate_user(&req.user_id).await;
        Ok(())
    }

    /// List every role with its granted permission names
    pub async fn roles(&self) -> Result<Vec<RoleWithPermissions>> {
        self.store.roles_with_permissions().await
    }

    /// List every permission record
    pub async fn permissions(&self) -> Result<Vec<Permission>> {
        self.store.permissions().await
    }

    /// List the role names bound to a user, straight from the store
    pub async fn user_roles(&self, user_id: &str) -> Result<Vec<String>> {
        self.store.roles_for_user(user_id).await
    }

    /// Reload after a successful store write.
    ///
    /// A failed reload does not fail the mutation: the write landed, the
    /// store is ahead of memory, and the last-known-good graph keeps serving
    /// until the next successful reload.
    async fn reload_after_write(&self, operation: &str) {
        if let Err(e) = self.load_policy().await {
            warn!(
                operation = %operation,
                "policy reload failed after store write, serving last-known-good graph: {}",
                e
            );
        }
    }

    /// Best-effort cache invalidation for one user's bindings
    async fn invalidate_user(&self, user_id: &str) {
        if let Err(e) = self.cache.invalidate(user_id).await {
            warn!(user_id = %user_id, "failed to invalidate role cache entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryRoleCache;
    use crate::store::InMemoryPolicyStore;

    fn test_engine() -> RbacEngine {
        RbacEngine::new(
            Arc::new(InMemoryPolicyStore::new()),
            Arc::new(InMemoryRoleCache::new()),
        )
    }

    #[tokio::test]
    async fn test_engine_starts_empty() {
        let engine = test_engine();
        assert_eq!(engine.loaded_roles(), 0);
    }

    #[tokio::test]
    async fn test_create_role_reloads_graph() {
        let engine = test_engine();

        engine
            .create_role(&CreateRoleRequest {
                name: "admin".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(engine.loaded_roles(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_role_is_conflict() {
        let engine = test_engine();
        let req = CreateRoleRequest {
            name: "admin".to_string(),
        };

        engine.create_role(&req).await.unwrap();
        let err = engine.create_role(&req).await.unwrap_err();
        assert!(matches!(err, crate::error::RbacError::Conflict(_)));
    }
}
