//! Policy store gateway
//!
//! The store is the "must-succeed" collaborator: it is the authoritative
//! record of users, roles, permissions, and their associations, and its
//! errors always propagate to the caller. The engine treats the in-memory
//! graph and the role cache as disposable derivations of this store.

use crate::error::{RbacError, Result};
use crate::types::{Permission, Role, RoleWithPermissions, User};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod postgres;

pub use postgres::PostgresPolicyStore;

/// Authoritative persistence of users, roles, permissions, and associations
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a user record; duplicate username/email is a conflict
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Fetch a user by its external string identifier
    async fn user_by_id(&self, user_id: &str) -> Result<User>;

    /// Fetch a user by unique username
    async fn user_by_username(&self, username: &str) -> Result<User>;

    /// Insert a role record; duplicate name is a conflict
    async fn create_role(&self, role: &Role) -> Result<()>;

    /// Fetch a role by unique name
    async fn role_by_name(&self, name: &str) -> Result<Role>;

    /// Fetch every role together with its granted permission names.
    ///
    /// This is the bulk read that feeds a graph rebuild.
    async fn roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>>;

    /// Fetch the role names currently bound to a user.
    ///
    /// A user with zero bindings (or an unknown identifier) yields an empty
    /// list, not an error.
    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<String>>;

    /// Insert a permission record; duplicate name is a conflict
    async fn create_permission(&self, permission: &Permission) -> Result<()>;

    /// Fetch a permission by unique name
    async fn permission_by_name(&self, name: &str) -> Result<Permission>;

    /// List all permission records
    async fn permissions(&self) -> Result<Vec<Permission>>;

    /// Append a role↔permission association; appending twice is a no-op
    async fn add_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> Result<()>;

    /// Remove a role↔permission association.
    ///
    /// Removing an association that does not exist reports
    /// `AssociationNotFound` rather than silently succeeding.
    async fn remove_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> Result<()>;

    /// Append a user↔role binding; appending twice is a no-op
    async fn add_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()>;

    /// Remove a user↔role binding, reporting `AssociationNotFound` when absent
    async fn remove_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()>;
}

#[derive(Default)]
struct InMemoryState {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    role_permissions: HashSet<(Uuid, Uuid)>,
    user_roles: HashSet<(Uuid, Uuid)>,
}

/// In-memory policy store for tests and single-node runs.
///
/// Mirrors the Postgres implementation's observable semantics exactly:
/// unique names conflict, association removal guards on existence, unknown
/// users resolve to empty role lists.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RbacError::Conflict(format!("user {}", user.username)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, user_id: &str) -> Result<User> {
        let id = Uuid::parse_str(user_id)
            .map_err(|_| RbacError::UserNotFound(user_id.to_string()))?;
        let state = self.state.read().await;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RbacError::UserNotFound(user_id.to_string()))
    }

    async fn user_by_username(&self, username: &str) -> Result<User> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| RbacError::UserNotFound(username.to_string()))
    }

    async fn create_role(&self, role: &Role) -> Result<()> {
        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(RbacError::Conflict(format!("role {}", role.name)));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Role> {
        let state = self.state.read().await;
        state
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| RbacError::RoleNotFound(name.to_string()))
    }

    async fn roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>> {
        let state = self.state.read().await;
        let mut out = Vec::with_capacity(state.roles.len());
        for role in state.roles.values() {
            let permissions = state
                .role_permissions
                .iter()
                .filter(|(role_id, _)| *role_id == role.id)
                .filter_map(|(_, perm_id)| state.permissions.get(perm_id))
                .map(|p| p.name.clone())
                .collect();
            out.push(RoleWithPermissions {
                role: role.clone(),
                permissions,
            });
        }
        Ok(out)
    }

    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(Vec::new());
        };
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == id)
            .filter_map(|(_, role_id)| state.roles.get(role_id))
            .map(|r| r.name.clone())
            .collect())
    }

    async fn create_permission(&self, permission: &Permission) -> Result<()> {
        let mut state = self.state.write().await;
        if state.permissions.values().any(|p| p.name == permission.name) {
            return Err(RbacError::Conflict(format!(
                "permission {}",
                permission.name
            )));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn permission_by_name(&self, name: &str) -> Result<Permission> {
        let state = self.state.read().await;
        state
            .permissions
            .values()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| RbacError::PermissionNotFound(name.to_string()))
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.values().cloned().collect())
    }

    async fn add_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.role_permissions.insert((role_id, permission_id));
        Ok(())
    }

    async fn remove_role_permission(&self, role_id: Uuid, permission_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.role_permissions.remove(&(role_id, permission_id)) {
            return Err(RbacError::AssociationNotFound(format!(
                "role {} does not grant permission {}",
                role_id, permission_id
            )));
        }
        Ok(())
    }

    async fn add_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn remove_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.user_roles.remove(&(user_id, role_id)) {
            return Err(RbacError::AssociationNotFound(format!(
                "user {} does not have role {}",
                user_id, role_id
            )));
        }
        Ok(())
    }
}
