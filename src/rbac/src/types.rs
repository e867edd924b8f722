//! Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Named bundle of permissions assignable to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Opaque unique identifier
    pub id: Uuid,

    /// Unique name, the lookup key used everywhere outside storage
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Create a new role with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Named atomic capability string checked for grant (e.g. `"dashboard:view"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Opaque unique identifier
    pub id: Uuid,

    /// Unique name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Create a new permission with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Account record; the engine only ever sees its id as a verified string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2 password hash, never serialized out
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A role together with the names of the permissions it grants.
///
/// This is the store's bulk-fetch shape consumed by the graph rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: HashSet<String>,
}

// --- Management request records ---

/// Request to create a role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Request to create a permission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
}

/// Request to associate a permission with a role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPermissionRequest {
    pub role_name: String,
    pub perm_name: String,
}

/// Request to bind a role to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role_name: String,
}

/// Request to remove a permission from a role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignPermissionRequest {
    pub role_name: String,
    pub perm_name: String,
}

/// Request to remove a role binding from a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignRoleRequest {
    pub user_id: String,
    pub role_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_creation() {
        let role = Role::new("admin");
        assert_eq!(role.name, "admin");
        assert!(!role.id.is_nil());
    }

    #[test]
    fn test_permission_creation() {
        let perm = Permission::new("dashboard:view");
        assert_eq!(perm.name, "dashboard:view");
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
