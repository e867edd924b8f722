//! Error types for the RBAC engine

use thiserror::Error;

/// RBAC engine errors
#[derive(Debug, Error)]
pub enum RbacError {
    /// Referenced role does not exist
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Referenced permission does not exist
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    /// Referenced user does not exist
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The role↔permission or user↔role association does not exist
    #[error("Association not found: {0}")]
    AssociationNotFound(String),

    /// Duplicate unique name on creation
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Duplicate role name while building the permission graph
    #[error("Duplicate role in graph: {0}")]
    DuplicateRole(String),

    /// Policy store unreachable or query failed
    #[error("Store error: {0}")]
    Store(String),

    /// Cache unreachable or payload malformed; never fatal to a check
    #[error("Cache error: {0}")]
    Cache(String),

    /// Username/password pair rejected
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bearer token missing, malformed, or expired
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RbacError {
    /// True for the not-found family, which boundaries map to a client error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RbacError::RoleNotFound(_)
                | RbacError::PermissionNotFound(_)
                | RbacError::UserNotFound(_)
                | RbacError::AssociationNotFound(_)
        )
    }
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;
