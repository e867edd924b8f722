//! In-memory role→permission graph
//!
//! The graph is a derived structure: the policy store stays authoritative,
//! and the engine rebuilds the graph wholesale after every structural
//! mutation. Construction is pure and the finished graph is immutable, so
//! the engine can build a replacement off to the side and swap it in without
//! readers ever observing a half-built state.

use crate::error::{RbacError, Result};
use std::collections::{HashMap, HashSet};

/// Immutable mapping from role name to the set of permission names it grants
#[derive(Debug, Default)]
pub struct PermissionGraph {
    grants: HashMap<String, HashSet<String>>,
}

impl PermissionGraph {
    /// Build a graph from `(role name, permission names)` pairs.
    ///
    /// Fails on a duplicate role name. The caller decides what to do with a
    /// failed build; the engine aborts the swap and keeps serving the
    /// previous graph, since a half-failed reload is worse than a stale one.
    pub fn build<I>(roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, HashSet<String>)>,
    {
        let mut grants = HashMap::new();
        for (name, permissions) in roles {
            if grants.insert(name.clone(), permissions).is_some() {
                return Err(RbacError::DuplicateRole(name));
            }
        }
        Ok(Self { grants })
    }

    /// True iff `role` exists and its permission set contains `permission`.
    ///
    /// An unknown role name grants nothing rather than erroring; roles can be
    /// renamed or removed out from under a stale reference.
    pub fn is_granted(&self, role: &str, permission: &str) -> bool {
        self.grants
            .get(role)
            .map(|perms| perms.contains(permission))
            .unwrap_or(false)
    }

    /// Number of roles in the graph
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// True if the graph holds no roles
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Iterate over the role names in the graph
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_and_query() {
        let graph = PermissionGraph::build(vec![
            ("admin".to_string(), perms(&["system:admin", "dashboard:view"])),
            ("user".to_string(), perms(&["profile:view"])),
        ])
        .unwrap();

        assert_eq!(graph.len(), 2);
        assert!(graph.is_granted("admin", "system:admin"));
        assert!(graph.is_granted("user", "profile:view"));
        assert!(!graph.is_granted("user", "system:admin"));
    }

    #[test]
    fn test_unknown_role_grants_nothing() {
        let graph = PermissionGraph::build(vec![(
            "admin".to_string(),
            perms(&["system:admin"]),
        )])
        .unwrap();

        assert!(!graph.is_granted("ghost", "system:admin"));
    }

    #[test]
    fn test_role_with_no_permissions() {
        let graph =
            PermissionGraph::build(vec![("intern".to_string(), HashSet::new())]).unwrap();

        assert!(!graph.is_granted("intern", "profile:view"));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let result = PermissionGraph::build(vec![
            ("admin".to_string(), perms(&["a"])),
            ("admin".to_string(), perms(&["b"])),
        ]);

        match result {
            Err(RbacError::DuplicateRole(name)) => assert_eq!(name, "admin"),
            other => panic!("expected DuplicateRole, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = PermissionGraph::build(Vec::new()).unwrap();
        assert!(graph.is_empty());
        assert!(!graph.is_granted("admin", "system:admin"));
    }
}
