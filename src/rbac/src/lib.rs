//! # Gatekeeper RBAC Engine
//!
//! Role-based access control with a persistent policy store, an in-memory
//! role→permission graph for fast checks, and a distributed cache for
//! user→role lookups.
//!
//! ## Design
//!
//! - **Async-first** on the Tokio runtime
//! - **Store-authoritative**: the graph and the cache are derivations; the
//!   policy store is the source of truth
//! - **Swap-on-complete reloads**: structural mutations rebuild the graph off
//!   to the side and swap it atomically, so checks never observe a partial
//!   rebuild
//! - **Best-effort caching**: a cache outage degrades latency, never
//!   correctness
//!
//! ## Example
//!
//! ```rust
//! use gatekeeper_rbac::{RbacEngine, InMemoryPolicyStore, InMemoryRoleCache};
//! use gatekeeper_rbac::types::{CreateRoleRequest, CreatePermissionRequest, AssignPermissionRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RbacEngine::new(
//!     Arc::new(InMemoryPolicyStore::new()),
//!     Arc::new(InMemoryRoleCache::new()),
//! );
//! engine.load_policy().await?;
//!
//! engine.create_role(&CreateRoleRequest { name: "editor".into() }).await?;
//! engine.create_permission(&CreatePermissionRequest { name: "doc:edit".into() }).await?;
//! engine.assign_permission_to_role(&AssignPermissionRequest {
//!     role_name: "editor".into(),
//!     perm_name: "doc:edit".into(),
//! }).await?;
//!
//! let granted = engine.check_access("some-user-id", "doc:edit").await?;
//! # let _ = granted;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthResponse, AuthService, LoginRequest, RegisterRequest};
pub use cache::{InMemoryRoleCache, RedisRoleCache, RoleCache};
pub use config::Config;
pub use engine::RbacEngine;
pub use error::{RbacError, Result};
pub use graph::PermissionGraph;
pub use resolver::RoleResolver;
pub use store::{InMemoryPolicyStore, PolicyStore, PostgresPolicyStore};
pub use types::{Permission, Role, RoleWithPermissions, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
