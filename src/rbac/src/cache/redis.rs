//! Redis-backed role cache

use super::{role_cache_key, RoleCache};
use crate::error::{RbacError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

/// Distributed role cache on Redis.
///
/// Entries are JSON-encoded role-name lists stored with `SET ... EX`, so the
/// TTL is applied atomically with the write. The connection manager
/// reconnects on its own; callers still treat every operation as fallible.
#[derive(Clone)]
pub struct RedisRoleCache {
    conn: ConnectionManager,
}

impl RedisRoleCache {
    /// Connect to Redis and verify the connection with a ping
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| RbacError::Cache(format!("invalid redis url: {}", e)))?;

        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| RbacError::Cache(format!("failed to connect to redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| RbacError::Cache(format!("redis ping failed: {}", e)))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl RoleCache for RedisRoleCache {
    async fn get_roles(&self, user_id: &str) -> Result<Option<Vec<String>>> {
        let key = role_cache_key(user_id);
        let mut conn = self.conn.clone();

        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| RbacError::Cache(format!("redis get failed: {}", e)))?;

        let Some(payload) = value else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&payload) {
            Ok(roles) => Ok(Some(roles)),
            Err(e) => {
                // A corrupt entry is treated as a miss so the store re-reads it.
                warn!(key = %key, "discarding malformed cache payload: {}", e);
                Ok(None)
            }
        }
    }

    async fn set_roles(&self, user_id: &str, roles: &[String], ttl: Duration) -> Result<()> {
        let key = role_cache_key(user_id);
        let payload = serde_json::to_string(roles)
            .map_err(|e| RbacError::Cache(format!("failed to encode roles: {}", e)))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, payload, ttl.as_secs())
            .await
            .map_err(|e| RbacError::Cache(format!("redis set failed: {}", e)))?;

        Ok(())
    }

    async fn invalidate(&self, user_id: &str) -> Result<()> {
        let key = role_cache_key(user_id);
        let mut conn = self.conn.clone();

        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| RbacError::Cache(format!("redis del failed: {}", e)))?;

        Ok(())
    }
}
