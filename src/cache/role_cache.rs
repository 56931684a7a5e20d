//! Redis-backed role resolution caching.
//!
//! Caches the (user, company) -> role lookup so the RBAC gate does not hit
//! `user_roles` on every request. Best-effort: everything degrades to a
//! database read when Redis is absent or failing.

use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::rbac::Role;

const ROLE_CACHE_PREFIX: &str = "roles:";
const DEFAULT_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRole {
    pub profile_id: Uuid,
    pub company_id: Uuid,
    pub role: Option<String>,
    pub cached_at: i64,
}

#[derive(Clone)]
pub struct RoleCache {
    pool: Option<Pool>,
    ttl_secs: u64,
}

impl RoleCache {
    pub fn new(pool: Option<Pool>) -> Self {
        Self {
            pool,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_ttl(pool: Option<Pool>, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    fn cache_key(profile_id: Uuid, company_id: Uuid) -> String {
        format!("{}{}:{}", ROLE_CACHE_PREFIX, profile_id, company_id)
    }

    pub async fn set(
        &self,
        profile_id: Uuid,
        company_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), CacheError> {
        let pool = self.pool.as_ref().ok_or(CacheError::NoRedis)?;
        let mut conn = pool.get().await.map_err(|e| {
            error!(error = %e, "Failed to get Redis connection");
            CacheError::ConnectionFailed
        })?;

        let entry = CachedRole {
            profile_id,
            company_id,
            role: role.map(|r| r.as_str().to_string()),
            cached_at: chrono::Utc::now().timestamp(),
        };

        let key = Self::cache_key(profile_id, company_id);
        let value = serde_json::to_string(&entry).map_err(|_| CacheError::SerializationFailed)?;

        conn.set_ex::<_, _, ()>(&key, value, self.ttl_secs)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to cache role");
                CacheError::OperationFailed
            })?;

        debug!(profile_id = %profile_id, company_id = %company_id, "Role cached");
        Ok(())
    }

    /// Returns the cached membership, if any. The outer `Option` is a cache
    /// miss; the inner `role: None` is a cached "no membership".
    pub async fn get(&self, profile_id: Uuid, company_id: Uuid) -> Option<CachedRole> {
        let pool = self.pool.as_ref()?;
        let mut conn = pool.get().await.ok()?;

        let key = Self::cache_key(profile_id, company_id);
        let value: Option<String> = conn.get(&key).await.ok()?;

        value.and_then(|v| serde_json::from_str(&v).ok())
    }

    pub async fn invalidate(&self, profile_id: Uuid, company_id: Uuid) -> Result<(), CacheError> {
        let pool = self.pool.as_ref().ok_or(CacheError::NoRedis)?;
        let mut conn = pool.get().await.map_err(|e| {
            error!(error = %e, "Failed to get Redis connection");
            CacheError::ConnectionFailed
        })?;

        let key = Self::cache_key(profile_id, company_id);
        conn.del::<_, ()>(&key).await.map_err(|e| {
            error!(error = %e, "Failed to invalidate role cache");
            CacheError::OperationFailed
        })?;

        debug!(profile_id = %profile_id, company_id = %company_id, "Role cache invalidated");
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.pool.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum CacheError {
    NoRedis,
    ConnectionFailed,
    OperationFailed,
    SerializationFailed,
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::NoRedis => write!(f, "Redis not configured"),
            CacheError::ConnectionFailed => write!(f, "Redis connection failed"),
            CacheError::OperationFailed => write!(f, "Redis operation failed"),
            CacheError::SerializationFailed => write!(f, "Serialization failed"),
        }
    }
}

impl std::error::Error for CacheError {}
