//! Tenant authentication.
//!
//! A tenant proves itself with the `X-Cortex-Tenant-Id` header: a UUID
//! that must exist in the tenant directory. Every failure mode —
//! missing header, malformed UUID, unknown id, even a directory error —
//! collapses to the same uniform "unauthorized" answer so callers
//! cannot probe which ids exist. The real reason is logged server-side.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TENANT_CACHE_TTL_SECS;
use crate::db::{repository, Storage};
use crate::models::{Tone, Vertical};

/// A fully-loaded tenant, as injected into request extensions after auth.
#[derive(Debug, Clone)]
pub struct TenantRecord {
    pub id: Uuid,
    pub business_name: String,
    pub vertical: Vertical,
    pub tone: Tone,
    pub core_entities: Vec<String>,
    pub custom_policy: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum GuardError {
    /// The one externally visible failure. Carries no detail on purpose.
    #[error("Tenant not recognised")]
    Unauthorized,
}

struct CacheEntry {
    tenant: TenantRecord,
    expires_at: Instant,
}

/// Authenticates tenant ids against the directory, with a short-lived
/// positive cache. Negative results are never cached.
pub struct TenantGuard {
    db: Storage,
    cache: Mutex<HashMap<Uuid, CacheEntry>>,
    ttl: Duration,
}

impl TenantGuard {
    pub fn new(db: Storage) -> Self {
        Self::with_ttl(db, Duration::from_secs(TENANT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(db: Storage, ttl: Duration) -> Self {
        Self {
            db,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Authenticate the raw header value. `None` means the header was absent.
    pub fn authenticate(&self, header: Option<&str>) -> Result<TenantRecord, GuardError> {
        let raw = match header.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                tracing::debug!("auth rejected: tenant header missing or blank");
                return Err(GuardError::Unauthorized);
            }
        };

        let tenant_id = match Uuid::parse_str(raw) {
            Ok(id) => id,
            Err(_) => {
                tracing::debug!("auth rejected: tenant header is not a UUID");
                return Err(GuardError::Unauthorized);
            }
        };

        if let Some(tenant) = self.cached(&tenant_id) {
            return Ok(tenant);
        }

        let looked_up = self
            .db
            .conn()
            .and_then(|conn| repository::tenant::get_tenant(&conn, &tenant_id));

        match looked_up {
            Ok(Some(tenant)) => {
                self.store(tenant.clone());
                Ok(tenant)
            }
            Ok(None) => {
                tracing::debug!(%tenant_id, "auth rejected: unknown tenant id");
                Err(GuardError::Unauthorized)
            }
            Err(err) => {
                // Directory trouble must not become an oracle either.
                tracing::error!(%tenant_id, error = %err, "tenant lookup failed");
                Err(GuardError::Unauthorized)
            }
        }
    }

    /// Evict a tenant from the cache. Called after onboarding updates so
    /// the next request sees the fresh configuration.
    pub fn invalidate(&self, tenant_id: &Uuid) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(tenant_id);
        }
    }

    fn cached(&self, tenant_id: &Uuid) -> Option<TenantRecord> {
        let mut cache = self.cache.lock().ok()?;
        match cache.get(tenant_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.tenant.clone()),
            Some(_) => {
                // Expired entries are evicted on touch.
                cache.remove(tenant_id);
                None
            }
            None => None,
        }
    }

    fn store(&self, tenant: TenantRecord) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                tenant.id,
                CacheEntry {
                    expires_at: Instant::now() + self.ttl,
                    tenant,
                },
            );
        }
    }
}
