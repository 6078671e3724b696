//! Read-only view of the shared identity cache.
//!
//! The external authentication service stores one entry per issued token
//! under `<reseller_prefix>/token/<token>`. The value is a two-element record
//! `[expiry, "groups"]`: an absolute expiry in seconds since the epoch and the
//! comma-joined group list of the caller, principal first.
//!
//! This crate only ever reads those entries. Expired entries and misses both
//! resolve to "no identity"; only a missing or failing backend is an error.

pub mod error;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use memory::MemoryTokenStore;
pub use redis_store::RedisTokenStore;

/// One identity record as written by the token issuance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, String)", into = "(f64, String)")]
pub struct CachedIdentity {
    /// Absolute expiry, seconds since the epoch.
    pub expiry: f64,
    /// Comma-joined groups, principal first.
    pub groups: String,
}

impl From<(f64, String)> for CachedIdentity {
    fn from((expiry, groups): (f64, String)) -> Self {
        Self { expiry, groups }
    }
}

impl From<CachedIdentity> for (f64, String) {
    fn from(entry: CachedIdentity) -> Self {
        (entry.expiry, entry.groups)
    }
}

impl CachedIdentity {
    pub fn new(expiry: f64, groups: impl Into<String>) -> Self {
        Self {
            expiry,
            groups: groups.into(),
        }
    }

    /// Entries stay valid up to and including their expiry instant.
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.expiry < now
    }

    pub fn group_list(&self) -> Vec<String> {
        self.groups.split(',').map(str::to_string).collect()
    }

    /// Decodes the JSON form stored in the shared cache.
    pub fn decode(key: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::MalformedEntry {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn encode(&self) -> String {
        let (expiry, groups) = (self.expiry, self.groups.as_str());
        serde_json::json!([expiry, groups]).to_string()
    }
}

/// A shared key/value store holding identity records.
///
/// Implementations must be safe for concurrent use; the cache never wraps
/// them in a lock.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedIdentity>>;
}

/// Cache key for a token.
pub fn token_key(reseller_prefix: &str, token: &str) -> String {
    format!("{}/token/{}", reseller_prefix, token)
}

/// Current time in seconds since the epoch.
pub fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Resolves bearer tokens to group lists.
#[derive(Clone)]
pub struct IdentityCache {
    reseller_prefix: String,
    store: Option<Arc<dyn TokenStore>>,
    lookup_timeout: Option<Duration>,
}

impl IdentityCache {
    pub fn new(reseller_prefix: impl Into<String>, store: Option<Arc<dyn TokenStore>>) -> Self {
        Self {
            reseller_prefix: reseller_prefix.into(),
            store,
            lookup_timeout: None,
        }
    }

    /// Bounds each lookup; an elapsed lookup fails with `CacheError::Timeout`.
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.store.is_some()
    }

    /// Resolves `token` against the current time.
    pub async fn resolve(&self, token: &str) -> Result<Option<Vec<String>>> {
        self.resolve_at(token, now_epoch()).await
    }

    /// Resolves `token` as of `now` (seconds since the epoch).
    ///
    /// Returns `Ok(None)` on a miss, an expired entry or an entry without
    /// groups. Performs exactly one store lookup.
    pub async fn resolve_at(&self, token: &str, now: f64) -> Result<Option<Vec<String>>> {
        let store = self.store.as_ref().ok_or(CacheError::NoBackend)?;
        let key = token_key(&self.reseller_prefix, token);

        let entry = match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, store.get(&key))
                .await
                .map_err(|_| {
                    warn!("Identity cache lookup timed out after {:?}", limit);
                    CacheError::Timeout(limit)
                })??,
            None => store.get(&key).await?,
        };

        let Some(entry) = entry else {
            debug!("Identity cache miss");
            return Ok(None);
        };
        if entry.is_expired_at(now) {
            debug!(expiry = entry.expiry, now, "Identity cache entry expired");
            return Ok(None);
        }
        if entry.groups.is_empty() {
            return Ok(None);
        }
        Ok(Some(entry.group_list()))
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("reseller_prefix", &self.reseller_prefix)
            .field("has_backend", &self.store.is_some())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}
