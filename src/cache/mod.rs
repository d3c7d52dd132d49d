//! Analytics cache
//!
//! Payload cache keyed by `(user, module kind)`. Entries expire after a
//! configurable TTL and are pruned lazily on read. Writes are
//! last-write-wins: recomputation is idempotent and cheap relative to
//! request volume, so no locking beyond the map guard is needed.

use crate::analytics::payload::AnalyticsPayload;
use crate::analytics::ModuleKind;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry lifetime in minutes; 0 disables expiry
    pub ttl_minutes: i64,
    /// Whether caching is enabled at all
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            enabled: true,
        }
    }
}

/// A cached payload with its lifecycle timestamps
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: AnalyticsPayload,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|e| now >= e).unwrap_or(false)
    }
}

/// Keyed payload store consulted and written through by every module run
pub struct AnalyticsCache {
    entries: RwLock<HashMap<(String, ModuleKind), CacheEntry>>,
    config: CacheConfig,
}

impl AnalyticsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Fresh cached payload for `(user, kind)`, if any
    ///
    /// Expired entries are removed on the way out.
    pub async fn get(&self, user_id: &str, kind: ModuleKind) -> Option<AnalyticsPayload> {
        if !self.config.enabled {
            return None;
        }

        let key = (user_id.to_string(), kind);
        let now = Utc::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if !entry.is_expired(now) => {
                    tracing::debug!(user_id = %user_id, module = %kind, "Cache hit");
                    return Some(entry.payload.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry existed but expired; prune it.
        let mut entries = self.entries.write().await;
        if entries.get(&key).map(|e| e.is_expired(now)).unwrap_or(false) {
            entries.remove(&key);
        }
        None
    }

    /// Write through a freshly computed payload
    pub async fn put(&self, user_id: &str, kind: ModuleKind, payload: AnalyticsPayload) {
        if !self.config.enabled {
            return;
        }

        let now = Utc::now();
        let expires_at = if self.config.ttl_minutes > 0 {
            Some(now + Duration::minutes(self.config.ttl_minutes))
        } else {
            None
        };

        let mut entries = self.entries.write().await;
        entries.insert(
            (user_id.to_string(), kind),
            CacheEntry {
                payload,
                updated_at: now,
                expires_at,
            },
        );
    }

    /// Drop one `(user, kind)` entry (forced refresh)
    pub async fn invalidate(&self, user_id: &str, kind: ModuleKind) {
        let mut entries = self.entries.write().await;
        entries.remove(&(user_id.to_string(), kind));
    }

    /// Drop every entry belonging to a user
    pub async fn invalidate_user(&self, user_id: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|(user, _), _| user != user_id);
    }

    /// Number of live (possibly expired) entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
