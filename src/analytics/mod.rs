//! Analytics Engine
//!
//! A family of independently runnable modules that transform a user's raw
//! memory records into typed [`AnalyticsPayload`]s. Every module follows
//! the same contract:
//!
//! 1. Consult the cache; return a hit immediately.
//! 2. Fetch the working set (module-specific filter).
//! 3. Below the module's documented minimum, return the canonical empty
//!    payload; never attempt computation on insufficient data.
//! 4. Compute metrics/charts/insights/summary with the statistical toolkit.
//! 5. Write through to the cache and return.
//!
//! Search bypasses the cache (queries are not memoized); the Life Map
//! aggregator fans out over all other modules concurrently.

pub mod characters;
pub mod fabric;
pub mod identity;
pub mod insight;
pub mod lifemap;
pub mod payload;
pub mod prediction;
pub mod relationships;
pub mod saga;
pub mod search;
pub mod shadow;
pub mod xp;

use crate::cache::AnalyticsCache;
use crate::memory::{MemoryAccessor, MemoryRecord, RecordFilter, StoreError};
use payload::AnalyticsPayload;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use characters::CharacterAnalytics;
pub use fabric::MemoryFabric;
pub use identity::IdentityPulse;
pub use insight::InsightEngine;
pub use lifemap::LifeMapAggregator;
pub use prediction::PredictionEngine;
pub use relationships::RelationshipAnalytics;
pub use saga::SagaEngine;
pub use search::{SearchEngine, SearchFilters, SearchQuery};
pub use shadow::ShadowEngine;
pub use xp::XpEngine;

/// Errors from running an analytics module
///
/// Undersized input is not represented here; it resolves to the
/// empty-payload sentinel. Fetch failures propagate unmodified so the
/// caller can fall back to a previously cached payload.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Accessor or store I/O failure
    #[error("fetch failed: {0}")]
    Fetch(#[from] StoreError),

    /// No module registered under the given tag
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// Search was dispatched through the generic runner without a query
    #[error("search requires a query; use AnalyticsEngine::search")]
    QueryRequired,
}

/// Result type alias for analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Closed set of analytics module tags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    IdentityPulse,
    Relationships,
    CharacterAnalytics,
    SagaEngine,
    MemoryFabric,
    InsightEngine,
    PredictionEngine,
    ShadowEngine,
    XpEngine,
    SearchEngine,
    LifeMap,
}

impl ModuleKind {
    /// Every module kind, for iteration
    pub fn all() -> &'static [ModuleKind] {
        &[
            ModuleKind::IdentityPulse,
            ModuleKind::Relationships,
            ModuleKind::CharacterAnalytics,
            ModuleKind::SagaEngine,
            ModuleKind::MemoryFabric,
            ModuleKind::InsightEngine,
            ModuleKind::PredictionEngine,
            ModuleKind::ShadowEngine,
            ModuleKind::XpEngine,
            ModuleKind::SearchEngine,
            ModuleKind::LifeMap,
        ]
    }

    /// Stable snake_case tag, also used as the cache key component
    pub fn tag(&self) -> &'static str {
        match self {
            ModuleKind::IdentityPulse => "identity_pulse",
            ModuleKind::Relationships => "relationships",
            ModuleKind::CharacterAnalytics => "character_analytics",
            ModuleKind::SagaEngine => "saga_engine",
            ModuleKind::MemoryFabric => "memory_fabric",
            ModuleKind::InsightEngine => "insight_engine",
            ModuleKind::PredictionEngine => "prediction_engine",
            ModuleKind::ShadowEngine => "shadow_engine",
            ModuleKind::XpEngine => "xp_engine",
            ModuleKind::SearchEngine => "search_engine",
            ModuleKind::LifeMap => "life_map",
        }
    }

    /// Human-readable module name for summaries and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleKind::IdentityPulse => "identity pulse",
            ModuleKind::Relationships => "relationship analytics",
            ModuleKind::CharacterAnalytics => "character analytics",
            ModuleKind::SagaEngine => "saga engine",
            ModuleKind::MemoryFabric => "memory fabric",
            ModuleKind::InsightEngine => "insight engine",
            ModuleKind::PredictionEngine => "prediction engine",
            ModuleKind::ShadowEngine => "shadow engine",
            ModuleKind::XpEngine => "xp engine",
            ModuleKind::SearchEngine => "search engine",
            ModuleKind::LifeMap => "life map",
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for ModuleKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ModuleKind::all()
            .iter()
            .find(|k| k.tag() == normalized)
            .copied()
            .ok_or_else(|| AnalyticsError::UnknownModule(s.to_string()))
    }
}

/// One analytic dimension
///
/// Implementations are stateless over the working set: `compute` is a pure
/// function of the fetched records. The cache/fetch/minimum flow is driven
/// uniformly by [`run_module`].
pub trait AnalyticsModule: Send + Sync {
    /// This module's tag
    fn kind(&self) -> ModuleKind;

    /// Documented minimum working-set size; below it the empty sentinel is
    /// returned
    fn min_records(&self) -> usize;

    /// Which records this module consumes
    fn filter(&self) -> RecordFilter {
        RecordFilter::All
    }

    /// Derive the payload from an already-filtered working set
    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload;
}

/// Daily mean-sentiment series across a chronological working set's full
/// span, oldest first; days without entries read as neutral
///
/// Day granularity is what makes weekly lags meaningful for the insight
/// and prediction modules.
pub fn daily_sentiment(records: &[&MemoryRecord]) -> Vec<f64> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Vec::new();
    };

    let start = first.created_at.date_naive();
    let end = last.created_at.date_naive();
    let span = (end - start).num_days().max(0) as usize + 1;

    let mut sums = vec![0.0f64; span];
    let mut counts = vec![0usize; span];
    for record in records {
        let day = (record.created_at.date_naive() - start).num_days() as usize;
        sums[day] += record.sentiment_or_neutral();
        counts[day] += 1;
    }

    sums.iter()
        .zip(counts.iter())
        .map(|(&sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect()
}

/// Drive one module through the uniform contract
pub(crate) async fn run_module(
    accessor: &MemoryAccessor,
    cache: &AnalyticsCache,
    module: &dyn AnalyticsModule,
    user_id: &str,
) -> AnalyticsResult<AnalyticsPayload> {
    let kind = module.kind();

    if let Some(hit) = cache.get(user_id, kind).await {
        return Ok(hit);
    }

    let records = accessor.fetch(user_id, module.filter()).await?;

    if records.len() < module.min_records() {
        tracing::debug!(
            user_id = %user_id,
            module = %kind,
            records = records.len(),
            minimum = module.min_records(),
            "Insufficient data, returning empty payload"
        );
        return Ok(AnalyticsPayload::empty(
            kind.display_name(),
            records.len(),
            module.min_records(),
        ));
    }

    let started = std::time::Instant::now();
    let payload = module.compute(&records);
    tracing::debug!(
        user_id = %user_id,
        module = %kind,
        records = records.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Module computed"
    );

    cache.put(user_id, kind, payload.clone()).await;
    Ok(payload)
}

/// The engine facade: constructs every module and dispatches by tag
pub struct AnalyticsEngine {
    accessor: Arc<MemoryAccessor>,
    cache: Arc<AnalyticsCache>,
    modules: Vec<Arc<dyn AnalyticsModule>>,
    search: SearchEngine,
    life_map: LifeMapAggregator,
}

impl AnalyticsEngine {
    /// Build the full registry over an accessor and cache
    pub fn new(accessor: Arc<MemoryAccessor>, cache: Arc<AnalyticsCache>) -> Self {
        let modules: Vec<Arc<dyn AnalyticsModule>> = vec![
            Arc::new(IdentityPulse::new()),
            Arc::new(RelationshipAnalytics::new()),
            Arc::new(CharacterAnalytics::new()),
            Arc::new(SagaEngine::new()),
            Arc::new(MemoryFabric::new()),
            Arc::new(InsightEngine::new()),
            Arc::new(PredictionEngine::new()),
            Arc::new(ShadowEngine::new()),
            Arc::new(XpEngine::new()),
        ];

        let life_map =
            LifeMapAggregator::new(accessor.clone(), cache.clone(), modules.clone());

        Self {
            accessor,
            cache,
            modules,
            search: SearchEngine::new(),
            life_map,
        }
    }

    /// Run one module for a user
    ///
    /// Search has no parameterless form; dispatching it here yields
    /// `QueryRequired`; use [`AnalyticsEngine::search`].
    pub async fn run(&self, user_id: &str, kind: ModuleKind) -> AnalyticsResult<AnalyticsPayload> {
        match kind {
            ModuleKind::SearchEngine => Err(AnalyticsError::QueryRequired),
            ModuleKind::LifeMap => self.life_map.run(user_id).await,
            _ => match self.modules.iter().find(|m| m.kind() == kind) {
                Some(module) => {
                    run_module(&self.accessor, &self.cache, module.as_ref(), user_id).await
                }
                None => Err(AnalyticsError::UnknownModule(kind.tag().to_string())),
            },
        }
    }

    /// Invalidate then recompute one module (forced refresh)
    pub async fn refresh(
        &self,
        user_id: &str,
        kind: ModuleKind,
    ) -> AnalyticsResult<AnalyticsPayload> {
        self.cache.invalidate(user_id, kind).await;
        self.run(user_id, kind).await
    }

    /// Run a search query; results are never memoized
    pub async fn search(
        &self,
        user_id: &str,
        query: SearchQuery,
    ) -> AnalyticsResult<AnalyticsPayload> {
        let records = self.accessor.fetch(user_id, RecordFilter::All).await?;
        Ok(self.search.query(&records, &query))
    }

    /// The accessor this engine reads from
    pub fn accessor(&self) -> &MemoryAccessor {
        &self.accessor
    }

    /// The cache this engine writes through
    pub fn cache(&self) -> &AnalyticsCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::memory::{InMemoryStore, Mood};
    use chrono::{Duration, Utc};

    async fn engine_with(records: Vec<MemoryRecord>) -> AnalyticsEngine {
        let store = Arc::new(InMemoryStore::new());
        store.seed("user-1", records).await;
        let accessor = Arc::new(MemoryAccessor::new(store, 500));
        let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
        AnalyticsEngine::new(accessor, cache)
    }

    fn neutral_records(count: usize) -> Vec<MemoryRecord> {
        let base = Utc::now() - Duration::days(count as i64);
        (0..count)
            .map(|i| {
                MemoryRecord::new(format!("entry {}", i))
                    .at(base + Duration::days(i as i64))
                    .sentiment(0.0)
            })
            .collect()
    }

    #[test]
    fn test_module_kind_parse() {
        assert_eq!(
            "identity_pulse".parse::<ModuleKind>().unwrap(),
            ModuleKind::IdentityPulse
        );
        assert_eq!(
            "identity-pulse".parse::<ModuleKind>().unwrap(),
            ModuleKind::IdentityPulse
        );
        assert!(matches!(
            "unknown".parse::<ModuleKind>(),
            Err(AnalyticsError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_module_kind_tag_roundtrip() {
        for kind in ModuleKind::all() {
            assert_eq!(kind.tag().parse::<ModuleKind>().unwrap(), *kind);
        }
    }

    #[tokio::test]
    async fn test_three_neutral_records_yield_empty_payloads() {
        // Three records, all neutral sentiment, no topics: every module with
        // a minimum above three returns its documented empty payload.
        let engine = engine_with(neutral_records(3)).await;

        for kind in [
            ModuleKind::IdentityPulse,
            ModuleKind::InsightEngine,
            ModuleKind::ShadowEngine,
            ModuleKind::MemoryFabric,
            ModuleKind::SagaEngine,
            ModuleKind::PredictionEngine,
        ] {
            let payload = engine.run("user-1", kind).await.unwrap();
            assert!(
                payload.is_empty_sentinel(),
                "{} should return the empty sentinel on 3 records",
                kind
            );
        }
    }

    #[tokio::test]
    async fn test_run_writes_through_cache() {
        let engine = engine_with(neutral_records(3)).await;

        let first = engine.run("user-1", ModuleKind::XpEngine).await.unwrap();
        assert!(!first.is_empty_sentinel());

        let cached = engine
            .cache()
            .get("user-1", ModuleKind::XpEngine)
            .await
            .expect("payload written through");
        assert_eq!(cached.generated_at, first.generated_at);

        // Second run returns the cached payload, not a recomputation.
        let second = engine.run("user-1", ModuleKind::XpEngine).await.unwrap();
        assert_eq!(second.generated_at, first.generated_at);
    }

    #[tokio::test]
    async fn test_refresh_recomputes() {
        let engine = engine_with(neutral_records(3)).await;

        let first = engine.run("user-1", ModuleKind::XpEngine).await.unwrap();
        let refreshed = engine
            .refresh("user-1", ModuleKind::XpEngine)
            .await
            .unwrap();
        assert!(refreshed.generated_at >= first.generated_at);
    }

    #[tokio::test]
    async fn test_search_dispatch_requires_query() {
        let engine = engine_with(neutral_records(3)).await;
        let err = engine
            .run("user-1", ModuleKind::SearchEngine)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::QueryRequired));
    }

    #[tokio::test]
    async fn test_empty_sentinel_not_cached_forever() {
        // The sentinel is never written through, so new records show up on
        // the next recompute.
        let store = Arc::new(InMemoryStore::new());
        store.seed("user-1", neutral_records(3)).await;
        let accessor = Arc::new(MemoryAccessor::new(store.clone(), 500));
        let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
        let engine = AnalyticsEngine::new(accessor, cache);

        let payload = engine
            .run("user-1", ModuleKind::IdentityPulse)
            .await
            .unwrap();
        assert!(payload.is_empty_sentinel());

        let mut more = Vec::new();
        let base = Utc::now() - Duration::days(20);
        for i in 0..10 {
            more.push(
                MemoryRecord::new(format!("I am learning to cook, day {}", i))
                    .at(base + Duration::days(i))
                    .sentiment(0.4)
                    .mood(Mood::Happy),
            );
        }
        store.seed("user-1", more).await;

        let refreshed = engine
            .refresh("user-1", ModuleKind::IdentityPulse)
            .await
            .unwrap();
        assert!(!refreshed.is_empty_sentinel());
    }
}
