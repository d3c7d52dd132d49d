//! # Memoir
//!
//! Personal Journaling Intelligence - a Rust engine that turns raw memory
//! records into structured insight: mood trends, relationship dynamics,
//! narrative arcs, suppressed themes, forecasts, and a unified life map.
//!
//! ## Features
//!
//! - **Statistical toolkit**: EMA smoothing, Pearson correlation,
//!   autocorrelation, cosine similarity, clustering primitives
//! - **Eleven analytics modules** behind one uniform contract:
//!   `run(user_id) -> AnalyticsPayload`
//! - **Failure-isolated aggregation**: the life map fans out concurrently
//!   and tolerates individual module failure
//! - **Cache layer**: `(user, module)` keyed payloads with TTL expiry
//!
//! ## Modules
//!
//! - [`stats`]: shared numeric primitives
//! - [`memory`]: memory records, stores, and the normalizing accessor
//! - [`cache`]: the payload cache layer
//! - [`analytics`]: the engine and every analytics module
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memoir::analytics::{AnalyticsEngine, ModuleKind};
//! use memoir::cache::{AnalyticsCache, CacheConfig};
//! use memoir::memory::{InMemoryStore, MemoryAccessor, MemoryRecord};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     store
//!         .seed(
//!             "me",
//!             vec![MemoryRecord::new("First entry of a new chapter").sentiment(0.6)],
//!         )
//!         .await;
//!
//!     let accessor = Arc::new(MemoryAccessor::new(store, 500));
//!     let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
//!     let engine = AnalyticsEngine::new(accessor, cache);
//!
//!     let payload = engine.run("me", ModuleKind::XpEngine).await?;
//!     println!("{}", payload.summary);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod cache;
pub mod config;
pub mod memory;
pub mod stats;

// Re-export top-level types for convenience
pub use analytics::{
    AnalyticsEngine, AnalyticsError, AnalyticsModule, AnalyticsResult, CharacterAnalytics,
    ModuleKind, SearchFilters, SearchQuery,
};

pub use analytics::payload::{
    AnalyticsPayload, ChartKind, ChartSeries, Cluster, GraphData, GraphEdge, GraphNode, Insight,
    MetricValue,
};

pub use cache::{AnalyticsCache, CacheConfig, CacheEntry};

pub use memory::{
    InMemoryStore, MemoryAccessor, MemoryRecord, MemoryStore, Mood, RecordFilter, SqliteStore,
    StoreError,
};

pub use config::{Config, ConfigError};

pub use stats::StatsError;
