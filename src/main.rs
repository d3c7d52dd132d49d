//! Memoir demo
//!
//! Seeds an in-memory store with a few weeks of sample memories and runs
//! the full analytics engine over them.

use memoir::analytics::{AnalyticsEngine, ModuleKind, SearchQuery};
use memoir::cache::{AnalyticsCache, CacheConfig};
use memoir::memory::{InMemoryStore, MemoryAccessor, MemoryRecord, Mood};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_USER: &str = "demo-user";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memoir=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Memoir Journaling Intelligence v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(InMemoryStore::new());
    store.seed(DEMO_USER, demo_memories()).await;

    let accessor = Arc::new(MemoryAccessor::new(store, 500));
    let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
    let engine = AnalyticsEngine::new(accessor, cache);

    // Run every standalone module
    for kind in [
        ModuleKind::IdentityPulse,
        ModuleKind::Relationships,
        ModuleKind::CharacterAnalytics,
        ModuleKind::SagaEngine,
        ModuleKind::MemoryFabric,
        ModuleKind::InsightEngine,
        ModuleKind::PredictionEngine,
        ModuleKind::ShadowEngine,
        ModuleKind::XpEngine,
    ] {
        let payload = engine.run(DEMO_USER, kind).await?;
        tracing::info!(
            module = %kind,
            insights = payload.insights.len(),
            "{}",
            payload.summary
        );
    }

    // Search
    let results = engine
        .search(DEMO_USER, SearchQuery::new("climbing with Sam"))
        .await?;
    tracing::info!("Search: {}", results.summary);

    // The aggregate view
    let life_map = engine.run(DEMO_USER, ModuleKind::LifeMap).await?;
    tracing::info!(
        turning_points = life_map.metric_number("turning_point_count").unwrap_or(0.0),
        modules_succeeded = life_map.metric_number("modules_succeeded").unwrap_or(0.0),
        "Life map ready"
    );
    tracing::info!("{}", life_map.summary);

    Ok(())
}

/// A month of synthetic journaling: a climbing arc with Sam, a stressful
/// work stretch, and a quiet reading habit
fn demo_memories() -> Vec<MemoryRecord> {
    let now = chrono::Utc::now();
    let day = |d: i64| now - chrono::Duration::days(d);
    let mut memories = Vec::new();

    for week in 0..4i64 {
        let base = 28 - week * 7;

        memories.push(
            MemoryRecord::new(format!(
                "Climbing at the gym with Sam again. I am getting braver on the wall, week {}.",
                week + 1
            ))
            .at(day(base))
            .sentiment(0.5 + 0.1 * week as f64)
            .mood(Mood::Happy)
            .topic("climbing")
            .person("Sam")
            .embedding(vec![1.0, 0.1 * week as f32, 0.0]),
        );

        memories.push(
            MemoryRecord::new("Deadline pressure all day. The project keeps slipping.")
                .at(day(base - 2))
                .sentiment(-0.6)
                .mood(Mood::Anxious)
                .topic("work")
                .topic("deadline")
                .person("Priya")
                .embedding(vec![0.0, 0.1 * week as f32, 1.0]),
        );

        memories.push(
            MemoryRecord::new("Finished another chapter before bed. Quiet and good.")
                .at(day(base - 4))
                .sentiment(0.3)
                .mood(Mood::Calm)
                .topic("reading")
                .embedding(vec![0.3, 1.0, 0.2]),
        );

        memories.push(
            MemoryRecord::new("Long call with Ana about the move. I feel like I am ready for a change.")
                .at(day(base - 5))
                .sentiment(if week < 2 { -0.2 } else { 0.4 })
                .mood(if week < 2 { Mood::Sad } else { Mood::Happy })
                .topic("moving")
                .person("Ana")
                .embedding(vec![0.5, 0.5, 0.5]),
        );

        memories.push(
            MemoryRecord::new("Sam and Ana finally met over dinner. Easier than I expected.")
                .at(day(base - 6))
                .sentiment(0.6)
                .mood(Mood::Happy)
                .topic("friends")
                .person("Sam")
                .person("Ana")
                .embedding(vec![0.8, 0.3, 0.2]),
        );
    }

    memories
}
