//! Life Map Aggregator
//!
//! Composes every other analytics module into one coherent view: sub-module
//! payloads are computed concurrently with per-call failure isolation (a
//! failed module contributes nothing, it never aborts the aggregate),
//! turning points are detected across modules, and a combined graph plus a
//! master narrative tie the result together.

use crate::analytics::payload::{
    AnalyticsPayload, ChartKind, ChartSeries, GraphData, GraphNode, Insight,
};
use crate::analytics::{run_module, AnalyticsModule, AnalyticsResult, ModuleKind};
use crate::cache::AnalyticsCache;
use crate::memory::{chronological, MemoryAccessor, MemoryRecord, RecordFilter};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const MIN_RECORDS: usize = 5;
const EMOTIONAL_JUMP: f64 = 0.6;
const IDENTITY_DRIFT_BAR: f64 = 0.6;
const MAX_TURNING_POINTS: usize = 10;
const FABRIC_SAMPLE_CAP: usize = 40;

/// A detected moment of significant change
#[derive(Debug, Clone)]
pub struct TurningPoint {
    pub date: DateTime<Utc>,
    /// "emotional", "arc_shift", or "identity"
    pub kind: &'static str,
    pub label: String,
}

/// Life Map aggregator
///
/// Owns references to the other modules and drives them through the same
/// cached contract they use standalone, so a life-map run warms the
/// per-module cache as a side effect.
pub struct LifeMapAggregator {
    accessor: Arc<MemoryAccessor>,
    cache: Arc<AnalyticsCache>,
    modules: Vec<Arc<dyn AnalyticsModule>>,
}

impl LifeMapAggregator {
    pub fn new(
        accessor: Arc<MemoryAccessor>,
        cache: Arc<AnalyticsCache>,
        modules: Vec<Arc<dyn AnalyticsModule>>,
    ) -> Self {
        Self {
            accessor,
            cache,
            modules,
        }
    }

    /// Run the aggregate for a user
    pub async fn run(&self, user_id: &str) -> AnalyticsResult<AnalyticsPayload> {
        if let Some(hit) = self.cache.get(user_id, ModuleKind::LifeMap).await {
            return Ok(hit);
        }

        let records = self.accessor.fetch(user_id, RecordFilter::All).await?;
        if records.len() < MIN_RECORDS {
            return Ok(AnalyticsPayload::empty(
                ModuleKind::LifeMap.display_name(),
                records.len(),
                MIN_RECORDS,
            ));
        }

        // Concurrent fan-out; each failure is nulled, never propagated.
        let runs = self.modules.iter().map(|module| {
            let module = module.clone();
            let accessor = self.accessor.clone();
            let cache = self.cache.clone();
            let user_id = user_id.to_string();
            async move {
                let kind = module.kind();
                match run_module(&accessor, &cache, module.as_ref(), &user_id).await {
                    Ok(payload) => (kind, Some(payload)),
                    Err(e) => {
                        tracing::warn!(
                            user_id = %user_id,
                            module = %kind,
                            error = %e,
                            "Life map sub-module failed; continuing without it"
                        );
                        (kind, None)
                    }
                }
            }
        });
        let results: HashMap<ModuleKind, Option<AnalyticsPayload>> =
            join_all(runs).await.into_iter().collect();

        let payload = self.assemble(&records, &results);
        self.cache
            .put(user_id, ModuleKind::LifeMap, payload.clone())
            .await;
        Ok(payload)
    }

    /// Detect turning points across the working set and sub-payloads,
    /// sorted by date and truncated to the most recent ten
    pub fn turning_points(
        records: &[MemoryRecord],
        results: &HashMap<ModuleKind, Option<AnalyticsPayload>>,
    ) -> Vec<TurningPoint> {
        let ordered = chronological(records);
        let mut points = Vec::new();

        // Emotional: adjacent-record sentiment jumps above 0.6.
        for pair in ordered.windows(2) {
            let shift = pair[1].sentiment_or_neutral() - pair[0].sentiment_or_neutral();
            if shift.abs() > EMOTIONAL_JUMP {
                let direction = if shift > 0.0 { "lift" } else { "drop" };
                points.push(TurningPoint {
                    date: pair[1].created_at,
                    kind: "emotional",
                    label: format!("Sharp emotional {} ({:+.1})", direction, shift),
                });
            }
        }

        // Arc shifts: the first memory of each saga arc.
        if let Some(Some(saga)) = results.get(&ModuleKind::SagaEngine) {
            for cluster in saga.clusters.iter().flatten() {
                let first = cluster
                    .members
                    .iter()
                    .filter_map(|id| records.iter().find(|r| &r.id == id))
                    .min_by_key(|r| r.created_at);
                if let Some(record) = first {
                    points.push(TurningPoint {
                        date: record.created_at,
                        kind: "arc_shift",
                        label: format!("\"{}\" begins", cluster.label),
                    });
                }
            }
        }

        // Identity: drift above 0.6, anchored at the most recent record.
        if let Some(Some(identity)) = results.get(&ModuleKind::IdentityPulse) {
            if let Some(drift) = identity.metric_number("drift_score") {
                if drift > IDENTITY_DRIFT_BAR {
                    if let Some(latest) = ordered.last() {
                        points.push(TurningPoint {
                            date: latest.created_at,
                            kind: "identity",
                            label: format!("Identity shift (drift {:.2})", drift),
                        });
                    }
                }
            }
        }

        points.sort_by_key(|p| p.date);
        if points.len() > MAX_TURNING_POINTS {
            points.drain(..points.len() - MAX_TURNING_POINTS);
        }
        points
    }

    /// Merge the relationship graph, arc nodes, and a capped sample of the
    /// memory fabric around a central identity node
    fn combined_graph(results: &HashMap<ModuleKind, Option<AnalyticsPayload>>) -> GraphData {
        let mut graph = GraphData::new();
        graph
            .nodes
            .push(GraphNode::new("you", "You", "identity").weight(1.0));

        if let Some(Some(relationships)) = results.get(&ModuleKind::Relationships) {
            if let Some(rel_graph) = &relationships.graph {
                for node in &rel_graph.nodes {
                    if node.id != "you" {
                        graph.nodes.push(node.clone());
                    }
                }
                graph.edges.extend(rel_graph.edges.iter().cloned());
            }
        }

        if let Some(Some(saga)) = results.get(&ModuleKind::SagaEngine) {
            for cluster in saga.clusters.iter().flatten() {
                graph.nodes.push(
                    GraphNode::new(&cluster.id, &cluster.label, "arc")
                        .weight(cluster.size as f64),
                );
                graph.edges.push(crate::analytics::payload::GraphEdge {
                    source: "you".to_string(),
                    target: cluster.id.clone(),
                    weight: cluster.size as f64,
                });
            }
        }

        if let Some(Some(fabric)) = results.get(&ModuleKind::MemoryFabric) {
            if let Some(fabric_graph) = &fabric.graph {
                let mut sampled: Vec<&GraphNode> = fabric_graph.nodes.iter().collect();
                sampled.sort_by(|a, b| {
                    b.weight
                        .partial_cmp(&a.weight)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                sampled.truncate(FABRIC_SAMPLE_CAP);

                let sampled_ids: std::collections::BTreeSet<&str> =
                    sampled.iter().map(|n| n.id.as_str()).collect();
                graph.nodes.extend(sampled.into_iter().cloned());
                graph.edges.extend(
                    fabric_graph
                        .edges
                        .iter()
                        .filter(|e| {
                            sampled_ids.contains(e.source.as_str())
                                && sampled_ids.contains(e.target.as_str())
                        })
                        .cloned(),
                );
            }
        }

        graph
    }

    fn assemble(
        &self,
        records: &[MemoryRecord],
        results: &HashMap<ModuleKind, Option<AnalyticsPayload>>,
    ) -> AnalyticsPayload {
        let turning_points = Self::turning_points(records, results);
        let graph = Self::combined_graph(results);

        let succeeded = results.values().filter(|r| r.is_some()).count();
        let failed = results.len() - succeeded;

        // Master narrative: each module's strongest insight, in registry
        // order, plus the turning points.
        let mut narrative = Vec::new();
        let mut top_insights = Vec::new();
        for module in &self.modules {
            if let Some(Some(payload)) = results.get(&module.kind()) {
                if payload.is_empty_sentinel() {
                    continue;
                }
                if let Some(best) = payload.top_insights(1).first() {
                    narrative.push(best.text.clone());
                    top_insights.push((*best).clone());
                }
            }
        }
        if let Some(latest) = turning_points.last() {
            narrative.push(format!(
                "{} turning points shape this period; most recently: {}.",
                turning_points.len(),
                latest.label
            ));
        }

        let mut payload = AnalyticsPayload::with_summary(if narrative.is_empty() {
            format!(
                "A quiet map so far: {} memories logged, with patterns still forming.",
                records.len()
            )
        } else {
            narrative.join(" ")
        });

        payload.set_metric("record_count", records.len());
        payload.set_metric("modules_succeeded", succeeded);
        payload.set_metric("modules_failed", failed);
        payload.set_metric("turning_point_count", turning_points.len());

        let timeline: Vec<serde_json::Value> = turning_points
            .iter()
            .map(|p| {
                json!({
                    "date": p.date.to_rfc3339(),
                    "kind": p.kind,
                    "label": p.label,
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Scatter, "Turning points")
                .axes("date", "kind")
                .points(timeline),
        );

        payload.insights = top_insights;
        for point in turning_points.iter().rev().take(3) {
            payload.insights.push(Insight::new(
                format!("{}: {}", point.date.format("%Y-%m-%d"), point.label),
                "turning_point",
                0.6,
            ));
        }

        payload.graph = Some(graph);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsEngine;
    use crate::cache::CacheConfig;
    use crate::memory::store::{InMemoryStore, MemoryStore, StoreError, StoreResult};
    use crate::memory::Mood;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rich_records() -> Vec<MemoryRecord> {
        let base = Utc::now() - Duration::days(40);
        let mut records = Vec::new();
        for i in 0..20 {
            let sentiment = if i % 5 == 0 { -0.7 } else { 0.4 };
            let mut record = MemoryRecord::new(format!("I am finding a rhythm, day {}", i))
                .at(base + Duration::days(i * 2))
                .sentiment(sentiment)
                .topic(if i < 10 { "moving" } else { "settling" })
                .person(if i % 2 == 0 { "sam" } else { "ana" })
                .mood(if sentiment > 0.0 { Mood::Happy } else { Mood::Sad });
            record = record.embedding(vec![
                if i < 10 { 1.0 } else { 0.0 },
                0.02 * i as f32,
                if i < 10 { 0.0 } else { 1.0 },
            ]);
            records.push(record);
        }
        records
    }

    async fn engine_with(records: Vec<MemoryRecord>) -> AnalyticsEngine {
        let store = Arc::new(InMemoryStore::new());
        store.seed("user-1", records).await;
        let accessor = Arc::new(MemoryAccessor::new(store, 500));
        let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
        AnalyticsEngine::new(accessor, cache)
    }

    #[tokio::test]
    async fn test_life_map_composes_modules() {
        let engine = engine_with(rich_records()).await;
        let payload = engine.run("user-1", ModuleKind::LifeMap).await.unwrap();

        assert!(!payload.is_empty_sentinel());
        assert_eq!(payload.metric_number("modules_failed"), Some(0.0));
        assert!(payload.metric_number("turning_point_count").unwrap() > 0.0);

        let graph = payload.graph.as_ref().unwrap();
        assert!(graph.nodes.iter().any(|n| n.kind == "identity"));
        assert!(graph.nodes.iter().any(|n| n.kind == "person"));
        assert!(graph.nodes.iter().any(|n| n.kind == "memory"));
        assert!(!payload.summary.is_empty());
    }

    #[tokio::test]
    async fn test_life_map_warms_sub_module_cache() {
        let engine = engine_with(rich_records()).await;
        engine.run("user-1", ModuleKind::LifeMap).await.unwrap();

        assert!(engine
            .cache()
            .get("user-1", ModuleKind::XpEngine)
            .await
            .is_some());
        assert!(engine
            .cache()
            .get("user-1", ModuleKind::LifeMap)
            .await
            .is_some());
    }

    #[test]
    fn test_turning_points_emotional_jumps() {
        let base = Utc::now() - Duration::days(10);
        let records = vec![
            MemoryRecord::new("calm").at(base).sentiment(0.1),
            MemoryRecord::new("crash").at(base + Duration::days(1)).sentiment(-0.8),
            MemoryRecord::new("rebound").at(base + Duration::days(2)).sentiment(0.2),
        ];

        let results = HashMap::new();
        let points = LifeMapAggregator::turning_points(&records, &results);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.kind == "emotional"));
        assert!(points[0].label.contains("drop"));
        assert!(points[1].label.contains("lift"));
    }

    #[test]
    fn test_turning_points_capped_at_ten_most_recent() {
        let base = Utc::now() - Duration::days(40);
        let records: Vec<MemoryRecord> = (0..30)
            .map(|i| {
                let sentiment = if i % 2 == 0 { -0.5 } else { 0.5 };
                MemoryRecord::new(format!("swing {}", i))
                    .at(base + Duration::days(i))
                    .sentiment(sentiment)
            })
            .collect();

        let results = HashMap::new();
        let points = LifeMapAggregator::turning_points(&records, &results);
        assert_eq!(points.len(), 10);
        // The kept points are the most recent, still in date order.
        for pair in points.windows(2) {
            assert!(pair[0].date <= pair[1].date);
        }
        assert_eq!(points[9].date, records[29].created_at);
    }

    /// Store whose fetches fail after the first call; the life map's own
    /// fetch succeeds, every sub-module's fails.
    struct FlakyStore {
        inner: InMemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MemoryStore for FlakyStore {
        async fn fetch_memories(
            &self,
            user_id: &str,
            limit: Option<usize>,
        ) -> StoreResult<Vec<MemoryRecord>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(StoreError::Serialization("injected failure".to_string()));
            }
            self.inner.fetch_memories(user_id, limit).await
        }

        async fn insert(&self, user_id: &str, record: MemoryRecord) -> StoreResult<()> {
            self.inner.insert(user_id, record).await
        }

        async fn count(&self, user_id: &str) -> StoreResult<usize> {
            self.inner.count(user_id).await
        }
    }

    #[tokio::test]
    async fn test_sub_module_failures_do_not_abort_aggregate() {
        let inner = InMemoryStore::new();
        inner.seed("user-1", rich_records()).await;
        let store = Arc::new(FlakyStore {
            inner,
            calls: AtomicUsize::new(0),
        });

        let accessor = Arc::new(MemoryAccessor::new(store, 500));
        let cache = Arc::new(AnalyticsCache::new(CacheConfig::default()));
        let engine = AnalyticsEngine::new(accessor, cache);

        let payload = engine.run("user-1", ModuleKind::LifeMap).await.unwrap();
        assert!(!payload.is_empty_sentinel());
        assert_eq!(payload.metric_number("modules_succeeded"), Some(0.0));
        assert_eq!(payload.metric_number("modules_failed"), Some(9.0));
        // Emotional turning points still come straight from the records.
        assert!(payload.metric_number("turning_point_count").unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_life_map_empty_below_minimum() {
        let engine = engine_with(vec![MemoryRecord::new("only one")]).await;
        let payload = engine.run("user-1", ModuleKind::LifeMap).await.unwrap();
        assert!(payload.is_empty_sentinel());
    }
}
