//! Saga / Arc Engine
//!
//! Groups embedded memories into thematic clusters with a simplified
//! k-means (deterministic even-index seeding, cosine distance, capped
//! iterations), promotes clusters with internal movement to narrative
//! "arcs", and chains temporally adjacent arcs into sagas.
//!
//! The clustering is a documented approximation: the fixed iteration cap
//! and index-spaced seeding are part of the contract, chosen so reruns on
//! unchanged input produce identical assignments.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Cluster, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{chronological, MemoryRecord, RecordFilter};
use crate::stats;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;

const MAX_ITERATIONS: usize = 10;
const CONVERGENCE_SIMILARITY: f64 = 0.95;
const ARC_SENTIMENT_SPLIT: f64 = 0.3;
const ARC_TOPIC_OVERLAP: f64 = 0.4;
const ARC_MIN_MEMBERS: usize = 5;
const SAGA_GAP_DAYS: i64 = 30;

/// A promoted narrative arc
#[derive(Debug, Clone)]
pub struct Arc {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub avg_sentiment: f64,
    pub member_ids: Vec<String>,
}

impl Arc {
    /// Sentiment color code: green above 0.3, red below -0.3, gray between
    pub fn color(&self) -> &'static str {
        if self.avg_sentiment > 0.3 {
            "green"
        } else if self.avg_sentiment < -0.3 {
            "red"
        } else {
            "gray"
        }
    }
}

/// Saga / Arc Engine module
pub struct SagaEngine;

impl SagaEngine {
    pub fn new() -> Self {
        Self
    }

    /// Cluster count for n points: `clamp(floor(sqrt(n)), 2, 10)`
    fn cluster_count(n: usize) -> usize {
        ((n as f64).sqrt().floor() as usize).clamp(2, 10)
    }

    /// Simplified k-means over embeddings, returning one cluster index per
    /// point
    ///
    /// Centroids seed at evenly spaced indices; iteration stops at the cap
    /// or once every centroid's cosine similarity to its predecessor
    /// reaches 0.95. Deterministic for a fixed input order.
    pub fn kmeans(embeddings: &[&[f32]], k: usize) -> Vec<usize> {
        let n = embeddings.len();
        if n == 0 {
            return Vec::new();
        }
        let k = k.min(n).max(1);

        let mut centroids: Vec<Vec<f32>> = (0..k)
            .map(|i| embeddings[i * n / k].to_vec())
            .collect();
        let mut assignment = vec![0usize; n];

        for _ in 0..MAX_ITERATIONS {
            for (i, point) in embeddings.iter().enumerate() {
                let mut best = 0usize;
                let mut best_sim = f64::NEG_INFINITY;
                for (c, centroid) in centroids.iter().enumerate() {
                    let sim = stats::cosine_similarity(point, centroid).unwrap_or(0.0);
                    if sim > best_sim {
                        best_sim = sim;
                        best = c;
                    }
                }
                assignment[i] = best;
            }

            let mut converged = true;
            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&[f32]> = embeddings
                    .iter()
                    .zip(assignment.iter())
                    .filter(|(_, &a)| a == c)
                    .map(|(e, _)| *e)
                    .collect();

                // An emptied cluster keeps its previous centroid.
                if let Ok(updated) = stats::centroid(&members) {
                    let sim = stats::cosine_similarity(centroid, &updated).unwrap_or(0.0);
                    if sim < CONVERGENCE_SIMILARITY {
                        converged = false;
                    }
                    *centroid = updated;
                }
            }

            if converged {
                break;
            }
        }

        assignment
    }

    /// Most frequent topic among members, falling back to the first three
    /// words of the earliest memory
    fn label_cluster(members: &[&MemoryRecord]) -> String {
        let mut topic_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in members {
            for topic in &record.topics {
                *topic_counts.entry(topic.as_str()).or_insert(0) += 1;
            }
        }

        if let Some((topic, _)) = topic_counts.iter().max_by_key(|(_, &count)| count) {
            return topic.to_string();
        }

        members
            .first()
            .map(|r| {
                r.text
                    .split_whitespace()
                    .take(3)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_else(|| "untitled".to_string())
    }

    /// Whether a cluster carries enough internal movement to be an arc
    ///
    /// Promoted on a sentiment half-split difference above 0.3, a topic
    /// overlap ratio below 0.4 between halves, or simply five members.
    fn qualifies_as_arc(members: &[&MemoryRecord]) -> bool {
        if members.len() >= ARC_MIN_MEMBERS {
            return true;
        }
        if members.len() < 2 {
            return false;
        }

        let mid = members.len() / 2;
        let (first, second) = members.split_at(mid);

        let first_avg =
            stats::mean(&first.iter().map(|r| r.sentiment_or_neutral()).collect::<Vec<_>>());
        let second_avg =
            stats::mean(&second.iter().map(|r| r.sentiment_or_neutral()).collect::<Vec<_>>());
        if (second_avg - first_avg).abs() > ARC_SENTIMENT_SPLIT {
            return true;
        }

        let first_topics: std::collections::BTreeSet<&str> = first
            .iter()
            .flat_map(|r| r.topics.iter().map(|t| t.as_str()))
            .collect();
        let second_topics: std::collections::BTreeSet<&str> = second
            .iter()
            .flat_map(|r| r.topics.iter().map(|t| t.as_str()))
            .collect();
        let union = first_topics.union(&second_topics).count();
        if union == 0 {
            return false;
        }
        let overlap = first_topics.intersection(&second_topics).count();
        (overlap as f64 / union as f64) < ARC_TOPIC_OVERLAP
    }

    /// Cluster, label, and promote a working set into arcs
    pub fn build_arcs(records: &[MemoryRecord]) -> Vec<Arc> {
        let ordered = chronological(records);
        let dims = match ordered.iter().find_map(|r| r.embedding.as_ref()) {
            Some(e) => e.len(),
            None => return Vec::new(),
        };

        // Drop records whose embedding disagrees on dimension.
        let usable: Vec<(&MemoryRecord, &[f32])> = ordered
            .into_iter()
            .filter_map(|r| {
                r.embedding
                    .as_deref()
                    .filter(|e| e.len() == dims)
                    .map(|e| (r, e))
            })
            .collect();
        if usable.is_empty() {
            return Vec::new();
        }

        let embeddings: Vec<&[f32]> = usable.iter().map(|(_, e)| *e).collect();

        let k = Self::cluster_count(usable.len());
        let assignment = Self::kmeans(&embeddings, k);

        let mut arcs = Vec::new();
        for cluster_idx in 0..k {
            let members: Vec<&MemoryRecord> = usable
                .iter()
                .zip(assignment.iter())
                .filter(|(_, &a)| a == cluster_idx)
                .map(|((r, _), _)| *r)
                .collect();

            let Some((first, last)) = members.first().zip(members.last()) else {
                continue;
            };
            let (start, end) = (first.created_at, last.created_at);
            if !Self::qualifies_as_arc(&members) {
                continue;
            }

            let sentiments: Vec<f64> = members.iter().map(|r| r.sentiment_or_neutral()).collect();
            arcs.push(Arc {
                label: Self::label_cluster(&members),
                start,
                end,
                avg_sentiment: stats::mean(&sentiments),
                member_ids: members.iter().map(|r| r.id.clone()).collect(),
            });
        }

        arcs.sort_by_key(|a| a.start);
        arcs
    }

    /// Group arcs whose end-to-start gap is within 30 days into sagas
    pub fn group_sagas(arcs: &[Arc]) -> Vec<Vec<usize>> {
        let mut sagas: Vec<Vec<usize>> = Vec::new();
        let mut current_end: Option<DateTime<Utc>> = None;

        for (i, arc) in arcs.iter().enumerate() {
            let joins_current = current_end
                .map(|end| arc.start.signed_duration_since(end) <= Duration::days(SAGA_GAP_DAYS))
                .unwrap_or(false);

            if joins_current {
                if let Some(saga) = sagas.last_mut() {
                    saga.push(i);
                }
                current_end = current_end.map(|end| end.max(arc.end));
            } else {
                sagas.push(vec![i]);
                current_end = Some(arc.end);
            }
        }

        sagas
    }
}

impl Default for SagaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for SagaEngine {
    fn kind(&self) -> ModuleKind {
        ModuleKind::SagaEngine
    }

    fn min_records(&self) -> usize {
        5
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter::WithEmbedding
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let arcs = Self::build_arcs(records);
        let sagas = Self::group_sagas(&arcs);

        let mut payload = AnalyticsPayload::with_summary(if arcs.is_empty() {
            "No narrative arcs have taken shape yet.".to_string()
        } else {
            format!(
                "Your memories form {} narrative arc{} across {} saga{}.",
                arcs.len(),
                if arcs.len() == 1 { "" } else { "s" },
                sagas.len(),
                if sagas.len() == 1 { "" } else { "s" },
            )
        });

        payload.set_metric("record_count", records.len());
        payload.set_metric("arc_count", arcs.len());
        payload.set_metric("saga_count", sagas.len());

        let timeline_points: Vec<serde_json::Value> = arcs
            .iter()
            .map(|arc| {
                json!({
                    "arc": arc.label,
                    "start": arc.start.to_rfc3339(),
                    "end": arc.end.to_rfc3339(),
                    "sentiment": arc.avg_sentiment,
                    "color": arc.color(),
                    "size": arc.member_ids.len(),
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Scatter, "Arc timeline")
                .axes("start", "sentiment")
                .points(timeline_points),
        );

        let clusters: Vec<Cluster> = arcs
            .iter()
            .enumerate()
            .map(|(i, arc)| Cluster {
                id: format!("arc:{}", i),
                label: arc.label.clone(),
                size: arc.member_ids.len(),
                members: arc.member_ids.clone(),
                summary: format!(
                    "{} chapter from {} to {} ({} memories)",
                    arc.color(),
                    arc.start.format("%Y-%m-%d"),
                    arc.end.format("%Y-%m-%d"),
                    arc.member_ids.len()
                ),
            })
            .collect();

        for arc in &arcs {
            let tone = match arc.color() {
                "green" => "an uplifting",
                "red" => "a difficult",
                _ => "a steady",
            };
            payload.insights.push(Insight::new(
                format!(
                    "\"{}\" reads as {} chapter spanning {} memories.",
                    arc.label,
                    tone,
                    arc.member_ids.len()
                ),
                "arc",
                (arc.member_ids.len() as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        if sagas.iter().any(|s| s.len() > 1) {
            let largest = sagas.iter().map(|s| s.len()).max().unwrap_or(0);
            payload.insights.push(Insight::new(
                format!(
                    "Several arcs run back-to-back; your largest saga chains {} of them.",
                    largest
                ),
                "saga",
                0.6,
            ));
        }

        payload.clusters = Some(clusters);
        payload
    }
}
