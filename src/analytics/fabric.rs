//! Memory Fabric
//!
//! Builds a similarity graph over embedded memories (edge when cosine
//! similarity reaches 0.7) and reads structure out of it: clusters are
//! connected components of three or more memories found by breadth-first
//! traversal (not k-means), and outliers are weakly connected memories
//! that never made it into a cluster.

use crate::analytics::payload::{
    AnalyticsPayload, ChartKind, ChartSeries, Cluster, GraphData, GraphEdge, GraphNode, Insight,
};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{MemoryRecord, RecordFilter};
use crate::stats;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};

const EDGE_SIMILARITY: f64 = 0.7;
const CLUSTER_MIN_SIZE: usize = 3;
const OUTLIER_DEGREE_RATIO: f64 = 0.3;

/// The fabric before interpretation: adjacency over record indices
#[derive(Debug)]
pub struct SimilarityGraph {
    /// Neighbor lists per record index
    pub adjacency: Vec<Vec<usize>>,
    /// Edge list as (a, b, similarity) with a < b
    pub edges: Vec<(usize, usize, f64)>,
}

impl SimilarityGraph {
    /// Connect records whose embeddings reach the similarity threshold
    ///
    /// Records whose embedding dimension disagrees with the first embedded
    /// record are left isolated rather than failing the build.
    pub fn build(records: &[MemoryRecord]) -> Self {
        let n = records.len();
        let mut adjacency = vec![Vec::new(); n];
        let mut edges = Vec::new();

        for i in 0..n {
            let Some(a) = records[i].embedding.as_deref() else {
                continue;
            };
            for j in (i + 1)..n {
                let Some(b) = records[j].embedding.as_deref() else {
                    continue;
                };
                let Ok(similarity) = stats::cosine_similarity(a, b) else {
                    continue;
                };
                if similarity >= EDGE_SIMILARITY {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                    edges.push((i, j, similarity));
                }
            }
        }

        Self { adjacency, edges }
    }

    /// Mean degree across all nodes
    pub fn average_degree(&self) -> f64 {
        if self.adjacency.is_empty() {
            return 0.0;
        }
        let total: usize = self.adjacency.iter().map(|n| n.len()).sum();
        total as f64 / self.adjacency.len() as f64
    }

    /// Connected components via breadth-first traversal, largest first
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.adjacency.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            visited[start] = true;

            while let Some(node) = queue.pop_front() {
                component.push(node);
                for &next in &self.adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components.sort_by_key(|c| std::cmp::Reverse(c.len()));
        components
    }
}

/// Memory Fabric module
pub struct MemoryFabric;

impl MemoryFabric {
    pub fn new() -> Self {
        Self
    }

    /// Outlier indices: memories outside every cluster whose degree falls
    /// below 30% of the average, plus members of components that were too
    /// small to count as clusters
    pub fn outliers(graph: &SimilarityGraph, components: &[Vec<usize>]) -> Vec<usize> {
        let avg_degree = graph.average_degree();
        let mut clustered = vec![false; graph.adjacency.len()];
        for component in components {
            if component.len() >= CLUSTER_MIN_SIZE {
                for &idx in component {
                    clustered[idx] = true;
                }
            }
        }

        let mut outliers = Vec::new();
        for idx in 0..graph.adjacency.len() {
            if clustered[idx] {
                continue;
            }
            let degree = graph.adjacency[idx].len();
            let weakly_connected = (degree as f64) < avg_degree * OUTLIER_DEGREE_RATIO;
            let in_undersized_component = degree >= 1;
            if weakly_connected || in_undersized_component {
                outliers.push(idx);
            }
        }
        outliers
    }

    fn label_component(records: &[MemoryRecord], component: &[usize]) -> String {
        let mut topic_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &idx in component {
            for topic in &records[idx].topics {
                *topic_counts.entry(topic.as_str()).or_insert(0) += 1;
            }
        }
        if let Some((topic, _)) = topic_counts.iter().max_by_key(|(_, &count)| count) {
            return topic.to_string();
        }
        component
            .first()
            .map(|&idx| {
                records[idx]
                    .text
                    .split_whitespace()
                    .take(3)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_else(|| "untitled".to_string())
    }

    fn snippet(text: &str) -> String {
        let mut snippet: String = text.chars().take(40).collect();
        if text.chars().count() > 40 {
            snippet.push('…');
        }
        snippet
    }
}

impl Default for MemoryFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for MemoryFabric {
    fn kind(&self) -> ModuleKind {
        ModuleKind::MemoryFabric
    }

    fn min_records(&self) -> usize {
        5
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter::WithEmbedding
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let graph = SimilarityGraph::build(records);
        let components = graph.components();
        let outlier_indices = Self::outliers(&graph, &components);

        let clusters: Vec<Cluster> = components
            .iter()
            .filter(|c| c.len() >= CLUSTER_MIN_SIZE)
            .enumerate()
            .map(|(i, component)| Cluster {
                id: format!("fabric:{}", i),
                label: Self::label_component(records, component),
                size: component.len(),
                members: component.iter().map(|&idx| records[idx].id.clone()).collect(),
                summary: format!("{} closely related memories", component.len()),
            })
            .collect();

        let mut payload = AnalyticsPayload::with_summary(format!(
            "{} of your memories weave into {} theme{}; {} sit apart from the rest.",
            records.len(),
            clusters.len(),
            if clusters.len() == 1 { "" } else { "s" },
            outlier_indices.len()
        ));

        payload.set_metric("node_count", records.len());
        payload.set_metric("edge_count", graph.edges.len());
        payload.set_metric("cluster_count", clusters.len());
        payload.set_metric("outlier_count", outlier_indices.len());
        payload.set_metric("average_degree", graph.average_degree());

        let mut graph_data = GraphData::new();
        for (idx, record) in records.iter().enumerate() {
            graph_data.nodes.push(
                GraphNode::new(&record.id, Self::snippet(&record.text), "memory")
                    .weight(graph.adjacency[idx].len() as f64),
            );
        }
        for &(a, b, similarity) in &graph.edges {
            graph_data.edges.push(GraphEdge {
                source: records[a].id.clone(),
                target: records[b].id.clone(),
                weight: similarity,
            });
        }

        if !clusters.is_empty() {
            let sizes: Vec<serde_json::Value> = clusters
                .iter()
                .map(|c| json!({ "theme": c.label, "size": c.size }))
                .collect();
            payload.charts.push(
                ChartSeries::new(ChartKind::Pie, "Theme sizes")
                    .axes("theme", "size")
                    .points(sizes),
            );

            let largest = &clusters[0];
            payload.insights.push(Insight::new(
                format!(
                    "Your densest web of memories centers on \"{}\" ({} entries).",
                    largest.label, largest.size
                ),
                "fabric",
                (largest.size as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        if !outlier_indices.is_empty() {
            payload.insights.push(Insight::new(
                format!(
                    "{} memories stand apart from your main themes, possibly unexplored threads.",
                    outlier_indices.len()
                ),
                "outlier",
                (outlier_indices.len() as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        payload.clusters = Some(clusters);
        payload.graph = Some(graph_data);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(id: &str, embedding: Vec<f32>) -> MemoryRecord {
        let mut record = MemoryRecord::new(format!("memory {}", id)).embedding(embedding);
        record.id = id.to_string();
        record
    }

    #[test]
    fn test_edges_require_threshold() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![1.0, 0.1]),
            embedded("c", vec![0.0, 1.0]),
        ];
        let graph = SimilarityGraph::build(&records);
        // a-b are nearly parallel; c is orthogonal to both.
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.adjacency[0], vec![1]);
        assert!(graph.adjacency[2].is_empty());
    }

    #[test]
    fn test_mismatched_dimensions_stay_isolated() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![1.0, 0.0, 0.0]),
        ];
        let graph = SimilarityGraph::build(&records);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_components_via_bfs() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![0.95, 0.05]),
            embedded("c", vec![0.9, 0.1]),
            embedded("d", vec![0.0, 1.0]),
        ];
        let graph = SimilarityGraph::build(&records);
        let components = graph.components();
        assert_eq!(components[0], vec![0, 1, 2]);
        assert_eq!(components[1], vec![3]);
    }

    #[test]
    fn test_two_identical_embeddings_are_outliers_not_a_cluster() {
        // A 2-member connected component is below the cluster size bar, so
        // both memories surface as outliers instead.
        let records = vec![
            embedded("a", vec![0.5, 0.5, 0.1]),
            embedded("b", vec![0.5, 0.5, 0.1]),
        ];
        let graph = SimilarityGraph::build(&records);
        assert_eq!(graph.edges.len(), 1);

        let components = graph.components();
        assert_eq!(components[0].len(), 2);

        let module = MemoryFabric::new();
        let payload = module.compute(&records);
        assert_eq!(payload.metric_number("cluster_count"), Some(0.0));
        assert_eq!(payload.metric_number("outlier_count"), Some(2.0));
    }

    #[test]
    fn test_clustered_memories_are_not_outliers() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![0.95, 0.05]),
            embedded("c", vec![0.9, 0.1]),
        ];
        let graph = SimilarityGraph::build(&records);
        let components = graph.components();
        let outliers = MemoryFabric::outliers(&graph, &components);
        assert!(outliers.is_empty());
    }

    #[test]
    fn test_isolated_node_in_dense_graph_is_outlier() {
        let mut records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![0.98, 0.02]),
            embedded("c", vec![0.96, 0.04]),
            embedded("d", vec![0.94, 0.06]),
        ];
        records.push(embedded("lone", vec![0.0, 1.0]));

        let graph = SimilarityGraph::build(&records);
        let components = graph.components();
        let outliers = MemoryFabric::outliers(&graph, &components);
        assert_eq!(outliers, vec![4]);
    }

    #[test]
    fn test_compute_graph_payload() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![0.97, 0.03]),
            embedded("c", vec![0.94, 0.06]),
            embedded("d", vec![0.0, 1.0]),
            embedded("e", vec![0.02, 0.98]),
        ];
        let module = MemoryFabric::new();
        let payload = module.compute(&records);

        let graph = payload.graph.as_ref().unwrap();
        assert_eq!(graph.nodes.len(), 5);
        assert!(payload.metric_number("cluster_count").unwrap() >= 1.0);

        // Cluster members are non-overlapping.
        let clusters = payload.clusters.as_ref().unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for cluster in clusters {
            for member in &cluster.members {
                assert!(seen.insert(member.clone()));
            }
        }
    }
}
