//! Character Analytics
//!
//! Treats the people in a journal as the cast of a story: who appears
//! together, who holds the network together, and who stays on the margins.
//! Builds a bidirectional co-mention graph (an edge for every pair of
//! people sharing a memory, weighted by shared-memory count) and reads
//! degree centrality, the main cast, and strong ties out of it.
//!
//! Relationship Analytics looks at each person's bond with the user;
//! this module looks at the structure between the people themselves.

use crate::analytics::payload::{
    AnalyticsPayload, ChartKind, ChartSeries, GraphData, GraphEdge, GraphNode, Insight,
};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{MemoryRecord, RecordFilter};
use serde_json::json;
use std::collections::BTreeMap;

const MAIN_CAST_SIZE: usize = 5;
const STRONG_TIE_SHARED: usize = 3;

/// A co-mention tie between two characters
#[derive(Debug, Clone)]
pub struct Tie {
    pub a: String,
    pub b: String,
    /// Number of memories mentioning both
    pub shared: usize,
    /// Ids of the shared memories
    pub shared_ids: Vec<String>,
}

/// The character co-mention network
#[derive(Debug, Default)]
pub struct CharacterNetwork {
    /// Mention count per character
    pub characters: BTreeMap<String, usize>,
    /// One tie per unordered pair, keyed (a, b) with a < b
    pub ties: BTreeMap<(String, String), Tie>,
}

impl CharacterNetwork {
    /// Build the network from a working set
    pub fn build(records: &[MemoryRecord]) -> Self {
        let mut network = Self::default();

        for record in records {
            let people: Vec<&str> = record.people.iter().map(|p| p.as_str()).collect();
            for name in &people {
                *network.characters.entry(name.to_string()).or_insert(0) += 1;
            }
            for (i, &a) in people.iter().enumerate() {
                for &b in &people[i + 1..] {
                    let tie = network
                        .ties
                        .entry((a.to_string(), b.to_string()))
                        .or_insert_with(|| Tie {
                            a: a.to_string(),
                            b: b.to_string(),
                            shared: 0,
                            shared_ids: Vec::new(),
                        });
                    tie.shared += 1;
                    tie.shared_ids.push(record.id.clone());
                }
            }
        }

        network
    }

    /// Number of ties incident to a character
    pub fn degree(&self, name: &str) -> usize {
        self.ties
            .keys()
            .filter(|(a, b)| a == name || b == name)
            .count()
    }

    /// Degree centrality: ties divided by the other characters available
    pub fn centrality(&self, name: &str) -> f64 {
        let others = self.characters.len().saturating_sub(1).max(1);
        self.degree(name) as f64 / others as f64
    }

    /// Characters ranked by centrality, mention count breaking ties
    pub fn main_cast(&self, limit: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .characters
            .keys()
            .map(|name| (name.clone(), self.centrality(name)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.characters[&b.0].cmp(&self.characters[&a.0]))
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Fraction of possible pairs actually tied
    pub fn density(&self) -> f64 {
        let n = self.characters.len();
        if n < 2 {
            return 0.0;
        }
        let possible = n * (n - 1) / 2;
        self.ties.len() as f64 / possible as f64
    }

    /// Characters never co-mentioned with anyone
    pub fn solo_characters(&self) -> Vec<&str> {
        self.characters
            .keys()
            .filter(|name| self.degree(name) == 0)
            .map(|name| name.as_str())
            .collect()
    }
}

/// Character Analytics module
pub struct CharacterAnalytics;

impl CharacterAnalytics {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CharacterAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for CharacterAnalytics {
    fn kind(&self) -> ModuleKind {
        ModuleKind::CharacterAnalytics
    }

    fn min_records(&self) -> usize {
        3
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter::WithPeople
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let network = CharacterNetwork::build(records);
        let cast = network.main_cast(MAIN_CAST_SIZE);
        let solo = network.solo_characters();

        let mut payload = AnalyticsPayload::with_summary(match cast.first() {
            Some((lead, _)) if network.characters.len() > 1 => format!(
                "A cast of {} people runs through these memories, with {} at its center.",
                network.characters.len(),
                lead
            ),
            Some((lead, _)) => format!("{} is the one recurring character so far.", lead),
            None => "No named people found in your memories.".to_string(),
        });

        payload.set_metric("character_count", network.characters.len());
        payload.set_metric("tie_count", network.ties.len());
        payload.set_metric("network_density", network.density());
        if let Some((lead, centrality)) = cast.first() {
            payload.set_metric("most_central", lead.clone());
            payload.set_metric("most_central_score", *centrality);
        }

        let cast_points: Vec<serde_json::Value> = cast
            .iter()
            .map(|(name, centrality)| {
                json!({
                    "character": name,
                    "centrality": centrality,
                    "mentions": network.characters[name],
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Bar, "Main cast")
                .axes("character", "centrality")
                .points(cast_points),
        );

        let mut graph = GraphData::new();
        for (name, &mentions) in &network.characters {
            graph.nodes.push(
                GraphNode::new(format!("person:{}", name), name, "person")
                    .weight(network.centrality(name) * mentions as f64),
            );
        }
        for tie in network.ties.values() {
            graph.edges.push(GraphEdge {
                source: format!("person:{}", tie.a),
                target: format!("person:{}", tie.b),
                weight: tie.shared as f64,
            });
        }

        if let Some((lead, centrality)) = cast.first() {
            if network.characters.len() > 2 {
                payload.insights.push(Insight::new(
                    format!(
                        "{} connects to {:.0}% of the people in your life story.",
                        lead,
                        centrality * 100.0
                    ),
                    "central",
                    *centrality,
                ));
            }
        }

        let mut strong_ties: Vec<&Tie> = network
            .ties
            .values()
            .filter(|t| t.shared >= STRONG_TIE_SHARED)
            .collect();
        strong_ties.sort_by_key(|t| std::cmp::Reverse(t.shared));
        for tie in strong_ties.iter().take(3) {
            payload.insights.push(Insight::new(
                format!(
                    "{} and {} share {} memories, a recurring pairing.",
                    tie.a, tie.b, tie.shared
                ),
                "tie",
                (tie.shared as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        if !solo.is_empty() && network.characters.len() > solo.len() {
            payload.insights.push(Insight::new(
                format!(
                    "{} {} in a separate corner of your life, never overlapping the rest.",
                    solo.join(", "),
                    if solo.len() == 1 { "sits" } else { "sit" }
                ),
                "separate",
                (solo.len() as f64 / network.characters.len() as f64).clamp(0.0, 1.0),
            ));
        }

        payload.graph = Some(graph);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(text: &str, people: &[&str]) -> MemoryRecord {
        let mut record = MemoryRecord::new(text);
        for person in people {
            record = record.person(*person);
        }
        record
    }

    #[test]
    fn test_network_counts_mentions_and_ties() {
        let records = vec![
            shared("dinner", &["sam", "ana"]),
            shared("hike", &["sam", "ana"]),
            shared("call", &["sam"]),
            shared("party", &["sam", "ana", "rex"]),
        ];

        let network = CharacterNetwork::build(&records);
        assert_eq!(network.characters["sam"], 4);
        assert_eq!(network.characters["ana"], 3);
        assert_eq!(network.characters["rex"], 1);

        let tie = &network.ties[&("ana".to_string(), "sam".to_string())];
        assert_eq!(tie.shared, 3);
        assert_eq!(tie.shared_ids.len(), 3);
    }

    #[test]
    fn test_degree_centrality() {
        // sam ties to both others; rex only to sam.
        let records = vec![
            shared("a", &["sam", "ana"]),
            shared("b", &["sam", "rex"]),
        ];
        let network = CharacterNetwork::build(&records);

        assert_eq!(network.degree("sam"), 2);
        assert_eq!(network.degree("rex"), 1);
        assert!((network.centrality("sam") - 1.0).abs() < 1e-9);
        assert!((network.centrality("rex") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_main_cast_ranked_by_centrality() {
        let records = vec![
            shared("a", &["sam", "ana"]),
            shared("b", &["sam", "rex"]),
            shared("c", &["lone"]),
        ];
        let network = CharacterNetwork::build(&records);

        let cast = network.main_cast(10);
        assert_eq!(cast[0].0, "sam");
        assert_eq!(cast.last().unwrap().0, "lone");
        assert_eq!(cast.last().unwrap().1, 0.0);
    }

    #[test]
    fn test_density() {
        // Three characters, two of three possible ties.
        let records = vec![
            shared("a", &["sam", "ana"]),
            shared("b", &["sam", "rex"]),
        ];
        let network = CharacterNetwork::build(&records);
        assert!((network.density() - 2.0 / 3.0).abs() < 1e-9);

        let empty = CharacterNetwork::build(&[]);
        assert_eq!(empty.density(), 0.0);
    }

    #[test]
    fn test_solo_characters() {
        let records = vec![
            shared("a", &["sam", "ana"]),
            shared("b", &["lone"]),
        ];
        let network = CharacterNetwork::build(&records);
        assert_eq!(network.solo_characters(), vec!["lone"]);
    }

    #[test]
    fn test_compute_graph_and_insights() {
        let records = vec![
            shared("dinner", &["sam", "ana"]),
            shared("hike", &["sam", "ana"]),
            shared("party", &["sam", "ana"]),
            shared("errand", &["rex"]),
        ];

        let module = CharacterAnalytics::new();
        let payload = module.compute(&records);

        assert_eq!(payload.metric_number("character_count"), Some(3.0));
        assert_eq!(payload.metric_number("tie_count"), Some(1.0));

        let graph = payload.graph.as_ref().unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].weight, 3.0);

        // Three shared memories crosses the strong-tie bar.
        assert!(payload.insights.iter().any(|i| i.category == "tie"));
        // rex never overlaps sam or ana.
        assert!(payload
            .insights
            .iter()
            .any(|i| i.category == "separate" && i.text.contains("rex")));
    }

    #[test]
    fn test_single_character_payload() {
        let records = vec![shared("call", &["mom"]), shared("visit", &["mom"])];
        let module = CharacterAnalytics::new();
        let payload = module.compute(&records);

        assert_eq!(payload.metric_number("character_count"), Some(1.0));
        assert_eq!(payload.metric_number("network_density"), Some(0.0));
        assert!(payload.summary.contains("mom"));
    }
}
