//! Relationship Analytics
//!
//! Aggregates per-person mention counts, sentiment, and monthly activity
//! into interaction scores, rising-mention flags, and a relationship graph
//! centered on the user.

use crate::analytics::payload::{
    AnalyticsPayload, ChartKind, ChartSeries, GraphData, GraphEdge, GraphNode, Insight,
};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{MemoryRecord, RecordFilter};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;

const RISING_THRESHOLD: f64 = 0.2;
const EXTREME_NEGATIVE: f64 = -0.3;
const EXTREME_POSITIVE: f64 = 0.5;
const EXTREME_MIN_MENTIONS: usize = 3;

/// Aggregated view of one named person
#[derive(Debug, Clone)]
pub struct PersonStats {
    pub name: String,
    pub mention_count: usize,
    pub sentiment_sum: f64,
    pub sentiment_mentions: usize,
    pub first_mention: DateTime<Utc>,
    pub last_mention: DateTime<Utc>,
    /// Entries per "%Y-%m" bucket
    pub monthly: BTreeMap<String, usize>,
}

impl PersonStats {
    fn new(name: String, at: DateTime<Utc>) -> Self {
        Self {
            name,
            mention_count: 0,
            sentiment_sum: 0.0,
            sentiment_mentions: 0,
            first_mention: at,
            last_mention: at,
            monthly: BTreeMap::new(),
        }
    }

    /// Mean sentiment over sentiment-bearing mentions; 0 when none
    pub fn avg_sentiment(&self) -> f64 {
        if self.sentiment_mentions == 0 {
            0.0
        } else {
            self.sentiment_sum / self.sentiment_mentions as f64
        }
    }

    /// Recency tier: 1.0 within 30 days, 0.7 within 90, else 0.4
    pub fn recency_weight(&self, now: DateTime<Utc>) -> f64 {
        let age = now.signed_duration_since(self.last_mention);
        if age <= Duration::days(30) {
            1.0
        } else if age <= Duration::days(90) {
            0.7
        } else {
            0.4
        }
    }

    /// `mentions * (1 + avg sentiment) * recency weight`
    pub fn interaction_score(&self, now: DateTime<Utc>) -> f64 {
        self.mention_count as f64 * (1.0 + self.avg_sentiment()) * self.recency_weight(now)
    }

    /// Whether the latest monthly bucket grew >20% over the previous one
    pub fn is_rising(&self) -> bool {
        let buckets: Vec<usize> = self.monthly.values().copied().collect();
        if buckets.len() < 2 {
            return false;
        }
        let previous = buckets[buckets.len() - 2] as f64;
        let latest = buckets[buckets.len() - 1] as f64;
        previous > 0.0 && latest > previous * (1.0 + RISING_THRESHOLD)
    }
}

/// Relationship Analytics module
pub struct RelationshipAnalytics;

impl RelationshipAnalytics {
    pub fn new() -> Self {
        Self
    }

    /// Fold the working set into per-person aggregates
    pub fn aggregate(records: &[MemoryRecord]) -> Vec<PersonStats> {
        let mut people: BTreeMap<String, PersonStats> = BTreeMap::new();

        for record in records {
            let month = record.created_at.format("%Y-%m").to_string();
            for name in &record.people {
                let stats = people
                    .entry(name.clone())
                    .or_insert_with(|| PersonStats::new(name.clone(), record.created_at));

                stats.mention_count += 1;
                if let Some(sentiment) = record.sentiment {
                    stats.sentiment_sum += sentiment;
                    stats.sentiment_mentions += 1;
                }
                if record.created_at < stats.first_mention {
                    stats.first_mention = record.created_at;
                }
                if record.created_at > stats.last_mention {
                    stats.last_mention = record.created_at;
                }
                *stats.monthly.entry(month.clone()).or_insert(0) += 1;
            }
        }

        people.into_values().collect()
    }
}

impl Default for RelationshipAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for RelationshipAnalytics {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Relationships
    }

    fn min_records(&self) -> usize {
        3
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter::WithPeople
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let now = Utc::now();
        let mut people = Self::aggregate(records);
        people.sort_by(|a, b| {
            b.interaction_score(now)
                .partial_cmp(&a.interaction_score(now))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_mentions: usize = people.iter().map(|p| p.mention_count).sum();

        let mut payload = AnalyticsPayload::with_summary(match people.first() {
            Some(top) => format!(
                "{} people appear across {} mentions; {} is at the center of your recent life.",
                people.len(),
                total_mentions,
                top.name
            ),
            None => "No named people found in your memories.".to_string(),
        });

        payload.set_metric("person_count", people.len());
        payload.set_metric("total_mentions", total_mentions);
        if let Some(top) = people.first() {
            payload.set_metric("top_person", top.name.clone());
            payload.set_metric("top_interaction_score", top.interaction_score(now));
        }

        let chart_points: Vec<serde_json::Value> = people
            .iter()
            .take(10)
            .map(|p| {
                json!({
                    "person": p.name,
                    "score": p.interaction_score(now),
                    "mentions": p.mention_count,
                    "avg_sentiment": p.avg_sentiment(),
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Bar, "Top connections")
                .axes("person", "score")
                .points(chart_points),
        );

        let mut graph = GraphData::new();
        graph
            .nodes
            .push(GraphNode::new("you", "You", "identity").weight(1.0));
        for person in &people {
            let node_id = format!("person:{}", person.name);
            graph.nodes.push(
                GraphNode::new(&node_id, &person.name, "person")
                    .weight(person.interaction_score(now)),
            );
            graph.edges.push(GraphEdge {
                source: "you".to_string(),
                target: node_id,
                weight: person.interaction_score(now),
            });
        }

        for person in &people {
            if person.is_rising() {
                payload.insights.push(Insight::new(
                    format!(
                        "You've been mentioning {} noticeably more this month.",
                        person.name
                    ),
                    "rising",
                    0.7,
                ));
            }

            if person.sentiment_mentions >= EXTREME_MIN_MENTIONS {
                let avg = person.avg_sentiment();
                if avg < EXTREME_NEGATIVE {
                    payload.insights.push(Insight::new(
                        format!(
                            "Entries about {} lean negative (avg sentiment {:.2}).",
                            person.name, avg
                        ),
                        "strained",
                        avg.abs().clamp(0.0, 1.0),
                    ));
                } else if avg > EXTREME_POSITIVE {
                    payload.insights.push(Insight::new(
                        format!(
                            "Entries about {} are consistently uplifting (avg sentiment {:.2}).",
                            person.name, avg
                        ),
                        "uplifting",
                        avg.clamp(0.0, 1.0),
                    ));
                }
            }
        }

        if let Some(top) = people.first() {
            payload.insights.push(Insight::new(
                format!(
                    "{} appears in {} memories, your most present relationship.",
                    top.name, top.mention_count
                ),
                "relationship",
                (top.mention_count as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        payload.graph = Some(graph);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(days_ago: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days_ago)
    }

    fn mention(person: &str, days_ago: i64, sentiment: Option<f64>) -> MemoryRecord {
        let mut record = MemoryRecord::new(format!("saw {}", person))
            .at(at(days_ago))
            .person(person);
        if let Some(s) = sentiment {
            record = record.sentiment(s);
        }
        record
    }

    #[test]
    fn test_aggregate_counts_and_bounds() {
        let records = vec![
            mention("sam", 10, Some(0.5)),
            mention("sam", 5, Some(0.7)),
            mention("sam", 40, None),
            mention("ana", 2, Some(-0.4)),
        ];

        let people = RelationshipAnalytics::aggregate(&records);
        assert_eq!(people.len(), 2);

        let sam = people.iter().find(|p| p.name == "sam").unwrap();
        assert_eq!(sam.mention_count, 3);
        assert_eq!(sam.sentiment_mentions, 2);
        assert!((sam.avg_sentiment() - 0.6).abs() < 1e-9);
        assert!(sam.first_mention < sam.last_mention);
    }

    #[test]
    fn test_recency_tiers() {
        let now = Utc::now();
        let mut stats = PersonStats::new("sam".to_string(), now - Duration::days(10));
        assert_eq!(stats.recency_weight(now), 1.0);

        stats.last_mention = now - Duration::days(60);
        assert_eq!(stats.recency_weight(now), 0.7);

        stats.last_mention = now - Duration::days(120);
        assert_eq!(stats.recency_weight(now), 0.4);
    }

    #[test]
    fn test_interaction_score_formula() {
        let now = Utc::now();
        let mut stats = PersonStats::new("sam".to_string(), now - Duration::days(5));
        stats.mention_count = 4;
        stats.sentiment_sum = 1.0;
        stats.sentiment_mentions = 2;
        // 4 * (1 + 0.5) * 1.0
        assert!((stats.interaction_score(now) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_rising_mentions() {
        // Fixed calendar months keep bucket ordering deterministic.
        let jan = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();

        let mut records = Vec::new();
        for _ in 0..2 {
            records.push(MemoryRecord::new("lunch").at(jan).person("sam"));
        }
        for _ in 0..3 {
            records.push(MemoryRecord::new("lunch").at(feb).person("sam"));
        }

        let people = RelationshipAnalytics::aggregate(&records);
        // 3 vs 2 is a 50% jump, above the 20% threshold.
        assert!(people[0].is_rising());
    }

    #[test]
    fn test_not_rising_with_single_bucket() {
        let records = vec![mention("sam", 3, None), mention("sam", 4, None)];
        let people = RelationshipAnalytics::aggregate(&records);
        assert!(!people[0].is_rising());
    }

    #[test]
    fn test_extremes_need_three_sentiment_mentions() {
        let module = RelationshipAnalytics::new();

        // Two negative mentions: not enough for an extreme flag.
        let records = vec![mention("rex", 1, Some(-0.8)), mention("rex", 2, Some(-0.9))];
        let payload = module.compute(&records);
        assert!(!payload.insights.iter().any(|i| i.category == "strained"));

        // Third mention crosses the evidence bar.
        let records = vec![
            mention("rex", 1, Some(-0.8)),
            mention("rex", 2, Some(-0.9)),
            mention("rex", 3, Some(-0.7)),
        ];
        let payload = module.compute(&records);
        assert!(payload.insights.iter().any(|i| i.category == "strained"));
    }

    #[test]
    fn test_graph_centered_on_user() {
        let module = RelationshipAnalytics::new();
        let records = vec![
            mention("sam", 1, Some(0.4)),
            mention("ana", 2, Some(0.1)),
            mention("sam", 3, None),
        ];

        let payload = module.compute(&records);
        let graph = payload.graph.as_ref().unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.edges.iter().all(|e| e.source == "you"));
        assert_eq!(graph.degree("you"), 2);
    }
}
