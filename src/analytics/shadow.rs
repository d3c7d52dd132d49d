//! Shadow Engine
//!
//! Surfaces what the user avoids writing about: topics that are both rare
//! and emotionally negative get a suppression score, suppressed topics map
//! onto fixed archetype themes, and uniformly negative topics are surfaced
//! as explicit negative patterns.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::MemoryRecord;
use crate::stats;
use serde_json::json;
use std::collections::BTreeMap;

const SUPPRESSION_THRESHOLD: f64 = 0.3;
const RARITY_WEIGHT: f64 = 0.6;
const NEGATIVITY_WEIGHT: f64 = 0.4;
const STRONG_NEGATIVE: f64 = -0.5;
const PATTERN_SHARE: f64 = 0.6;

/// Archetype themes suppressed topics map onto, via keyword containment
const ARCHETYPES: &[(&str, &[&str])] = &[
    ("failure", &["fail", "mistake", "mess", "flop", "lost"]),
    ("rejection", &["reject", "ignored", "alone", "abandon", "excluded"]),
    ("shame", &["shame", "embarrass", "guilt", "regret"]),
    ("anger", &["anger", "angry", "rage", "fight", "argument", "conflict"]),
    ("fear", &["fear", "afraid", "scared", "anxiety", "worry", "dread"]),
];

/// A topic scored for suppression
#[derive(Debug, Clone)]
pub struct SuppressedTopic {
    pub topic: String,
    pub occurrences: usize,
    pub avg_sentiment: f64,
    pub score: f64,
}

/// Shadow Engine module
pub struct ShadowEngine;

impl ShadowEngine {
    pub fn new() -> Self {
        Self
    }

    /// Suppression score: `0.6 * rarity + 0.4 * |min(0, avg sentiment)|`
    ///
    /// Always lands in [0, 1].
    pub fn suppression_score(occurrences: usize, total: usize, avg_sentiment: f64) -> f64 {
        let rarity = 1.0 - occurrences as f64 / total.max(1) as f64;
        let negativity = avg_sentiment.min(0.0).abs();
        (RARITY_WEIGHT * rarity + NEGATIVITY_WEIGHT * negativity).clamp(0.0, 1.0)
    }

    /// Score every topic; qualify those with score ≥0.3 and negative
    /// average sentiment, strongest first
    pub fn suppressed_topics(records: &[MemoryRecord]) -> Vec<SuppressedTopic> {
        let total = records.len();
        let mut per_topic: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();

        for record in records {
            for topic in &record.topics {
                *occurrences.entry(topic.as_str()).or_insert(0) += 1;
                if let Some(sentiment) = record.sentiment {
                    per_topic.entry(topic.as_str()).or_default().push(sentiment);
                }
            }
        }

        let mut suppressed = Vec::new();
        for (topic, count) in occurrences {
            let sentiments = per_topic.get(topic).cloned().unwrap_or_default();
            let avg = stats::mean(&sentiments);
            let score = Self::suppression_score(count, total, avg);
            if score >= SUPPRESSION_THRESHOLD && avg < 0.0 {
                suppressed.push(SuppressedTopic {
                    topic: topic.to_string(),
                    occurrences: count,
                    avg_sentiment: avg,
                    score,
                });
            }
        }

        suppressed.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suppressed
    }

    /// Map suppressed topics onto archetype themes by keyword containment;
    /// unmatched topics land in "unexplored". Confidence per archetype is
    /// the mean suppression score of its member topics.
    pub fn archetypes(suppressed: &[SuppressedTopic]) -> Vec<(String, Vec<String>, f64)> {
        let mut grouped: BTreeMap<&str, Vec<&SuppressedTopic>> = BTreeMap::new();

        for topic in suppressed {
            let theme = ARCHETYPES
                .iter()
                .find(|(_, keywords)| keywords.iter().any(|k| topic.topic.contains(k)))
                .map(|(name, _)| *name)
                .unwrap_or("unexplored");
            grouped.entry(theme).or_default().push(topic);
        }

        grouped
            .into_iter()
            .map(|(theme, members)| {
                let scores: Vec<f64> = members.iter().map(|t| t.score).collect();
                (
                    theme.to_string(),
                    members.iter().map(|t| t.topic.clone()).collect(),
                    stats::mean(&scores),
                )
            })
            .collect()
    }

    /// Topics whose mentions are uniformly negative with a strong-negative
    /// share of 60% or more: (topic, impact = |avg sentiment|)
    pub fn negative_patterns(records: &[MemoryRecord]) -> Vec<(String, f64)> {
        let mut per_topic: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in records {
            if let Some(sentiment) = record.sentiment {
                for topic in &record.topics {
                    per_topic.entry(topic.as_str()).or_default().push(sentiment);
                }
            }
        }

        let mut patterns = Vec::new();
        for (topic, sentiments) in per_topic {
            if sentiments.is_empty() {
                continue;
            }
            let avg = stats::mean(&sentiments);
            let strong = sentiments.iter().filter(|&&s| s <= STRONG_NEGATIVE).count();
            let share = strong as f64 / sentiments.len() as f64;
            if avg < 0.0 && share >= PATTERN_SHARE {
                patterns.push((topic.to_string(), avg.abs().clamp(0.0, 1.0)));
            }
        }

        patterns.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        patterns
    }
}

impl Default for ShadowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for ShadowEngine {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ShadowEngine
    }

    fn min_records(&self) -> usize {
        5
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let suppressed = Self::suppressed_topics(records);
        let archetypes = Self::archetypes(&suppressed);
        let patterns = Self::negative_patterns(records);

        let mut payload = AnalyticsPayload::with_summary(if suppressed.is_empty() {
            "Nothing looks suppressed; your difficult topics get written about.".to_string()
        } else {
            format!(
                "{} topic{} may be getting less attention than {} deserve{}.",
                suppressed.len(),
                if suppressed.len() == 1 { "" } else { "s" },
                if suppressed.len() == 1 { "it" } else { "they" },
                if suppressed.len() == 1 { "s" } else { "" },
            )
        });

        payload.set_metric("record_count", records.len());
        payload.set_metric("suppressed_count", suppressed.len());
        payload.set_metric("archetype_count", archetypes.len());
        payload.set_metric("pattern_count", patterns.len());

        if !suppressed.is_empty() {
            let points: Vec<serde_json::Value> = suppressed
                .iter()
                .map(|t| {
                    json!({
                        "topic": t.topic,
                        "score": t.score,
                        "avg_sentiment": t.avg_sentiment,
                        "occurrences": t.occurrences,
                    })
                })
                .collect();
            payload.charts.push(
                ChartSeries::new(ChartKind::Bar, "Suppression scores")
                    .axes("topic", "score")
                    .points(points),
            );
        }

        for (theme, members, confidence) in &archetypes {
            payload.insights.push(Insight::new(
                format!(
                    "A theme of {} runs quietly underneath: {}.",
                    theme,
                    members.join(", ")
                ),
                "shadow",
                *confidence,
            ));
        }

        for (topic, impact) in &patterns {
            payload.insights.push(Insight::new(
                format!("Negative topic: \"{}\" is consistently painful to write about.", topic),
                "pattern",
                *impact,
            ));
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_topic(topic: &str, sentiment: Option<f64>) -> MemoryRecord {
        let mut record = MemoryRecord::new(format!("about {}", topic)).topic(topic);
        if let Some(s) = sentiment {
            record = record.sentiment(s);
        }
        record
    }

    #[test]
    fn test_suppression_score_bounds() {
        for (occ, total, avg) in [(1, 10, -1.0), (10, 10, 1.0), (5, 10, -0.5), (0, 10, 0.0)] {
            let score = ShadowEngine::suppression_score(occ, total, avg);
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
        // Maximally rare and maximally negative.
        assert!((ShadowEngine::suppression_score(0, 10, -1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_positive_topic_never_qualifies() {
        // A topic with 100% positive sentiment is never suppressed, however
        // rare it is.
        let mut records = vec![with_topic("wins", Some(0.9))];
        for i in 0..9 {
            records.push(MemoryRecord::new(format!("filler {}", i)));
        }

        let suppressed = ShadowEngine::suppressed_topics(&records);
        assert!(suppressed.iter().all(|t| t.topic != "wins"));
    }

    #[test]
    fn test_rare_negative_topic_qualifies() {
        let mut records = vec![with_topic("argument", Some(-0.7))];
        for i in 0..9 {
            records.push(MemoryRecord::new(format!("filler {}", i)).sentiment(0.3));
        }

        let suppressed = ShadowEngine::suppressed_topics(&records);
        assert_eq!(suppressed.len(), 1);
        let topic = &suppressed[0];
        assert_eq!(topic.topic, "argument");
        // rarity 0.9, negativity 0.7: 0.6*0.9 + 0.4*0.7
        assert!((topic.score - 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_archetype_mapping() {
        let suppressed = vec![
            SuppressedTopic {
                topic: "argument with boss".to_string(),
                occurrences: 1,
                avg_sentiment: -0.6,
                score: 0.8,
            },
            SuppressedTopic {
                topic: "health anxiety".to_string(),
                occurrences: 2,
                avg_sentiment: -0.5,
                score: 0.6,
            },
            SuppressedTopic {
                topic: "old house".to_string(),
                occurrences: 1,
                avg_sentiment: -0.4,
                score: 0.5,
            },
        ];

        let archetypes = ShadowEngine::archetypes(&suppressed);
        let themes: Vec<&str> = archetypes.iter().map(|(t, _, _)| t.as_str()).collect();
        assert!(themes.contains(&"anger"));
        assert!(themes.contains(&"fear"));
        assert!(themes.contains(&"unexplored"));

        let anger = archetypes.iter().find(|(t, _, _)| t == "anger").unwrap();
        assert!((anger.2 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_negative_pattern_detected() {
        // One topic in every record, uniformly negative, 60%+ strongly so:
        // reported as a negative pattern with impact |avg|.
        let sentiments = [-0.8, -0.7, -0.6, -0.3, -0.2];
        let records: Vec<MemoryRecord> = sentiments
            .iter()
            .map(|&s| with_topic("commute", Some(s)))
            .collect();

        let patterns = ShadowEngine::negative_patterns(&records);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].0, "commute");
        let avg: f64 = sentiments.iter().sum::<f64>() / sentiments.len() as f64;
        assert!((patterns[0].1 - avg.abs()).abs() < 1e-9);
    }

    #[test]
    fn test_weakly_negative_topic_is_not_a_pattern() {
        // Negative on average but only 1 in 4 strongly negative.
        let sentiments = [-0.6, -0.1, -0.1, -0.2];
        let records: Vec<MemoryRecord> = sentiments
            .iter()
            .map(|&s| with_topic("chores", Some(s)))
            .collect();

        assert!(ShadowEngine::negative_patterns(&records).is_empty());
    }

    #[test]
    fn test_compute_pattern_insight_text() {
        let records: Vec<MemoryRecord> = (0..6)
            .map(|_| with_topic("layoffs", Some(-0.8)))
            .collect();

        let engine = ShadowEngine::new();
        let payload = engine.compute(&records);
        let pattern = payload
            .insights
            .iter()
            .find(|i| i.category == "pattern")
            .expect("pattern insight present");
        assert!(pattern.text.contains("Negative topic"));
        assert!((pattern.score - 0.8).abs() < 1e-9);
    }
}
