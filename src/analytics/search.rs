//! Search Engine
//!
//! Ranks memories against a free-text query by blending a keyword-overlap
//! score, a topic/text-overlap "semantic" score, and a recency score that
//! decays linearly across the user's full date range
//! (`0.6*semantic + 0.3*keyword + 0.1*recency`). Queries are never
//! memoized; this module bypasses the cache entirely.
//!
//! True embedding similarity search is an extension point here: when
//! query embeddings become available upstream, the semantic score can be
//! swapped for cosine similarity without touching the blend.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::memory::{MemoryRecord, Mood};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeSet;

const SEMANTIC_WEIGHT: f64 = 0.6;
const KEYWORD_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.1;
const DEFAULT_LIMIT: usize = 10;

/// Search input: free text plus optional structured filters
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    pub filters: SearchFilters,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilters::default(),
            limit: None,
        }
    }
}

/// Structured narrowing applied before scoring
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Keep records carrying any of these topics
    pub topics: Vec<String>,
    /// Keep records mentioning any of these people
    pub people: Vec<String>,
    /// Keep records with this mood
    pub mood: Option<Mood>,
    /// Keep records at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep records at or before this instant
    pub until: Option<DateTime<Utc>>,
}

impl SearchFilters {
    fn matches(&self, record: &MemoryRecord) -> bool {
        if !self.topics.is_empty()
            && !self.topics.iter().any(|t| record.topics.contains(&t.to_lowercase()))
        {
            return false;
        }
        if !self.people.is_empty()
            && !self.people.iter().any(|p| record.people.contains(&p.to_lowercase()))
        {
            return false;
        }
        if let Some(mood) = self.mood {
            if record.mood != Some(mood) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        true
    }
}

/// A scored search hit
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a MemoryRecord,
    pub score: f64,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub recency_score: f64,
}

/// Search Engine module (uncached)
pub struct SearchEngine;

impl SearchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Lower-cased alphanumeric tokens
    fn tokenize(text: &str) -> BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(|t| t.to_string())
            .collect()
    }

    /// Fraction of query tokens present in the text
    fn keyword_score(query_tokens: &BTreeSet<String>, text_tokens: &BTreeSet<String>) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let hits = query_tokens.intersection(text_tokens).count();
        hits as f64 / query_tokens.len() as f64
    }

    /// Topic/text-overlap stand-in for embedding similarity
    fn semantic_score(query_tokens: &BTreeSet<String>, record: &MemoryRecord) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let topic_hits = query_tokens
            .iter()
            .filter(|token| {
                record
                    .topics
                    .iter()
                    .any(|topic| topic.contains(token.as_str()) || token.contains(topic.as_str()))
            })
            .count();
        let topic_overlap = topic_hits as f64 / query_tokens.len() as f64;

        let text_tokens = Self::tokenize(&record.text);
        let union = query_tokens.union(&text_tokens).count();
        let jaccard = if union == 0 {
            0.0
        } else {
            query_tokens.intersection(&text_tokens).count() as f64 / union as f64
        };

        (0.6 * topic_overlap + 0.4 * jaccard).clamp(0.0, 1.0)
    }

    /// Rank a working set against a query
    pub fn rank<'a>(&self, records: &'a [MemoryRecord], query: &SearchQuery) -> Vec<SearchHit<'a>> {
        let query_tokens = Self::tokenize(&query.query);

        let candidates: Vec<&MemoryRecord> = records
            .iter()
            .filter(|r| query.filters.matches(r))
            .collect();

        let (Some(newest), Some(oldest)) = (
            candidates.iter().map(|r| r.created_at).max(),
            candidates.iter().map(|r| r.created_at).min(),
        ) else {
            return Vec::new();
        };
        let span_ms = (newest - oldest).num_milliseconds().max(1) as f64;

        let mut hits: Vec<SearchHit<'a>> = candidates
            .into_iter()
            .map(|record| {
                let text_tokens = Self::tokenize(&record.text);
                let keyword = Self::keyword_score(&query_tokens, &text_tokens);
                let semantic = Self::semantic_score(&query_tokens, record);
                let recency =
                    (record.created_at - oldest).num_milliseconds() as f64 / span_ms;

                SearchHit {
                    record,
                    score: SEMANTIC_WEIGHT * semantic
                        + KEYWORD_WEIGHT * keyword
                        + RECENCY_WEIGHT * recency,
                    keyword_score: keyword,
                    semantic_score: semantic,
                    recency_score: recency,
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.limit.unwrap_or(DEFAULT_LIMIT));
        hits
    }

    /// Run a query and wrap the hits in the universal payload shape
    pub fn query(&self, records: &[MemoryRecord], query: &SearchQuery) -> AnalyticsPayload {
        let hits = self.rank(records, query);

        let mut payload = AnalyticsPayload::with_summary(if hits.is_empty() {
            format!("No memories matched \"{}\".", query.query)
        } else {
            format!("{} memories matched \"{}\".", hits.len(), query.query)
        });

        payload.set_metric("query", query.query.clone());
        payload.set_metric("result_count", hits.len());

        let points: Vec<serde_json::Value> = hits
            .iter()
            .map(|hit| {
                json!({
                    "id": hit.record.id,
                    "text": hit.record.text,
                    "date": hit.record.created_at.to_rfc3339(),
                    "score": hit.score,
                    "keyword": hit.keyword_score,
                    "semantic": hit.semantic_score,
                    "recency": hit.recency_score,
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Bar, "Search results")
                .axes("id", "score")
                .points(points),
        );

        if let Some(best) = hits.first() {
            payload.insights.push(Insight::new(
                format!(
                    "Closest match from {}: \"{}\"",
                    best.record.created_at.format("%Y-%m-%d"),
                    best.record.text
                ),
                "search",
                best.score.clamp(0.0, 1.0),
            ));
        }

        payload
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
