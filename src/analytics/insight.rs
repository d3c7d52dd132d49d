//! Insight Engine
//!
//! Mines correlations, cycles, and trends out of the working set:
//! sentiment correlated against topic and person presence, weekly
//! behavioral loops via autocorrelation, a linear sentiment trend,
//! writing frequency, topic co-occurrence, and weekday rhythms.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{chronological, MemoryRecord};
use crate::stats;
use chrono::Datelike;
use serde_json::json;
use std::collections::BTreeMap;

const TOP_SUBJECTS: usize = 10;
const CORRELATION_THRESHOLD: f64 = 0.3;
const SENTIMENT_LOOP_THRESHOLD: f64 = 0.5;
const TOPIC_LOOP_THRESHOLD: f64 = 0.4;
const MAX_LOOP_LAG: usize = 30;
const COOCCURRENCE_MIN_COUNT: usize = 2;
const COOCCURRENCE_MIN_SUPPORT: f64 = 0.2;

/// A sentiment correlation against a subject's presence
#[derive(Debug, Clone)]
pub struct SubjectCorrelation {
    pub subject: String,
    /// "topic" or "person"
    pub subject_kind: &'static str,
    pub coefficient: f64,
}

/// Insight Engine module
pub struct InsightEngine;

impl InsightEngine {
    pub fn new() -> Self {
        Self
    }

    /// Daily binary topic-presence series across the same span
    fn daily_topic_presence(records: &[&MemoryRecord], topic: &str) -> Vec<f64> {
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Vec::new();
        };

        let start = first.created_at.date_naive();
        let end = last.created_at.date_naive();
        let span = (end - start).num_days().max(0) as usize + 1;

        let mut presence = vec![0.0f64; span];
        for record in records {
            if record.topics.contains(topic) {
                let day = (record.created_at.date_naive() - start).num_days() as usize;
                presence[day] = 1.0;
            }
        }
        presence
    }

    /// Top-frequency subjects: (name, record count), most frequent first
    fn top_subjects<'a, I>(iter: I) -> Vec<(String, usize)>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for subject in iter {
            *counts.entry(subject).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(TOP_SUBJECTS);
        ranked
    }

    /// Correlate record-level sentiment against binary subject presence,
    /// keeping |r| above 0.3
    pub fn subject_correlations(records: &[&MemoryRecord]) -> Vec<SubjectCorrelation> {
        let sentiments: Vec<f64> = records.iter().map(|r| r.sentiment_or_neutral()).collect();

        let topics = Self::top_subjects(
            records
                .iter()
                .flat_map(|r| r.topics.iter().map(|t| t.as_str())),
        );
        let people = Self::top_subjects(
            records
                .iter()
                .flat_map(|r| r.people.iter().map(|p| p.as_str())),
        );

        let mut correlations = Vec::new();
        for (subjects, subject_kind, contains) in [
            (&topics, "topic", true),
            (&people, "person", false),
        ] {
            for (name, _) in subjects {
                let presence: Vec<f64> = records
                    .iter()
                    .map(|r| {
                        let set = if contains { &r.topics } else { &r.people };
                        if set.contains(name) {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();

                let r = stats::pearson(&sentiments, &presence);
                if r.abs() > CORRELATION_THRESHOLD {
                    correlations.push(SubjectCorrelation {
                        subject: name.clone(),
                        subject_kind,
                        coefficient: r,
                    });
                }
            }
        }

        correlations.sort_by(|a, b| {
            b.coefficient
                .abs()
                .partial_cmp(&a.coefficient.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        correlations
    }

    /// Weekly lags worth probing for a series of `n` days: multiples of 7
    /// up to min(30, n/2)
    fn weekly_lags(n: usize) -> Vec<usize> {
        let cap = MAX_LOOP_LAG.min(n / 2);
        (1..)
            .map(|i| i * 7)
            .take_while(|&lag| lag <= cap)
            .collect()
    }

    /// Topic pairs co-occurring in at least two records with support ≥0.2
    /// of the rarer topic
    pub fn cooccurring_topics(records: &[&MemoryRecord]) -> Vec<(String, String, usize)> {
        let mut topic_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();

        for record in records {
            let topics: Vec<&str> = record.topics.iter().map(|t| t.as_str()).collect();
            for topic in &topics {
                *topic_counts.entry(topic).or_insert(0) += 1;
            }
            for (i, &a) in topics.iter().enumerate() {
                for &b in &topics[i + 1..] {
                    *pair_counts.entry((a, b)).or_insert(0) += 1;
                }
            }
        }

        let mut pairs = Vec::new();
        for ((a, b), count) in pair_counts {
            let rarer = topic_counts[a].min(topic_counts[b]);
            let support = count as f64 / rarer.max(1) as f64;
            if count >= COOCCURRENCE_MIN_COUNT && support >= COOCCURRENCE_MIN_SUPPORT {
                pairs.push((a.to_string(), b.to_string(), count));
            }
        }
        pairs.sort_by(|a, b| b.2.cmp(&a.2));
        pairs
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for InsightEngine {
    fn kind(&self) -> ModuleKind {
        ModuleKind::InsightEngine
    }

    fn min_records(&self) -> usize {
        10
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let ordered = chronological(records);
        let daily = super::daily_sentiment(&ordered);
        let trend = stats::linear_trend(&daily);

        let span_days = daily.len().max(1);
        let entries_per_week = records.len() as f64 / (span_days as f64 / 7.0);

        let correlations = Self::subject_correlations(&ordered);

        // Weekly behavioral loops over the daily sentiment series.
        let mut loops: Vec<(usize, f64)> = Vec::new();
        for lag in Self::weekly_lags(daily.len()) {
            let r = stats::autocorrelation(&daily, lag);
            if r.abs() > SENTIMENT_LOOP_THRESHOLD {
                loops.push((lag, r));
            }
        }

        // Topic loops: the same lags over binary presence series.
        let top_topics = Self::top_subjects(
            ordered
                .iter()
                .flat_map(|r| r.topics.iter().map(|t| t.as_str())),
        );
        let mut topic_loops: Vec<(String, usize, f64)> = Vec::new();
        for (topic, _) in &top_topics {
            let presence = Self::daily_topic_presence(&ordered, topic);
            for lag in Self::weekly_lags(presence.len()) {
                let r = stats::autocorrelation(&presence, lag);
                if r.abs() > TOPIC_LOOP_THRESHOLD {
                    topic_loops.push((topic.clone(), lag, r));
                }
            }
        }

        let cooccurrences = Self::cooccurring_topics(&ordered);

        // Weekday rhythm: one weekday holding a third of all entries.
        let mut weekday_counts = [0usize; 7];
        for record in &ordered {
            weekday_counts[record.created_at.weekday().num_days_from_monday() as usize] += 1;
        }
        let (dominant_weekday, dominant_count) = weekday_counts
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(weekday, &count)| (weekday, count))
            .unwrap_or((0, 0));
        let rhythm_bar = 2.max(ordered.len() / 3);

        let mut payload = AnalyticsPayload::with_summary(format!(
            "{} correlations and {} recurring cycles surfaced from {} memories.",
            correlations.len(),
            loops.len() + topic_loops.len(),
            records.len()
        ));

        payload.set_metric("record_count", records.len());
        payload.set_metric("span_days", span_days);
        payload.set_metric("entries_per_week", entries_per_week);
        payload.set_metric("sentiment_trend", trend);
        payload.set_metric("correlation_count", correlations.len());
        payload.set_metric("loop_count", loops.len() + topic_loops.len());

        let daily_points: Vec<serde_json::Value> = daily
            .iter()
            .enumerate()
            .map(|(day, &value)| json!({ "day": day, "sentiment": value }))
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Area, "Daily sentiment")
                .axes("day", "sentiment")
                .points(daily_points),
        );

        if !correlations.is_empty() {
            let bar_points: Vec<serde_json::Value> = correlations
                .iter()
                .map(|c| json!({ "subject": c.subject, "r": c.coefficient, "kind": c.subject_kind }))
                .collect();
            payload.charts.push(
                ChartSeries::new(ChartKind::Bar, "Sentiment correlations")
                    .axes("subject", "r")
                    .points(bar_points),
            );
        }

        for correlation in &correlations {
            let direction = if correlation.coefficient > 0.0 {
                "lifts"
            } else {
                "weighs on"
            };
            payload.insights.push(Insight::new(
                format!(
                    "Writing about {} {} your mood (r={:.2}).",
                    correlation.subject, direction, correlation.coefficient
                ),
                "correlation",
                correlation.coefficient.abs(),
            ));
        }

        for &(lag, r) in &loops {
            payload.insights.push(Insight::new(
                format!(
                    "Your mood repeats on a {}-day cycle (autocorrelation {:.2}).",
                    lag, r
                ),
                "loop",
                r.abs(),
            ));
        }
        for (topic, lag, r) in &topic_loops {
            payload.insights.push(Insight::new(
                format!("\"{}\" comes back roughly every {} days.", topic, lag),
                "loop",
                r.abs(),
            ));
        }

        if trend.abs() > 0.005 {
            let direction = if trend > 0.0 { "climbing" } else { "sliding" };
            payload.insights.push(Insight::new(
                format!("Overall sentiment has been {} across this period.", direction),
                "trend",
                (trend.abs() * 50.0).clamp(0.0, 1.0),
            ));
        }

        for (a, b, count) in cooccurrences.iter().take(3) {
            payload.insights.push(Insight::new(
                format!("\"{}\" and \"{}\" tend to appear together ({}×).", a, b, count),
                "cooccurrence",
                (*count as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        if dominant_count >= rhythm_bar {
            const WEEKDAYS: [&str; 7] = [
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
                "Sunday",
            ];
            payload.insights.push(Insight::new(
                format!(
                    "You journal most on {}s ({} of {} entries).",
                    WEEKDAYS[dominant_weekday],
                    dominant_count,
                    ordered.len()
                ),
                "rhythm",
                dominant_count as f64 / ordered.len() as f64,
            ));
        }

        payload
    }
}
