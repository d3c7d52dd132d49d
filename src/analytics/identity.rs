//! Identity Pulse
//!
//! Tracks who the user says they are and how that self-image moves:
//! a smoothed sentiment trajectory, self-referential statement extraction,
//! an identity drift score between the last 30 days and everything before,
//! emotional trigger detection, and rolling mood volatility.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{chronological, MemoryRecord};
use crate::stats;
use chrono::{Duration, Utc};
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;

const EMA_ALPHA: f64 = 0.3;
const TRIGGER_JUMP: f64 = 0.5;
const DRIFT_WINDOW_DAYS: i64 = 30;
const DRIFT_MIN_RECORDS: usize = 10;
const STATEMENT_MIN_LEN: usize = 5;
const STATEMENT_MAX_LEN: usize = 200;

/// Identity Pulse module
pub struct IdentityPulse {
    patterns: Vec<Regex>,
}

impl IdentityPulse {
    pub fn new() -> Self {
        // First-person declarative openings; each match runs to the end of
        // the sentence.
        let sources = [
            r"(?i)\bI am [^.!?\n]+",
            r"(?i)\bI'm [^.!?\n]+",
            r"(?i)\bI identify as [^.!?\n]+",
            r"(?i)\bI consider myself [^.!?\n]+",
            r"(?i)\bI've become [^.!?\n]+",
            r"(?i)\bI feel like I(?:'m)? [^.!?\n]+",
            r"(?i)\bI see myself as [^.!?\n]+",
        ];
        let patterns = sources.iter().filter_map(|s| Regex::new(s).ok()).collect();
        Self { patterns }
    }

    /// Extract self-referential statements from one record's text,
    /// keeping matches of 5-200 characters, lower-cased
    fn extract_statements(&self, text: &str) -> Vec<String> {
        let mut statements = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.find_iter(text) {
                let statement = m.as_str().trim().to_lowercase();
                if (STATEMENT_MIN_LEN..=STATEMENT_MAX_LEN).contains(&statement.len()) {
                    statements.push(statement);
                }
            }
        }
        statements
    }

    /// Identity drift between the last 30 days and everything earlier
    ///
    /// `1 - overlap/total_unique` over lower-cased statement sets; 0 means
    /// stable, 1 total drift. Requires at least ten records and at least
    /// one statement in each period, otherwise 0.
    fn drift_score(&self, records: &[&MemoryRecord]) -> f64 {
        if records.len() < DRIFT_MIN_RECORDS {
            return 0.0;
        }

        let cutoff = Utc::now() - Duration::days(DRIFT_WINDOW_DAYS);
        let mut recent: BTreeSet<String> = BTreeSet::new();
        let mut earlier: BTreeSet<String> = BTreeSet::new();

        for record in records {
            let bucket = if record.created_at >= cutoff {
                &mut recent
            } else {
                &mut earlier
            };
            bucket.extend(self.extract_statements(&record.text));
        }

        if recent.is_empty() || earlier.is_empty() {
            return 0.0;
        }

        let overlap = recent.intersection(&earlier).count() as f64;
        let total_unique = recent.union(&earlier).count() as f64;
        (1.0 - overlap / total_unique).clamp(0.0, 1.0)
    }
}

impl Default for IdentityPulse {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of rolling-window standard deviations over the mood scale;
/// window is min(14, n/2)
fn mood_volatility(mood_series: &[f64]) -> f64 {
    let window = (mood_series.len() / 2).min(14);
    let windows = stats::rolling_std(mood_series, window);
    stats::mean(&windows)
}

fn drift_label(drift: f64) -> &'static str {
    if drift > 0.7 {
        "significant"
    } else if drift > 0.4 {
        "moderate"
    } else {
        "stable"
    }
}

fn volatility_label(volatility: f64) -> &'static str {
    if volatility > 0.7 {
        "high"
    } else if volatility > 0.4 {
        "moderate"
    } else {
        "stable"
    }
}

impl AnalyticsModule for IdentityPulse {
    fn kind(&self) -> ModuleKind {
        ModuleKind::IdentityPulse
    }

    fn min_records(&self) -> usize {
        5
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let ordered = chronological(records);

        let sentiments: Vec<f64> = ordered.iter().map(|r| r.sentiment_or_neutral()).collect();
        let has_sentiment = ordered.iter().filter(|r| r.has_sentiment()).count();
        let smoothed = stats::ema(&sentiments, EMA_ALPHA);

        let trajectory_points: Vec<serde_json::Value> = ordered
            .iter()
            .zip(smoothed.iter())
            .map(|(record, &value)| {
                json!({
                    "date": record.created_at.to_rfc3339(),
                    "sentiment": record.sentiment_or_neutral(),
                    "smoothed": value,
                })
            })
            .collect();

        // Emotional triggers: adjacent-record sentiment jumps above 0.5.
        let mut triggers = Vec::new();
        for pair in ordered.windows(2) {
            let shift = (pair[1].sentiment_or_neutral() - pair[0].sentiment_or_neutral()).abs();
            if shift > TRIGGER_JUMP {
                triggers.push((pair[1].created_at, shift));
            }
        }

        let statement_count: usize = ordered
            .iter()
            .map(|r| self.extract_statements(&r.text).len())
            .sum();
        let drift = self.drift_score(&ordered);

        let mood_series: Vec<f64> = ordered.iter().map(|r| r.mood_value()).collect();
        let volatility = mood_volatility(&mood_series);

        let mut payload = AnalyticsPayload::with_summary(format!(
            "Your sense of self looks {} and your mood has been {} across {} memories.",
            drift_label(drift),
            volatility_label(volatility),
            records.len()
        ));

        payload.set_metric("record_count", records.len());
        payload.set_metric("sentiment_count", has_sentiment);
        payload.set_metric("statement_count", statement_count);
        payload.set_metric("drift_score", drift);
        payload.set_metric("drift_label", drift_label(drift));
        payload.set_metric("mood_volatility", volatility);
        payload.set_metric("volatility_label", volatility_label(volatility));
        payload.set_metric("trigger_count", triggers.len());

        payload.charts.push(
            ChartSeries::new(ChartKind::Line, "Sentiment trajectory")
                .axes("date", "smoothed")
                .points(trajectory_points)
                .series_names(vec!["sentiment".to_string(), "smoothed".to_string()]),
        );

        match drift_label(drift) {
            "significant" => payload.insights.push(Insight::new(
                "Your self-descriptions have shifted significantly in the last month.",
                "identity",
                drift,
            )),
            "moderate" => payload.insights.push(Insight::new(
                "Your self-descriptions are evolving at a moderate pace.",
                "identity",
                drift,
            )),
            _ => payload.insights.push(Insight::new(
                "Your sense of identity has stayed stable.",
                "identity",
                1.0 - drift,
            )),
        }

        match volatility_label(volatility) {
            "high" => payload.insights.push(Insight::new(
                "Your mood has been swinging widely between entries.",
                "volatility",
                volatility,
            )),
            "moderate" => payload.insights.push(Insight::new(
                "Your mood shows moderate ups and downs.",
                "volatility",
                volatility,
            )),
            _ => payload.insights.push(Insight::new(
                "Your mood has held steady.",
                "volatility",
                1.0 - volatility,
            )),
        }

        if !triggers.is_empty() {
            let (last_at, last_shift) = triggers[triggers.len() - 1];
            payload.insights.push(Insight::new(
                format!(
                    "{} sharp emotional shifts detected; the latest on {} (jump of {:.1}).",
                    triggers.len(),
                    last_at.format("%Y-%m-%d"),
                    last_shift
                ),
                "trigger",
                (triggers.len() as f64 / records.len() as f64).clamp(0.0, 1.0),
            ));
        }

        payload
    }
}
