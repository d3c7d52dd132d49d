//! Analytics payload types
//!
//! The universal output contract: every module returns an
//! `AnalyticsPayload`, so downstream consumers never deal with
//! module-specific shapes. Payloads are UI-bound JSON; chart points are
//! free-form objects addressed by `x_key`/`y_key`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metric value: a number or a short text label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl MetricValue {
    /// Numeric value, if this metric is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }
}

/// Chart rendering hint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Area,
}

/// A single chart series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub title: String,
    /// Free-form point objects; `x_key`/`y_key` name the axes
    pub points: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_names: Option<Vec<String>>,
}

impl ChartSeries {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            points: Vec::new(),
            x_key: None,
            y_key: None,
            series_names: None,
        }
    }

    /// Builder: name the x/y axes
    pub fn axes(mut self, x_key: impl Into<String>, y_key: impl Into<String>) -> Self {
        self.x_key = Some(x_key.into());
        self.y_key = Some(y_key.into());
        self
    }

    /// Builder: set the point objects
    pub fn points(mut self, points: Vec<serde_json::Value>) -> Self {
        self.points = points;
        self
    }

    /// Builder: set named sub-series
    pub fn series_names(mut self, names: Vec<String>) -> Self {
        self.series_names = Some(names);
        self
    }
}

/// A group of related memories
///
/// Membership is exclusive within one module's output; different modules
/// may place the same memory in different clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub size: usize,
    /// Member memory ids
    pub members: Vec<String>,
    pub summary: String,
}

/// A surfaced insight with a relevance weight
///
/// `score` is a relevance/confidence weight in [0, 1] used for ranking,
/// not a statistical probability. Clamped at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
    pub category: String,
    pub score: f64,
}

impl Insight {
    pub fn new(text: impl Into<String>, category: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// A node in a payload graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Node role, e.g. "identity", "person", "arc", "memory"
    pub kind: String,
    #[serde(default)]
    pub weight: f64,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: kind.into(),
            weight: 0.0,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A weighted edge in a payload graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Node/edge graph attached to a payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Degree of a node (number of incident edges)
    pub fn degree(&self, node_id: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == node_id || e.target == node_id)
            .count()
    }
}

/// The universal analytics output
///
/// Every module returns this shape, even on insufficient data (the
/// [`AnalyticsPayload::empty`] sentinel), never a null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsPayload {
    /// Headline numbers and labels
    pub metrics: BTreeMap<String, MetricValue>,
    /// Chart series for rendering
    pub charts: Vec<ChartSeries>,
    /// Cluster output, when the module clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<Vec<Cluster>>,
    /// Graph output, when the module builds one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphData>,
    /// Ranked insights
    pub insights: Vec<Insight>,
    /// One-paragraph narrative summary
    pub summary: String,
    /// When this payload was computed
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsPayload {
    /// Start an empty payload with the given summary
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            metrics: BTreeMap::new(),
            charts: Vec::new(),
            clusters: None,
            graph: None,
            insights: Vec::new(),
            summary: summary.into(),
            generated_at: Utc::now(),
        }
    }

    /// The canonical insufficient-data sentinel
    ///
    /// Returned whenever a module's working set is below its documented
    /// minimum. Valid schema, explanatory summary: undersized input is a
    /// degenerate case, not an error.
    pub fn empty(module_name: &str, record_count: usize, minimum: usize) -> Self {
        let mut payload = Self::with_summary(format!(
            "Not enough memories for {} yet: {} logged, {} needed. Keep journaling.",
            module_name, record_count, minimum
        ));
        payload.set_metric("record_count", record_count);
        payload.set_metric("required_records", minimum);
        payload.set_metric("status", "insufficient_data");
        payload
    }

    /// Set a metric value
    pub fn set_metric(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.metrics.insert(key.into(), value.into());
    }

    /// Numeric metric lookup
    pub fn metric_number(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(MetricValue::as_number)
    }

    /// Whether this payload is the insufficient-data sentinel
    pub fn is_empty_sentinel(&self) -> bool {
        matches!(
            self.metrics.get("status"),
            Some(MetricValue::Text(s)) if s == "insufficient_data"
        )
    }

    /// Insights sorted by score, best first
    pub fn top_insights(&self, n: usize) -> Vec<&Insight> {
        let mut ranked: Vec<&Insight> = self.insights.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }
}
