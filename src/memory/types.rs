//! Core data types for memory records
//!
//! This module defines the record shape every analytics module consumes:
//! - `MemoryRecord`: a single journaled life event
//! - `Mood`: the closed set of self-reported moods and their numeric scale
//!
//! Records are immutable once fetched by the engine; the persistence layer
//! owns their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single journaled memory
///
/// Sentiment lives in [-1, 1]; absence is treated as neutral (0) for
/// numeric purposes but tracked separately for has-sentiment counts.
/// Topics and people are lower-cased sets. The embedding, when present,
/// is precomputed upstream; the engine never generates one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Unique identifier
    pub id: String,
    /// Free-form journal text
    pub text: String,
    /// When the memory was logged
    pub created_at: DateTime<Utc>,
    /// Sentiment in [-1, 1], if scored
    #[serde(default)]
    pub sentiment: Option<f64>,
    /// Self-reported mood, if given
    #[serde(default)]
    pub mood: Option<Mood>,
    /// Topic tags
    #[serde(default)]
    pub topics: BTreeSet<String>,
    /// Named people mentioned
    #[serde(default)]
    pub people: BTreeSet<String>,
    /// Precomputed embedding vector
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryRecord {
    /// Create a new record with the given text, timestamped now
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            created_at: Utc::now(),
            sentiment: None,
            mood: None,
            topics: BTreeSet::new(),
            people: BTreeSet::new(),
            embedding: None,
        }
    }

    /// Builder: set the creation timestamp
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Builder: set sentiment (clamped to [-1, 1])
    pub fn sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment = Some(sentiment.clamp(-1.0, 1.0));
        self
    }

    /// Builder: set mood
    pub fn mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    /// Builder: add a topic tag (lower-cased)
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.insert(topic.into().to_lowercase());
        self
    }

    /// Builder: add a mentioned person (lower-cased)
    pub fn person(mut self, person: impl Into<String>) -> Self {
        self.people.insert(person.into().to_lowercase());
        self
    }

    /// Builder: attach an embedding vector
    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Sentiment with absence treated as neutral
    pub fn sentiment_or_neutral(&self) -> f64 {
        self.sentiment.unwrap_or(0.0)
    }

    /// Whether this record carries an explicit sentiment score
    pub fn has_sentiment(&self) -> bool {
        self.sentiment.is_some()
    }

    /// Numeric mood value, falling back to sentiment when no mood is set
    pub fn mood_value(&self) -> f64 {
        self.mood
            .map(|m| m.score())
            .unwrap_or_else(|| self.sentiment_or_neutral())
    }
}

/// Self-reported mood
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Joyful,
    Happy,
    Calm,
    Neutral,
    Anxious,
    Sad,
    Angry,
}

impl Mood {
    /// Numeric scale in [-1, 1], symmetric around neutral
    pub fn score(&self) -> f64 {
        match self {
            Mood::Joyful => 1.0,
            Mood::Happy => 0.6,
            Mood::Calm => 0.3,
            Mood::Neutral => 0.0,
            Mood::Anxious => -0.4,
            Mood::Sad => -0.6,
            Mood::Angry => -0.8,
        }
    }

    /// Parse a mood name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "joyful" => Some(Mood::Joyful),
            "happy" => Some(Mood::Happy),
            "calm" => Some(Mood::Calm),
            "neutral" => Some(Mood::Neutral),
            "anxious" => Some(Mood::Anxious),
            "sad" => Some(Mood::Sad),
            "angry" => Some(Mood::Angry),
            _ => None,
        }
    }

    /// All moods, for iteration
    pub fn all() -> &'static [Mood] {
        &[
            Mood::Joyful,
            Mood::Happy,
            Mood::Calm,
            Mood::Neutral,
            Mood::Anxious,
            Mood::Sad,
            Mood::Angry,
        ]
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mood::Joyful => "joyful",
            Mood::Happy => "happy",
            Mood::Calm => "calm",
            Mood::Neutral => "neutral",
            Mood::Anxious => "anxious",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = MemoryRecord::new("Dinner with Sam")
            .sentiment(0.7)
            .mood(Mood::Happy)
            .topic("Friends")
            .person("Sam");

        assert_eq!(record.sentiment, Some(0.7));
        assert_eq!(record.mood, Some(Mood::Happy));
        assert!(record.topics.contains("friends"));
        assert!(record.people.contains("sam"));
    }

    #[test]
    fn test_sentiment_clamped() {
        let record = MemoryRecord::new("test").sentiment(3.0);
        assert_eq!(record.sentiment, Some(1.0));

        let record = MemoryRecord::new("test").sentiment(-3.0);
        assert_eq!(record.sentiment, Some(-1.0));
    }

    #[test]
    fn test_sentiment_or_neutral() {
        let record = MemoryRecord::new("test");
        assert_eq!(record.sentiment_or_neutral(), 0.0);
        assert!(!record.has_sentiment());
    }

    #[test]
    fn test_mood_value_falls_back_to_sentiment() {
        let record = MemoryRecord::new("test").sentiment(-0.5);
        assert_eq!(record.mood_value(), -0.5);

        let record = MemoryRecord::new("test").sentiment(-0.5).mood(Mood::Joyful);
        assert_eq!(record.mood_value(), 1.0);
    }

    #[test]
    fn test_mood_parse_roundtrip() {
        for mood in Mood::all() {
            assert_eq!(Mood::parse(&mood.to_string()), Some(*mood));
        }
        assert_eq!(Mood::parse("grumpy"), None);
    }

    #[test]
    fn test_record_serialization() {
        let record = MemoryRecord::new("A quiet morning")
            .sentiment(0.2)
            .topic("routine");
        let json = serde_json::to_string(&record).unwrap();
        let restored: MemoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        // Only the required fields present; everything else defaults.
        let json = r#"{"id":"m1","text":"hello","created_at":"2026-01-10T08:00:00Z"}"#;
        let record: MemoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sentiment, None);
        assert!(record.topics.is_empty());
        assert!(record.embedding.is_none());
    }
}
