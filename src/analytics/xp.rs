//! XP / Gamification Engine
//!
//! Converts journaling into progress: per-memory experience points scaled
//! by sentiment and enriched by topics and people, a daily streak bonus,
//! and logarithmic levels.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{chronological, MemoryRecord};
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::BTreeSet;

const BASE_XP: f64 = 10.0;
const TOPIC_XP: u64 = 2;
const PERSON_XP: u64 = 1;
const STREAK_XP: u64 = 5;
const LEVEL_BASE: u64 = 100;

/// XP / Gamification module
pub struct XpEngine;

impl XpEngine {
    pub fn new() -> Self {
        Self
    }

    /// XP for one memory: base 10 scaled by sentiment (×0.5 below zero,
    /// ×1.5 above 0.5), plus 2 per topic and 1 per person
    pub fn memory_xp(record: &MemoryRecord) -> u64 {
        let multiplier = match record.sentiment {
            Some(s) if s < 0.0 => 0.5,
            Some(s) if s > 0.5 => 1.5,
            _ => 1.0,
        };
        let base = (BASE_XP * multiplier).round() as u64;
        base + TOPIC_XP * record.topics.len() as u64 + PERSON_XP * record.people.len() as u64
    }

    /// Consecutive calendar days with at least one entry, walking backward
    /// from today
    pub fn streak_days(records: &[MemoryRecord]) -> u64 {
        let days: BTreeSet<chrono::NaiveDate> =
            records.iter().map(|r| r.created_at.date_naive()).collect();

        let mut streak = 0;
        let mut day = Utc::now().date_naive();
        while days.contains(&day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    /// Level for a total: `floor(log2(xp / 100)) + 1` from 100 XP up,
    /// otherwise 1
    pub fn level(total_xp: u64) -> u32 {
        if total_xp < LEVEL_BASE {
            return 1;
        }
        (total_xp / LEVEL_BASE).ilog2() + 1
    }

    /// Total XP needed to reach the next level
    pub fn next_level_at(level: u32) -> u64 {
        LEVEL_BASE * 2u64.pow(level)
    }
}

impl Default for XpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for XpEngine {
    fn kind(&self) -> ModuleKind {
        ModuleKind::XpEngine
    }

    fn min_records(&self) -> usize {
        1
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let ordered = chronological(records);

        let streak = Self::streak_days(records);
        let memory_total: u64 = ordered.iter().map(|r| Self::memory_xp(r)).sum();
        let total_xp = memory_total + streak * STREAK_XP;
        let level = Self::level(total_xp);
        let next_at = Self::next_level_at(level);

        let mut payload = AnalyticsPayload::with_summary(format!(
            "Level {} with {} XP across {} memories{}.",
            level,
            total_xp,
            records.len(),
            if streak > 1 {
                format!(" and a {}-day streak", streak)
            } else {
                String::new()
            }
        ));

        payload.set_metric("total_xp", total_xp as f64);
        payload.set_metric("level", level as f64);
        payload.set_metric("streak_days", streak as f64);
        payload.set_metric("memory_count", records.len());
        payload.set_metric("next_level_at", next_at as f64);

        let mut cumulative = 0u64;
        let points: Vec<serde_json::Value> = ordered
            .iter()
            .map(|record| {
                cumulative += Self::memory_xp(record);
                json!({
                    "date": record.created_at.to_rfc3339(),
                    "xp": cumulative,
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Area, "Cumulative XP")
                .axes("date", "xp")
                .points(points),
        );

        payload.insights.push(Insight::new(
            format!("{} XP to go until level {}.", next_at.saturating_sub(total_xp), level + 1),
            "progress",
            (total_xp as f64 / next_at as f64).clamp(0.0, 1.0),
        ));

        if streak >= 3 {
            payload.insights.push(Insight::new(
                format!("You've journaled {} days in a row. Keep the chain alive.", streak),
                "streak",
                (streak as f64 / 30.0).clamp(0.0, 1.0),
            ));
        }

        payload
    }
}
