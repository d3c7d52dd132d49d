//! Prediction Engine
//!
//! Forecasts sentiment seven days forward from the EMA-smoothed daily
//! series: the linear-trend slope drives the projection with a 0.5 decay
//! per future day, confidence decays linearly from 1.0 to 0.3 across the
//! horizon, and forecast points are screened into risk zones.

use crate::analytics::payload::{AnalyticsPayload, ChartKind, ChartSeries, Insight};
use crate::analytics::{AnalyticsModule, ModuleKind};
use crate::memory::{chronological, MemoryRecord};
use crate::stats;
use serde_json::json;

const EMA_ALPHA: f64 = 0.3;
const HORIZON_DAYS: usize = 7;
const SLOPE_DECAY: f64 = 0.5;
const MIN_CONFIDENCE: f64 = 0.3;
const NEGATIVE_ZONE: f64 = -0.5;
const POSITIVE_ZONE: f64 = 0.3;
const VOLATILITY_BAR: f64 = 0.7;
const SHAKY_CONFIDENCE: f64 = 0.6;

/// One projected day
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    /// Days ahead of the last observed day, 1-based
    pub day: usize,
    pub value: f64,
    pub confidence: f64,
}

/// A flagged stretch of the forecast
#[derive(Debug, Clone)]
pub struct RiskZone {
    pub day: usize,
    /// "negative", "volatility", or "positive_momentum"
    pub kind: &'static str,
    pub value: f64,
}

/// Prediction Engine module
pub struct PredictionEngine;

impl PredictionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Project the smoothed series forward
    ///
    /// Each future day adds the slope damped by `0.5^day`, so the forecast
    /// flattens toward the horizon; values stay clamped to the sentiment
    /// band. Confidence runs 1.0 down to 0.3 linearly.
    pub fn forecast(smoothed: &[f64]) -> Vec<ForecastPoint> {
        let Some(&last) = smoothed.last() else {
            return Vec::new();
        };
        let slope = stats::linear_trend(smoothed);

        let mut points = Vec::with_capacity(HORIZON_DAYS);
        let mut value = last;
        for day in 1..=HORIZON_DAYS {
            value = (value + slope * SLOPE_DECAY.powi(day as i32)).clamp(-1.0, 1.0);
            let confidence =
                1.0 - (1.0 - MIN_CONFIDENCE) * (day as f64 / HORIZON_DAYS as f64);
            points.push(ForecastPoint {
                day,
                value,
                confidence,
            });
        }
        points
    }

    /// Screen forecast points into risk zones
    pub fn risk_zones(points: &[ForecastPoint], volatility: f64) -> Vec<RiskZone> {
        let mut zones = Vec::new();
        for point in points {
            if point.value < NEGATIVE_ZONE {
                zones.push(RiskZone {
                    day: point.day,
                    kind: "negative",
                    value: point.value,
                });
            } else if volatility > VOLATILITY_BAR && point.confidence < SHAKY_CONFIDENCE {
                zones.push(RiskZone {
                    day: point.day,
                    kind: "volatility",
                    value: point.value,
                });
            }
            if point.value > POSITIVE_ZONE {
                zones.push(RiskZone {
                    day: point.day,
                    kind: "positive_momentum",
                    value: point.value,
                });
            }
        }
        zones
    }
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsModule for PredictionEngine {
    fn kind(&self) -> ModuleKind {
        ModuleKind::PredictionEngine
    }

    fn min_records(&self) -> usize {
        14
    }

    fn compute(&self, records: &[MemoryRecord]) -> AnalyticsPayload {
        let ordered = chronological(records);
        let daily = super::daily_sentiment(&ordered);
        let smoothed = stats::ema(&daily, EMA_ALPHA);
        let slope = stats::linear_trend(&smoothed);
        let volatility = stats::std_dev(&daily);

        let forecast = Self::forecast(&smoothed);
        let zones = Self::risk_zones(&forecast, volatility);

        let outlook = match forecast.last() {
            Some(end) if end.value > POSITIVE_ZONE => "bright",
            Some(end) if end.value < NEGATIVE_ZONE => "heavy",
            _ => "steady",
        };

        let mut payload = AnalyticsPayload::with_summary(format!(
            "The week ahead looks {} based on {} days of history.",
            outlook,
            daily.len()
        ));

        payload.set_metric("record_count", records.len());
        payload.set_metric("history_days", daily.len());
        payload.set_metric("trend_slope", slope);
        payload.set_metric("volatility", volatility);
        if let Some(end) = forecast.last() {
            payload.set_metric("forecast_end", end.value);
            payload.set_metric("forecast_end_confidence", end.confidence);
        }
        payload.set_metric("risk_zone_count", zones.len());
        payload.set_metric("outlook", outlook);

        let points: Vec<serde_json::Value> = forecast
            .iter()
            .map(|p| {
                json!({
                    "day": p.day,
                    "value": p.value,
                    "confidence": p.confidence,
                })
            })
            .collect();
        payload.charts.push(
            ChartSeries::new(ChartKind::Line, "Seven-day sentiment forecast")
                .axes("day", "value")
                .points(points)
                .series_names(vec!["value".to_string(), "confidence".to_string()]),
        );

        let negatives = zones.iter().filter(|z| z.kind == "negative").count();
        if negatives > 0 {
            payload.insights.push(Insight::new(
                format!(
                    "{} forecast day{} dip into firmly negative territory; plan something restorative.",
                    negatives,
                    if negatives == 1 { "" } else { "s" }
                ),
                "risk",
                0.8,
            ));
        }

        let shaky = zones.iter().filter(|z| z.kind == "volatility").count();
        if shaky > 0 {
            payload.insights.push(Insight::new(
                "Recent swings make the back half of this forecast unreliable.",
                "risk",
                volatility.clamp(0.0, 1.0),
            ));
        }

        let momentum = zones.iter().filter(|z| z.kind == "positive_momentum").count();
        if momentum > 0 {
            payload.insights.push(Insight::new(
                format!(
                    "Positive momentum carries through {} of the next {} days.",
                    momentum, HORIZON_DAYS
                ),
                "momentum",
                momentum as f64 / HORIZON_DAYS as f64,
            ));
        }

        if slope.abs() > 0.001 {
            let direction = if slope > 0.0 { "upward" } else { "downward" };
            payload.insights.push(Insight::new(
                format!("The smoothed sentiment trend points {}.", direction),
                "trend",
                (slope.abs() * 100.0).clamp(0.0, 1.0),
            ));
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn on_day(day: i64, sentiment: f64) -> MemoryRecord {
        let base = Utc.with_ymd_and_hms(2026, 4, 6, 9, 0, 0).unwrap();
        MemoryRecord::new(format!("day {}", day))
            .at(base + Duration::days(day))
            .sentiment(sentiment)
    }

    #[test]
    fn test_forecast_length_and_confidence_decay() {
        let smoothed = vec![0.0, 0.1, 0.2, 0.3];
        let forecast = PredictionEngine::forecast(&smoothed);
        assert_eq!(forecast.len(), 7);
        assert!((forecast[0].confidence - 0.9).abs() < 1e-9);
        assert!((forecast[6].confidence - 0.3).abs() < 1e-9);
        // Confidence is strictly decreasing.
        for pair in forecast.windows(2) {
            assert!(pair[1].confidence < pair[0].confidence);
        }
    }

    #[test]
    fn test_forecast_slope_decays() {
        let smoothed = vec![0.0, 0.1, 0.2, 0.3, 0.4];
        let forecast = PredictionEngine::forecast(&smoothed);
        let first_step = forecast[0].value - 0.4;
        let second_step = forecast[1].value - forecast[0].value;
        assert!(first_step > 0.0);
        // Each added increment halves.
        assert!((second_step - first_step * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_empty_series() {
        assert!(PredictionEngine::forecast(&[]).is_empty());
    }

    #[test]
    fn test_flat_history_forecasts_flat() {
        let smoothed = vec![0.2; 20];
        let forecast = PredictionEngine::forecast(&smoothed);
        for point in forecast {
            assert!((point.value - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_negative_risk_zone() {
        let points = vec![
            ForecastPoint { day: 1, value: -0.6, confidence: 0.9 },
            ForecastPoint { day: 2, value: 0.0, confidence: 0.8 },
        ];
        let zones = PredictionEngine::risk_zones(&points, 0.1);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].kind, "negative");
    }

    #[test]
    fn test_volatility_risk_needs_low_confidence() {
        let points = vec![
            ForecastPoint { day: 4, value: 0.0, confidence: 0.7 },
            ForecastPoint { day: 6, value: 0.0, confidence: 0.5 },
        ];
        let zones = PredictionEngine::risk_zones(&points, 0.8);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].kind, "volatility");
        assert_eq!(zones[0].day, 6);

        // Calm history never produces volatility zones.
        assert!(PredictionEngine::risk_zones(&points, 0.2).is_empty());
    }

    #[test]
    fn test_positive_momentum_zone() {
        let points = vec![ForecastPoint { day: 1, value: 0.5, confidence: 0.9 }];
        let zones = PredictionEngine::risk_zones(&points, 0.0);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].kind, "positive_momentum");
    }

    #[test]
    fn test_compute_steady_outlook() {
        let records: Vec<MemoryRecord> = (0..20).map(|i| on_day(i, 0.1)).collect();
        let engine = PredictionEngine::new();
        let payload = engine.compute(&records);

        assert_eq!(payload.metric_number("history_days"), Some(20.0));
        let end = payload.metric_number("forecast_end").unwrap();
        assert!((end - 0.1).abs() < 0.05);
        assert!(payload.summary.contains("steady"));
    }
}
