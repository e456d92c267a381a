// src/model/score.rs
use serde::{Deserialize, Serialize};

/// Breakdown of a computed score. Derived on every read, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub base_score: f64,
    pub type_multiplier: f64,
    pub recency_score: f64,
    pub engagement_score: f64,
    pub final_score: f64,
}

/// Per-type tuning used by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub video_type_multiplier: f64,
    pub text_type_multiplier: f64,
    pub recency_week_score: f64,
    pub recency_month_score: f64,
    pub recency_quarter_score: f64,
    pub video_engagement_weight: f64,
    pub text_engagement_weight: f64,
    pub video_views_divisor: f64,
    pub video_likes_divisor: f64,
    pub text_reading_time_divisor: f64,
    pub text_reactions_divisor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            video_type_multiplier: 1.5,
            text_type_multiplier: 1.0,
            recency_week_score: 5.0,
            recency_month_score: 3.0,
            recency_quarter_score: 1.0,
            video_engagement_weight: 10.0,
            text_engagement_weight: 5.0,
            video_views_divisor: 1000.0,
            video_likes_divisor: 100.0,
            text_reading_time_divisor: 1.0,
            text_reactions_divisor: 50.0,
        }
    }
}
