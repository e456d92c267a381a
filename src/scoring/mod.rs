//! # Scoring
//! Pure function of `(content, stats, config, now)` → [`ScoreComponents`].
//! No I/O and no clock reads, so the same inputs always give the same score.
//!
//! final = base × type_multiplier + recency + engagement

pub mod rules;

use chrono::{DateTime, Utc};

use crate::model::{Content, ContentStats, ContentType, ScoreComponents, ScoringConfig};

const MS_PER_DAY: f64 = 86_400_000.0;
const WEEK_DAYS: f64 = 7.0;
const MONTH_DAYS: f64 = 30.0;
const QUARTER_DAYS: f64 = 90.0;

/// Compute the score breakdown for one content item.
pub fn calculate(
    content: &Content,
    stats: &ContentStats,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> ScoreComponents {
    let base_score = base_score(&content.content_type, stats, config);
    let type_multiplier = type_multiplier(&content.content_type, config);
    let recency_score = recency_score(content.published_at, now, config);
    let engagement_score = engagement_score(&content.content_type, stats, config);

    ScoreComponents {
        base_score,
        type_multiplier,
        recency_score,
        engagement_score,
        final_score: (base_score * type_multiplier) + recency_score + engagement_score,
    }
}

/// Non-positive or non-finite divisors collapse to 1.0.
fn divisor(d: f64) -> f64 {
    if d > 0.0 && d.is_finite() {
        d
    } else {
        1.0
    }
}

fn base_score(kind: &ContentType, stats: &ContentStats, cfg: &ScoringConfig) -> f64 {
    match kind {
        ContentType::Video => {
            stats.views as f64 / divisor(cfg.video_views_divisor)
                + stats.likes as f64 / divisor(cfg.video_likes_divisor)
        }
        ContentType::Article => {
            stats.reading_time as f64 / divisor(cfg.text_reading_time_divisor)
                + stats.reactions as f64 / divisor(cfg.text_reactions_divisor)
        }
        ContentType::Other(_) => 0.0,
    }
}

fn type_multiplier(kind: &ContentType, cfg: &ScoringConfig) -> f64 {
    match kind {
        ContentType::Video => cfg.video_type_multiplier,
        ContentType::Article => cfg.text_type_multiplier,
        ContentType::Other(_) => 1.0,
    }
}

/// Step function over elapsed days; each tier includes its upper bound.
fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>, cfg: &ScoringConfig) -> f64 {
    let days = (now - published_at).num_milliseconds() as f64 / MS_PER_DAY;
    if days <= WEEK_DAYS {
        cfg.recency_week_score
    } else if days <= MONTH_DAYS {
        cfg.recency_month_score
    } else if days <= QUARTER_DAYS {
        cfg.recency_quarter_score
    } else {
        0.0
    }
}

fn engagement_score(kind: &ContentType, stats: &ContentStats, cfg: &ScoringConfig) -> f64 {
    match kind {
        ContentType::Video if stats.views != 0 => {
            (stats.likes as f64 / stats.views as f64) * cfg.video_engagement_weight
        }
        ContentType::Article if stats.reading_time != 0 => {
            (stats.reactions as f64 / stats.reading_time as f64) * cfg.text_engagement_weight
        }
        _ => 0.0,
    }
}
