//! Dynamic scoring rules overlay.
//!
//! Resolution is two-stage: start from the static defaults, then apply every
//! recognized rule group found in the rules store. Payloads are JSON:
//!
//! ```json
//! { "type_multiplier": 2.0, "views_divisor": 500 }
//! ```
//!
//! Fields missing from a payload keep the prior value. A group that fails to
//! decode is skipped; unknown groups are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::model::ScoringConfig;
use crate::store::ScoringRulesStore;

pub const VIDEO_GROUP: &str = "video_config";
pub const ARTICLE_GROUP: &str = "article_config";
pub const RECENCY_GROUP: &str = "recency_config";

#[derive(Debug, Default, Deserialize)]
struct VideoRules {
    type_multiplier: Option<f64>,
    engagement_weight: Option<f64>,
    views_divisor: Option<f64>,
    likes_divisor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleRules {
    type_multiplier: Option<f64>,
    engagement_weight: Option<f64>,
    reading_time_divisor: Option<f64>,
    reactions_divisor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecencyRules {
    week_score: Option<f64>,
    month_score: Option<f64>,
    quarter_score: Option<f64>,
}

fn set(slot: &mut f64, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        *slot = v;
    }
}

/// Apply raw rule groups on top of `defaults`.
pub fn apply_rules(defaults: ScoringConfig, rules: &HashMap<String, Vec<u8>>) -> ScoringConfig {
    let mut cfg = defaults;

    for (group, payload) in rules {
        match group.as_str() {
            VIDEO_GROUP => match serde_json::from_slice::<VideoRules>(payload) {
                Ok(r) => {
                    set(&mut cfg.video_type_multiplier, r.type_multiplier);
                    set(&mut cfg.video_engagement_weight, r.engagement_weight);
                    set(&mut cfg.video_views_divisor, r.views_divisor);
                    set(&mut cfg.video_likes_divisor, r.likes_divisor);
                }
                Err(e) => tracing::debug!(group = %group, error = %e, "ignoring undecodable rule group"),
            },
            ARTICLE_GROUP => match serde_json::from_slice::<ArticleRules>(payload) {
                Ok(r) => {
                    set(&mut cfg.text_type_multiplier, r.type_multiplier);
                    set(&mut cfg.text_engagement_weight, r.engagement_weight);
                    set(&mut cfg.text_reading_time_divisor, r.reading_time_divisor);
                    set(&mut cfg.text_reactions_divisor, r.reactions_divisor);
                }
                Err(e) => tracing::debug!(group = %group, error = %e, "ignoring undecodable rule group"),
            },
            RECENCY_GROUP => match serde_json::from_slice::<RecencyRules>(payload) {
                Ok(r) => {
                    set(&mut cfg.recency_week_score, r.week_score);
                    set(&mut cfg.recency_month_score, r.month_score);
                    set(&mut cfg.recency_quarter_score, r.quarter_score);
                }
                Err(e) => tracing::debug!(group = %group, error = %e, "ignoring undecodable rule group"),
            },
            _ => {}
        }
    }

    cfg
}

/// Resolve the effective config for one scoring invocation.
/// A failing rules store yields the defaults unchanged.
pub async fn resolve(defaults: ScoringConfig, store: &dyn ScoringRulesStore) -> ScoringConfig {
    match store.scoring_rules().await {
        Ok(rules) => apply_rules(defaults, &rules),
        Err(e) => {
            tracing::warn!(error = ?e, "scoring rules unavailable; using defaults");
            defaults
        }
    }
}
