// src/search.rs
//! Ranked search over stored contents, memoized per request shape.
//!
//! A miss runs filter → page → batch stats → score → sort and stores the
//! assembled page with a TTL. Cache failures never fail the request.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::cache::{self, CacheStore};
use crate::model::{Content, ContentStats, ContentType, ScoreComponents, ScoringConfig};
use crate::pagination::Pagination;
use crate::scoring;
use crate::store::{ContentStore, ScoringRulesStore, SearchFilters, StatsStore};

/// Source of "now" for recency scoring.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    ScoreDesc,
    ScoreAsc,
    RecencyDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::ScoreDesc, SortMode::ScoreAsc, SortMode::RecencyDesc];

    /// Unknown or empty input falls back to score descending.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "score_asc" => SortMode::ScoreAsc,
            "recency_desc" => SortMode::RecencyDesc,
            _ => SortMode::ScoreDesc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::ScoreDesc => "score_desc",
            SortMode::ScoreAsc => "score_asc",
            SortMode::RecencyDesc => "recency_desc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortMode::ScoreDesc => "Highest Score",
            SortMode::ScoreAsc => "Lowest Score",
            SortMode::RecencyDesc => "Newest First",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// `None` means all types.
    pub content_type: Option<ContentType>,
    pub sort: SortMode,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentWithScore {
    pub content: Content,
    pub stats: ContentStats,
    pub score: ScoreComponents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<ContentWithScore>,
    pub page: u32,
    pub page_size: u32,
    /// Matches across all pages.
    pub total: i64,
}

/// Deterministic key over the full request shape.
pub fn cache_key(req: &SearchRequest) -> String {
    let kind = req
        .content_type
        .as_ref()
        .map(ContentType::as_str)
        .unwrap_or("all");
    format!(
        "search:{}:{}:{}:{}:{}",
        req.query,
        kind,
        req.sort.as_str(),
        req.pagination.page,
        req.pagination.page_size
    )
}

pub fn sort_items(items: &mut [ContentWithScore], mode: SortMode) {
    let by_score = |a: &ContentWithScore, b: &ContentWithScore| -> Ordering {
        a.score.final_score.total_cmp(&b.score.final_score)
    };
    match mode {
        SortMode::ScoreDesc => items.sort_by(|a, b| by_score(b, a)),
        SortMode::ScoreAsc => items.sort_by(by_score),
        SortMode::RecencyDesc => {
            items.sort_by(|a, b| b.content.published_at.cmp(&a.content.published_at))
        }
    }
}

pub struct SearchService {
    contents: Arc<dyn ContentStore>,
    stats: Arc<dyn StatsStore>,
    rules: Arc<dyn ScoringRulesStore>,
    cache: Arc<dyn CacheStore>,
    scoring_defaults: ScoringConfig,
    ttl: Duration,
    clock: Clock,
}

impl SearchService {
    pub fn new(
        contents: Arc<dyn ContentStore>,
        stats: Arc<dyn StatsStore>,
        rules: Arc<dyn ScoringRulesStore>,
        cache: Arc<dyn CacheStore>,
        scoring_defaults: ScoringConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            contents,
            stats,
            rules,
            cache,
            scoring_defaults,
            ttl,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Static defaults overlaid with the current dynamic rules.
    pub async fn scoring_config(&self) -> ScoringConfig {
        scoring::rules::resolve(self.scoring_defaults, self.rules.as_ref()).await
    }

    pub async fn search(&self, req: &SearchRequest) -> Result<SearchPage> {
        let key = cache_key(req);

        match cache::get_json::<SearchPage>(self.cache.as_ref(), &key).await {
            Ok(Some(page)) => {
                counter!("search_cache_hits_total").increment(1);
                tracing::debug!(key = %key, "search cache hit");
                return Ok(page);
            }
            Ok(None) => counter!("search_cache_misses_total").increment(1),
            Err(e) => {
                counter!("search_cache_errors_total").increment(1);
                tracing::warn!(error = ?e, key = %key, "search cache read failed");
            }
        }

        let page = self.compute(req).await?;

        if let Err(e) = cache::set_json(self.cache.as_ref(), &key, &page, self.ttl).await {
            counter!("search_cache_errors_total").increment(1);
            tracing::warn!(error = ?e, key = %key, "failed to cache search result");
        }
        Ok(page)
    }

    async fn compute(&self, req: &SearchRequest) -> Result<SearchPage> {
        let filters = SearchFilters {
            query: req.query.clone(),
            content_type: req.content_type.clone(),
        };
        let (contents, total) = self
            .contents
            .search(&filters, req.pagination)
            .await
            .with_context(|| format!("search contents for '{}'", req.query))?;

        let mut items = Vec::with_capacity(contents.len());
        if !contents.is_empty() {
            let ids: Vec<i64> = contents.iter().map(|c| c.id).collect();
            let mut stats = self
                .stats
                .get_by_content_ids(&ids)
                .await
                .with_context(|| format!("get stats for {} contents", ids.len()))?;

            let config = self.scoring_config().await;
            let now = (self.clock)();
            for content in contents {
                let stats = stats
                    .remove(&content.id)
                    .unwrap_or_else(|| ContentStats::empty(content.id));
                let score = scoring::calculate(&content, &stats, &config, now);
                items.push(ContentWithScore {
                    content,
                    stats,
                    score,
                });
            }
            sort_items(&mut items, req.sort);
        }

        Ok(SearchPage {
            items,
            page: req.pagination.page,
            page_size: req.pagination.page_size,
            total,
        })
    }

    /// Single scored lookup; `None` when the ID is unknown.
    pub async fn get_content(&self, id: i64) -> Result<Option<ContentWithScore>> {
        let Some(content) = self
            .contents
            .get_by_id(id)
            .await
            .with_context(|| format!("get content {id}"))?
        else {
            return Ok(None);
        };
        let stats = self
            .stats
            .get_by_content_id(id)
            .await
            .with_context(|| format!("get stats for content {id}"))?
            .unwrap_or_else(|| ContentStats::empty(id));

        let config = self.scoring_config().await;
        let score = scoring::calculate(&content, &stats, &config, (self.clock)());
        Ok(Some(ContentWithScore {
            content,
            stats,
            score,
        }))
    }
}
