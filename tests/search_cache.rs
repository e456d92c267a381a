// tests/search_cache.rs
//
// Read path: filter → page → stats → score → sort, memoized by request shape.
//
// Covered:
// - second identical request is a cache hit (no storage query, identical page)
// - different page → different key → fresh storage query
// - cache outage degrades to direct computation
// - sort modes, missing stats, dynamic rules overlay, get_content

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use search_aggregator::cache::{CacheStore, MokaCacheStore};
use search_aggregator::model::{Content, ContentStats, ContentType, ScoringConfig};
use search_aggregator::pagination::Pagination;
use search_aggregator::search::{SearchPage, SearchRequest, SearchService, SortMode};
use search_aggregator::store::memory::{MemoryContentStore, MemoryRulesStore, MemoryStatsStore};
use search_aggregator::store::{ContentStore, SearchFilters, StatsStore};

/// Counts `search` calls on top of the memory store.
struct CountingContents {
    inner: MemoryContentStore,
    searches: AtomicUsize,
}

impl CountingContents {
    fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingContents {
    async fn upsert_contents(&self, contents: &[Content]) -> Result<()> {
        self.inner.upsert_contents(contents).await
    }
    async fn find_by_provider(&self, provider_id: i64) -> Result<Vec<Content>> {
        self.inner.find_by_provider(provider_id).await
    }
    async fn search(&self, f: &SearchFilters, p: Pagination) -> Result<(Vec<Content>, i64)> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(f, p).await
    }
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Content>> {
        self.inner.get_by_ids(ids).await
    }
    async fn get_by_id(&self, id: i64) -> Result<Option<Content>> {
        self.inner.get_by_id(id).await
    }
}

/// Every call fails, as if the cache backend were down.
struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(anyhow!("connection refused"))
    }
    async fn set_raw(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn content(native: &str, title: &str, kind: ContentType, days_ago: i64) -> Content {
    let ts = now() - chrono::Duration::days(days_ago);
    Content {
        id: 0,
        provider_id: 1,
        provider_content_id: native.into(),
        title: title.into(),
        content_type: kind,
        published_at: ts,
        is_active: true,
        created_at: ts,
        updated_at: ts,
    }
}

struct Fixture {
    contents: Arc<CountingContents>,
    stats: Arc<MemoryStatsStore>,
    rules: Arc<MemoryRulesStore>,
}

impl Fixture {
    /// Two videos:
    /// - "hot": 60 days old, 30000 views / 3000 likes → 92.0 (quarter tier)
    /// - "new": 2 days old, 1000 views / 50 likes     → 7.75 (week tier)
    /// plus one article with no stats row.
    async fn new() -> Self {
        let contents = Arc::new(CountingContents {
            inner: MemoryContentStore::new(),
            searches: AtomicUsize::new(0),
        });
        contents
            .upsert_contents(&[
                content("hot", "Rust async deep dive", ContentType::Video, 60),
                content("new", "Rust in production", ContentType::Video, 2),
                content("txt", "Cooking pasta", ContentType::Article, 1),
            ])
            .await
            .unwrap();

        let stats = Arc::new(MemoryStatsStore::new());
        stats
            .upsert_stats(&[
                ContentStats {
                    content_id: 1,
                    views: 30_000,
                    likes: 3_000,
                    ..ContentStats::default()
                },
                ContentStats {
                    content_id: 2,
                    views: 1_000,
                    likes: 50,
                    ..ContentStats::default()
                },
            ])
            .await
            .unwrap();

        Self {
            contents,
            stats,
            rules: Arc::new(MemoryRulesStore::new()),
        }
    }

    fn service(&self, cache: Arc<dyn CacheStore>) -> SearchService {
        SearchService::new(
            self.contents.clone(),
            self.stats.clone(),
            self.rules.clone(),
            cache,
            ScoringConfig::default(),
            Duration::from_secs(60),
        )
        .with_clock(Arc::new(now))
    }
}

fn rust_query(sort: SortMode, page: u32) -> SearchRequest {
    SearchRequest {
        query: "rust".into(),
        content_type: Some(ContentType::Video),
        sort,
        pagination: Pagination::new(page, 10),
    }
}

fn natives(page: &SearchPage) -> Vec<&str> {
    page.items
        .iter()
        .map(|i| i.content.provider_content_id.as_str())
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn scores_and_default_sort() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));

    let page = svc.search(&rust_query(SortMode::ScoreDesc, 1)).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(natives(&page), vec!["hot", "new"]);
    // (30 + 30) * 1.5 + quarter tier 1 + (0.1 * 10)
    let hot = &page.items[0].score;
    assert!(close(hot.base_score, 60.0));
    assert!(close(hot.recency_score, 1.0));
    assert!(close(hot.engagement_score, 1.0));
    assert!(close(hot.final_score, 92.0));

    let new = &page.items[1].score;
    assert!(close(new.final_score, 1.5 * 1.5 + 5.0 + 0.5));
}

#[tokio::test]
async fn sort_modes_reorder_the_same_page() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));

    let desc = svc.search(&rust_query(SortMode::ScoreDesc, 1)).await.unwrap();
    let asc = svc.search(&rust_query(SortMode::ScoreAsc, 1)).await.unwrap();
    let recent = svc.search(&rust_query(SortMode::RecencyDesc, 1)).await.unwrap();

    assert_eq!(natives(&desc), vec!["hot", "new"]);
    assert_eq!(natives(&asc), vec!["new", "hot"]);
    // newest first even though it scores lower
    assert_eq!(natives(&recent), vec!["new", "hot"]);
    assert!(recent.items[0].score.final_score < recent.items[1].score.final_score);
}

#[tokio::test]
async fn identical_request_is_served_from_cache() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));
    let req = rust_query(SortMode::ScoreDesc, 1);

    let first = svc.search(&req).await.unwrap();
    assert_eq!(fx.contents.searches(), 1);

    let second = svc.search(&req).await.unwrap();
    assert_eq!(fx.contents.searches(), 1, "hit must not query storage");
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap(),
        "cached page is returned verbatim"
    );

    let other_page = svc.search(&rust_query(SortMode::ScoreDesc, 2)).await.unwrap();
    assert_eq!(fx.contents.searches(), 2, "new page number is a new key");
    assert!(other_page.items.is_empty());
    assert_eq!(other_page.total, 2, "total is independent of the page slice");
}

#[tokio::test]
async fn cache_outage_degrades_to_direct_computation() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(DownCache));
    let req = rust_query(SortMode::ScoreDesc, 1);

    let a = svc.search(&req).await.expect("cache errors never surface");
    let b = svc.search(&req).await.expect("cache errors never surface");
    assert_eq!(natives(&a), natives(&b));
    assert_eq!(fx.contents.searches(), 2);
}

#[tokio::test]
async fn missing_stats_score_as_zero() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));
    let req = SearchRequest {
        query: "pasta".into(),
        content_type: None,
        sort: SortMode::ScoreDesc,
        pagination: Pagination::new(1, 10),
    };

    let page = svc.search(&req).await.unwrap();
    assert_eq!(page.items.len(), 1);
    let item = &page.items[0];
    assert_eq!(item.stats, ContentStats::empty(item.content.id));
    assert!(close(item.score.base_score, 0.0));
    assert!(close(item.score.engagement_score, 0.0));
    assert!(close(item.score.final_score, item.score.recency_score));
}

#[tokio::test]
async fn dynamic_rules_apply_on_next_miss() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));

    let before = svc.search(&rust_query(SortMode::ScoreDesc, 1)).await.unwrap();
    fx.rules
        .set_rule("video_config", r#"{"type_multiplier": 3.0}"#);

    // cached page is unchanged until the key changes
    let cached = svc.search(&rust_query(SortMode::ScoreDesc, 1)).await.unwrap();
    assert_eq!(before, cached);

    let fresh = svc.search(&rust_query(SortMode::ScoreAsc, 1)).await.unwrap();
    let hot = fresh
        .items
        .iter()
        .find(|i| i.content.provider_content_id == "hot")
        .unwrap();
    assert!(close(hot.score.type_multiplier, 3.0));
    assert!(close(hot.score.final_score, 60.0 * 3.0 + 1.0 + 1.0));
}

#[tokio::test]
async fn get_content_scores_a_single_item() {
    let fx = Fixture::new().await;
    let svc = fx.service(Arc::new(MokaCacheStore::new(100)));

    let item = svc.get_content(1).await.unwrap().expect("content 1 exists");
    assert_eq!(item.content.provider_content_id, "hot");
    assert!(close(item.score.final_score, 92.0));

    assert!(svc.get_content(999).await.unwrap().is_none());
}
