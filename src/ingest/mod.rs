// src/ingest/mod.rs
pub mod breaker;
pub mod providers;
pub mod scheduler;
pub mod tags;
pub mod types;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::Instrument;

use crate::config::CircuitBreakerConfig;
use crate::ingest::breaker::{BreakerSettings, ResilientProviderClient};
use crate::ingest::tags::TagNormalizer;
use crate::ingest::types::ProviderClient;
use crate::model::{Content, ContentStats, ContentType, Provider, ProviderContentItem, ProviderFormat};
use crate::store::{ContentStore, ProviderRegistry, StatsStore, TagStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Completed sync_all runs.");
        describe_counter!(
            "sync_provider_errors_total",
            "Provider syncs that failed (fetch, decode or store)."
        );
        describe_counter!("sync_items_total", "Items fetched and upserted.");
        describe_counter!(
            "sync_unresolved_items_total",
            "Items skipped because no internal ID was found after upsert."
        );
        describe_counter!(
            "sync_tag_failures_total",
            "Content items whose tag replacement failed."
        );
        describe_counter!(
            "breaker_transitions_total",
            "Circuit breaker state changes, labelled by target state."
        );
        describe_counter!("provider_items_total", "Items decoded from provider feeds.");
        describe_histogram!("provider_parse_ms", "Provider feed decode time in milliseconds.");
        describe_gauge!("sync_last_run_ts", "Unix ts when sync_all last finished.");
    });
}

/// Outcome of one provider's reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub provider: String,
    pub fetched: usize,
    pub stats_upserted: usize,
    pub unresolved: usize,
    pub tagged: usize,
    pub tag_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub reports: Vec<SyncReport>,
    pub failures: Vec<ProviderFailure>,
}

impl SyncSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Pulls every enabled provider and reconciles contents, stats and tags.
///
/// Each provider gets its own breaker-wrapped client, created on first use
/// and kept for the lifetime of the orchestrator.
pub struct SyncOrchestrator {
    providers: Arc<dyn ProviderRegistry>,
    contents: Arc<dyn ContentStore>,
    stats: Arc<dyn StatsStore>,
    tags: Arc<dyn TagStore>,
    clients: HashMap<ProviderFormat, Arc<dyn ProviderClient>>,
    breaker_cfg: CircuitBreakerConfig,
    resilient: Mutex<HashMap<String, Arc<ResilientProviderClient>>>,
    normalizer: TagNormalizer,
}

impl SyncOrchestrator {
    pub fn new(
        providers: Arc<dyn ProviderRegistry>,
        contents: Arc<dyn ContentStore>,
        stats: Arc<dyn StatsStore>,
        tags: Arc<dyn TagStore>,
        breaker_cfg: CircuitBreakerConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            providers,
            contents,
            stats,
            tags,
            clients: HashMap::new(),
            breaker_cfg,
            resilient: Mutex::new(HashMap::new()),
            normalizer: TagNormalizer::new(),
        }
    }

    /// Register the adapter used for providers declaring `format`.
    pub fn with_client(mut self, format: ProviderFormat, client: Arc<dyn ProviderClient>) -> Self {
        self.clients.insert(format, client);
        self
    }

    /// Sync every enabled provider. A failing provider is logged and recorded
    /// in the summary; only a failure to list providers is returned as an error.
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let providers = self
            .providers
            .list_enabled()
            .await
            .context("sync_all: list enabled providers")?;

        let mut summary = SyncSummary::default();
        for provider in &providers {
            match self.sync_one(provider).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::warn!(error = ?e, provider = %provider.code, "provider sync failed");
                    counter!("sync_provider_errors_total").increment(1);
                    summary.failures.push(ProviderFailure {
                        provider: provider.code.clone(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        counter!("sync_runs_total").increment(1);
        gauge!("sync_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
        tracing::info!(
            target: "sync",
            providers = providers.len(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "sync run finished"
        );
        Ok(summary)
    }

    /// Fetch and reconcile a single provider.
    pub async fn sync_one(&self, provider: &Provider) -> Result<SyncReport> {
        let span = tracing::info_span!(
            "sync_provider",
            provider = %provider.code,
            format = %provider.format
        );
        self.reconcile(provider).instrument(span).await
    }

    async fn reconcile(&self, provider: &Provider) -> Result<SyncReport> {
        let mut report = SyncReport {
            provider: provider.code.clone(),
            ..SyncReport::default()
        };

        let client = self.client_for(provider)?;
        let items = client
            .fetch_contents(provider)
            .await
            .with_context(|| format!("fetch contents for provider {}", provider.code))?;
        if items.is_empty() {
            tracing::info!("provider returned no items");
            return Ok(report);
        }
        report.fetched = items.len();

        let now = Utc::now();
        let rows: Vec<Content> = items.iter().map(|it| to_content(provider, it, now)).collect();
        self.contents
            .upsert_contents(&rows)
            .await
            .with_context(|| format!("upsert {} contents for provider {}", rows.len(), provider.code))?;
        counter!("sync_items_total").increment(items.len() as u64);

        let saved = self
            .contents
            .find_by_provider(provider.id)
            .await
            .with_context(|| format!("re-read contents for provider {}", provider.code))?;
        let ids: HashMap<&str, i64> = saved
            .iter()
            .map(|c| (c.provider_content_id.as_str(), c.id))
            .collect();

        let mut resolved: Vec<(i64, &ProviderContentItem)> = Vec::with_capacity(items.len());
        for it in &items {
            match ids.get(it.provider_content_id.as_str()) {
                Some(&id) => resolved.push((id, it)),
                None => {
                    tracing::warn!(
                        provider_content_id = %it.provider_content_id,
                        "no internal id after upsert; skipping item"
                    );
                    report.unresolved += 1;
                }
            }
        }
        counter!("sync_unresolved_items_total").increment(report.unresolved as u64);

        let stats: Vec<ContentStats> = resolved
            .iter()
            .map(|(id, it)| to_stats(*id, it, now))
            .collect();
        self.stats
            .upsert_stats(&stats)
            .await
            .with_context(|| format!("upsert {} stats for provider {}", stats.len(), provider.code))?;
        report.stats_upserted = stats.len();

        for (id, it) in &resolved {
            if it.tags.is_empty() {
                continue;
            }
            match self.replace_tags(*id, &it.tags).await {
                Ok(()) => report.tagged += 1,
                Err(e) => {
                    tracing::warn!(error = ?e, content_id = *id, "tag replacement failed; skipping");
                    counter!("sync_tag_failures_total").increment(1);
                    report.tag_failures += 1;
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            stats = report.stats_upserted,
            unresolved = report.unresolved,
            tagged = report.tagged,
            tag_failures = report.tag_failures,
            "provider synced"
        );
        Ok(report)
    }

    async fn replace_tags(&self, content_id: i64, raw: &[String]) -> Result<()> {
        let names = self.normalizer.normalize(raw);
        let tags = self
            .tags
            .ensure_tags(&names)
            .await
            .with_context(|| format!("ensure tags for content {content_id}"))?;
        let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        self.tags
            .replace_content_tags(content_id, &tag_ids)
            .await
            .with_context(|| format!("replace tags for content {content_id}"))
    }

    fn client_for(&self, provider: &Provider) -> Result<Arc<ResilientProviderClient>> {
        let inner = self.clients.get(&provider.format).ok_or_else(|| {
            anyhow!(
                "unsupported provider format '{}' for provider {}",
                provider.format,
                provider.code
            )
        })?;

        let key = format!("{}:{}", provider.code, provider.format);
        let mut map = self.resilient.lock().unwrap_or_else(|e| e.into_inner());
        let client = map.entry(key).or_insert_with(|| {
            let name = format!("{}-{}", self.breaker_cfg.name, provider.code);
            Arc::new(ResilientProviderClient::new(
                inner.clone(),
                BreakerSettings::from_config(&self.breaker_cfg, name),
            ))
        });
        Ok(client.clone())
    }
}

fn to_content(provider: &Provider, it: &ProviderContentItem, now: DateTime<Utc>) -> Content {
    Content {
        id: 0,
        provider_id: provider.id,
        provider_content_id: it.provider_content_id.clone(),
        title: it.title.clone(),
        content_type: ContentType::parse(&it.content_type),
        published_at: it.published_at,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn to_stats(content_id: i64, it: &ProviderContentItem, now: DateTime<Utc>) -> ContentStats {
    ContentStats {
        content_id,
        views: it.views,
        likes: it.likes,
        duration_sec: it.duration_sec,
        reading_time: it.reading_time,
        reactions: it.reactions,
        comments: it.comments,
        last_sync_at: Some(now),
    }
}
