// tests/sync_scheduler.rs
//
// Periodic sync loop on a paused clock: runs at startup, then per interval,
// and stops once the cancellation token fires.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use search_aggregator::config::CircuitBreakerConfig;
use search_aggregator::ingest::scheduler::spawn_sync_scheduler;
use search_aggregator::ingest::types::ProviderClient;
use search_aggregator::ingest::SyncOrchestrator;
use search_aggregator::model::{Provider, ProviderContentItem, ProviderFormat};
use search_aggregator::store::memory::{
    MemoryContentStore, MemoryProviderRegistry, MemoryStatsStore, MemoryTagStore,
};
use search_aggregator::store::ProviderRegistry;

#[derive(Default)]
struct CountingClient {
    calls: AtomicUsize,
}

#[async_trait]
impl ProviderClient for CountingClient {
    async fn fetch_contents(&self, _provider: &Provider) -> Result<Vec<ProviderContentItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn runs_immediately_then_per_interval_until_cancelled() {
    let registry = Arc::new(MemoryProviderRegistry::new());
    let now = Utc::now();
    registry
        .upsert(Provider {
            id: 0,
            name: "P".into(),
            code: "p".into(),
            format: ProviderFormat::Json,
            base_url: "http://p.invalid".into(),
            is_enabled: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let client = Arc::new(CountingClient::default());
    let orch = Arc::new(
        SyncOrchestrator::new(
            registry,
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryStatsStore::new()),
            Arc::new(MemoryTagStore::new()),
            CircuitBreakerConfig::default(),
        )
        .with_client(ProviderFormat::Json, client.clone()),
    );

    let shutdown = CancellationToken::new();
    let handle = spawn_sync_scheduler(orch, Duration::from_secs(60), shutdown.clone());

    settle().await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 1, "first run at startup");

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 2, "second run after one interval");

    shutdown.cancel();
    handle.await.expect("scheduler exits cleanly");

    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 2, "no runs after cancellation");
}
