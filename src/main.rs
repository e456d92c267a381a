//! Search aggregator binary entrypoint.
//! Loads config, starts the periodic provider sync and serves the HTTP API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use search_aggregator::{
    api::{self, AppState},
    cache::MokaCacheStore,
    config::AppConfig,
    ingest::{
        providers::{json_feed::JsonFeedClient, xml_feed::XmlFeedClient},
        scheduler::spawn_sync_scheduler,
    },
    metrics::Metrics,
    model::ProviderFormat,
    seed_providers,
    store::{
        memory::{MemoryContentStore, MemoryProviderRegistry, MemoryStatsStore, MemoryTagStore},
        rules_file::JsonFileRulesStore,
    },
    SearchService, SyncOrchestrator,
};

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("load configuration")?;
    let metrics = Metrics::init(cfg.cache.ttl().as_secs())?;

    let providers = Arc::new(MemoryProviderRegistry::new());
    let contents = Arc::new(MemoryContentStore::new());
    let stats = Arc::new(MemoryStatsStore::new());
    let tags = Arc::new(MemoryTagStore::new());
    seed_providers(providers.as_ref(), &cfg.providers).await?;

    let timeout = cfg.sync.provider_timeout();
    let orchestrator = Arc::new(
        SyncOrchestrator::new(
            providers,
            contents.clone(),
            stats.clone(),
            tags,
            cfg.circuit_breaker.clone(),
        )
        .with_client(ProviderFormat::Json, Arc::new(JsonFeedClient::new(timeout)?))
        .with_client(ProviderFormat::Xml, Arc::new(XmlFeedClient::new(timeout)?)),
    );

    let shutdown = CancellationToken::new();
    let sync_task = spawn_sync_scheduler(orchestrator, cfg.sync.interval(), shutdown.clone());

    let search = Arc::new(SearchService::new(
        contents,
        stats,
        Arc::new(JsonFileRulesStore::new(&cfg.scoring.rules_path)),
        Arc::new(MokaCacheStore::new(cfg.cache.max_entries)),
        cfg.scoring.defaults,
        cfg.cache.ttl(),
    ));
    let app = api::router(AppState {
        search,
        pagination: cfg.pagination.clone(),
        rate_limit: cfg.rate_limit.clone(),
    })
    .merge(metrics.router());

    let addr = cfg.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "http server listening");

    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            token.cancel();
        })
        .await
        .context("http server")?;

    shutdown.cancel();
    let _ = sync_task.await;
    Ok(())
}
