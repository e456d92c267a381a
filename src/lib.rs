// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pagination;
pub mod scoring;
pub mod search;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::ingest::SyncOrchestrator;
pub use crate::search::SearchService;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::config::ProviderSeed;
use crate::model::Provider;
use crate::store::ProviderRegistry;

/// Upsert the configured providers into the registry, keyed by code.
/// Returns how many seeds were applied.
pub async fn seed_providers(registry: &dyn ProviderRegistry, seeds: &[ProviderSeed]) -> Result<usize> {
    let now = Utc::now();
    for seed in seeds {
        let stored = registry
            .upsert(Provider {
                id: 0,
                name: seed.name.clone(),
                code: seed.code.clone(),
                format: seed.format.clone(),
                base_url: seed.base_url.clone(),
                is_enabled: seed.enabled,
                created_at: now,
                updated_at: now,
            })
            .await
            .with_context(|| format!("seed provider {}", seed.code))?;
        info!(
            provider = %stored.code,
            id = stored.id,
            format = %stored.format,
            enabled = stored.is_enabled,
            "provider registered"
        );
    }
    Ok(seeds.len())
}
