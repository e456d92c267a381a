// src/store/mod.rs
//! Storage ports consumed by the sync orchestrator and the read path.
//!
//! Each trait is a capability boundary; concrete adapters live in submodules
//! and tests substitute hand-written fakes. Bulk writes are all-or-nothing.

pub mod memory;
pub mod rules_file;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Content, ContentStats, ContentType, Provider, Tag};
use crate::pagination::Pagination;

/// Errors a store adapter reports by kind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-side filters. `content_type == None` means all types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub query: String,
    pub content_type: Option<ContentType>,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upsert on `(provider_id, provider_content_id)` inside one transaction.
    async fn upsert_contents(&self, contents: &[Content]) -> Result<()>;
    /// All saved contents of one provider, used to resolve internal IDs.
    async fn find_by_provider(&self, provider_id: i64) -> Result<Vec<Content>>;
    /// Filtered page plus the total match count independent of the page slice.
    async fn search(
        &self,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> Result<(Vec<Content>, i64)>;
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Content>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Content>>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Upsert keyed by content ID inside one transaction.
    async fn upsert_stats(&self, stats: &[ContentStats]) -> Result<()>;
    async fn get_by_content_ids(&self, ids: &[i64]) -> Result<HashMap<i64, ContentStats>>;
    async fn get_by_content_id(&self, id: i64) -> Result<Option<ContentStats>>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    /// Get-or-create by canonical name. Output follows input order.
    async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>>;
    /// Replace the full assignment set of a content item atomically.
    async fn replace_content_tags(&self, content_id: i64, tag_ids: &[i64]) -> Result<()>;
    async fn tags_for_content(&self, content_id: i64) -> Result<Vec<Tag>>;
}

#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<Provider>>;
    async fn get_by_code(&self, code: &str) -> Result<Option<Provider>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Provider>>;
    /// Insert or update by code; returns the stored record.
    async fn upsert(&self, provider: Provider) -> Result<Provider>;
}

/// Named rule groups → raw serialized payloads.
#[async_trait]
pub trait ScoringRulesStore: Send + Sync {
    async fn scoring_rules(&self) -> Result<HashMap<String, Vec<u8>>>;
}
