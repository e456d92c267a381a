// src/ingest/types.rs
use anyhow::Result;

use crate::model::{Provider, ProviderContentItem};

/// Fetches one provider feed and maps it into normalized items.
/// Any transport, status or decode failure fails the whole fetch.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_contents(&self, provider: &Provider) -> Result<Vec<ProviderContentItem>>;
    fn name(&self) -> &'static str;
}
