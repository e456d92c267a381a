//! Structured-JSON provider adapter.
//!
//! Envelope:
//! ```json
//! { "contents": [ { "id": "v1", "title": "...", "type": "video",
//!     "metrics": { "views": 10, "likes": 1, "duration": "754" },
//!     "published_at": "2024-03-15T10:00:00Z", "tags": ["go"] } ] }
//! ```

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use super::{build_http_client, fetch_body, parse_leading_seconds};
use crate::ingest::types::ProviderClient;
use crate::model::{Provider, ProviderContentItem};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    contents: Vec<serde_json::Value>,
}

/// Some feeds send numeric IDs and durations; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Item {
    id: TextOrNumber,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    metrics: Metrics,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metrics {
    views: i64,
    likes: i64,
    duration: Option<TextOrNumber>,
    reading_time: i32,
    reactions: i64,
    comments: i64,
}

/// Decode a full JSON feed body. One malformed item fails the whole feed.
pub fn parse_json_feed(body: &[u8]) -> Result<Vec<ProviderContentItem>> {
    let t0 = Instant::now();
    let envelope: Envelope = serde_json::from_slice(body).context("decode json envelope")?;

    let mut out = Vec::with_capacity(envelope.contents.len());
    for (idx, raw) in envelope.contents.into_iter().enumerate() {
        let raw_payload = serde_json::to_vec(&raw).unwrap_or_default();
        let item: Item =
            serde_json::from_value(raw).with_context(|| format!("decode json item #{idx}"))?;

        let duration = item
            .metrics
            .duration
            .map(|d| parse_leading_seconds(&d.into_text()))
            .unwrap_or(0);

        out.push(ProviderContentItem {
            provider_content_id: item.id.into_text(),
            title: item.title,
            content_type: item.kind,
            views: item.metrics.views,
            likes: item.metrics.likes,
            duration_sec: duration,
            reading_time: item.metrics.reading_time,
            reactions: item.metrics.reactions,
            comments: item.metrics.comments,
            published_at: item.published_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            tags: item.tags,
            raw_payload,
        });
    }

    histogram!("provider_parse_ms", "format" => "json").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("provider_items_total", "format" => "json").increment(out.len() as u64);
    Ok(out)
}

pub struct JsonFeedClient {
    http: reqwest::Client,
}

impl JsonFeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderClient for JsonFeedClient {
    async fn fetch_contents(&self, provider: &Provider) -> Result<Vec<ProviderContentItem>> {
        let body = fetch_body(&self.http, provider).await?;
        parse_json_feed(&body).with_context(|| format!("parse {} json feed", provider.code))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
