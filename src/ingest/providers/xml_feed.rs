//! Structured-XML provider adapter.
//!
//! ```xml
//! <feed><items><item>
//!   <id>a1</id><headline>...</headline><type>article</type>
//!   <stats><reading_time>8</reading_time><reactions>40</reactions><duration>2:30</duration></stats>
//!   <publication_date>2024-03-15</publication_date>
//!   <categories><category>news</category></categories>
//! </item></items></feed>
//! ```

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::{Deserialize, Deserializer, Serialize};

use super::{build_http_client, fetch_body, parse_clock_duration};
use crate::ingest::types::ProviderClient;
use crate::model::{Provider, ProviderContentItem};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    items: Items,
}

#[derive(Debug, Default, Deserialize)]
struct Items {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    id: String,
    #[serde(default)]
    headline: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    stats: Stats,
    #[serde(default)]
    publication_date: String,
    #[serde(default)]
    categories: Categories,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct Stats {
    #[serde(deserialize_with = "lenient_int")]
    views: i64,
    #[serde(deserialize_with = "lenient_int")]
    likes: i64,
    duration: String,
    #[serde(deserialize_with = "lenient_int")]
    reading_time: i32,
    #[serde(deserialize_with = "lenient_int")]
    reactions: i64,
    #[serde(deserialize_with = "lenient_int")]
    comments: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Categories {
    #[serde(rename = "category", default)]
    category: Vec<String>,
}

/// Empty elements read as 0; non-numeric text is a decode error.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + Default,
    T::Err: std::fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    let t = raw.trim();
    if t.is_empty() {
        return Ok(T::default());
    }
    t.parse::<T>().map_err(serde::de::Error::custom)
}

/// `YYYY-MM-DD` at midnight UTC; unparseable dates fall back to `now`.
fn parse_publication_date(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

/// Decode a full XML feed body.
pub fn parse_xml_feed(body: &str, now: DateTime<Utc>) -> Result<Vec<ProviderContentItem>> {
    let t0 = Instant::now();
    let feed: Feed = from_str(body).context("decode xml feed")?;

    let mut out = Vec::with_capacity(feed.items.item.len());
    for it in feed.items.item {
        let raw_payload = serde_json::to_vec(&serde_json::json!({
            "id": it.id,
            "headline": it.headline,
            "type": it.kind,
            "stats": it.stats,
            "publication_date": it.publication_date,
            "categories": it.categories.category,
        }))
        .unwrap_or_default();

        out.push(ProviderContentItem {
            provider_content_id: it.id.trim().to_string(),
            title: it.headline,
            content_type: it.kind,
            views: it.stats.views,
            likes: it.stats.likes,
            duration_sec: parse_clock_duration(&it.stats.duration),
            reading_time: it.stats.reading_time,
            reactions: it.stats.reactions,
            comments: it.stats.comments,
            published_at: parse_publication_date(&it.publication_date, now),
            tags: it.categories.category,
            raw_payload,
        });
    }

    histogram!("provider_parse_ms", "format" => "xml").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("provider_items_total", "format" => "xml").increment(out.len() as u64);
    Ok(out)
}

pub struct XmlFeedClient {
    http: reqwest::Client,
}

impl XmlFeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderClient for XmlFeedClient {
    async fn fetch_contents(&self, provider: &Provider) -> Result<Vec<ProviderContentItem>> {
        let body = fetch_body(&self.http, provider).await?;
        let text = String::from_utf8(body)
            .with_context(|| format!("{} xml feed is not utf-8", provider.code))?;
        parse_xml_feed(&text, Utc::now()).with_context(|| format!("parse {} xml feed", provider.code))
    }

    fn name(&self) -> &'static str {
        "xml"
    }
}
