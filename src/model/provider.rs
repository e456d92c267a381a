// src/model/provider.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared transport format of a provider feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderFormat {
    Json,
    Xml,
    Unknown(String),
}

impl ProviderFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => ProviderFormat::Json,
            "xml" => ProviderFormat::Xml,
            other => ProviderFormat::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderFormat::Json => "json",
            ProviderFormat::Xml => "xml",
            ProviderFormat::Unknown(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ProviderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ProviderFormat::parse(&s))
    }
}

/// External feed descriptor. The format drives adapter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub format: ProviderFormat,
    pub base_url: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Adapter output: one feed entry mapped into the normalized shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderContentItem {
    pub provider_content_id: String,
    pub title: String,
    /// Raw type string as sent by the provider.
    pub content_type: String,
    pub views: i64,
    pub likes: i64,
    pub duration_sec: i32,
    pub reading_time: i32,
    pub reactions: i64,
    pub comments: i64,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Per-item payload kept for audit/debugging only.
    pub raw_payload: Vec<u8>,
}
