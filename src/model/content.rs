// src/model/content.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type tag. Unknown provider values are kept verbatim so scoring can
/// treat them as neutral instead of dropping the item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Video,
    Article,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Video => "video",
            ContentType::Article => "article",
            ContentType::Other(s) => s.as_str(),
        }
    }

    /// Parse a raw provider string. Matching is case-insensitive and trimmed.
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        if t.eq_ignore_ascii_case("video") {
            ContentType::Video
        } else if t.eq_ignore_ascii_case("article") {
            ContentType::Article
        } else {
            ContentType::Other(t.to_ascii_lowercase())
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        ContentType::parse(s)
    }
}

impl Serialize for ContentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ContentType::parse(&s))
    }
}

/// One aggregated piece of content. `(provider_id, provider_content_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub provider_id: i64,
    pub provider_content_id: String,
    pub title: String,
    pub content_type: ContentType,
    pub published_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Engagement metrics for one content row. Missing stats are represented by
/// `ContentStats::empty(id)`, never by an absent value on the read path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentStats {
    pub content_id: i64,
    pub views: i64,
    pub likes: i64,
    pub duration_sec: i32,
    pub reading_time: i32,
    pub reactions: i64,
    pub comments: i64,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl ContentStats {
    pub fn empty(content_id: i64) -> Self {
        Self {
            content_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}
