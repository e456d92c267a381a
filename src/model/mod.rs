// src/model/mod.rs
//! Normalized entities shared by ingestion and the read path.

pub mod content;
pub mod provider;
pub mod score;

pub use content::{Content, ContentStats, ContentType, Tag};
pub use provider::{Provider, ProviderContentItem, ProviderFormat};
pub use score::{ScoreComponents, ScoringConfig};
