// src/store/rules_file.rs
//! Scoring rules read from a JSON file on every call, so edits apply to the
//! next scoring invocation without a restart.
//!
//! Shape: `{ "video_config": { ... }, "recency_config": { ... } }`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::ScoringRulesStore;

pub const DEFAULT_RULES_PATH: &str = "config/scoring_rules.json";

pub struct JsonFileRulesStore {
    path: PathBuf,
}

impl JsonFileRulesStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ScoringRulesStore for JsonFileRulesStore {
    async fn scoring_rules(&self) -> Result<HashMap<String, Vec<u8>>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading scoring rules from {}", self.path.display()))
            }
        };

        let groups: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing scoring rules in {}", self.path.display()))?;

        let mut out = HashMap::with_capacity(groups.len());
        for (group, payload) in groups {
            let raw = serde_json::to_vec(&payload)
                .with_context(|| format!("re-encoding rule group {group}"))?;
            out.insert(group, raw);
        }
        Ok(out)
    }
}
