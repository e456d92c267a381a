// src/store/memory.rs
//! In-process store adapters. Every write takes the adapter's lock once, so a
//! bulk call is applied entirely or not at all.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{
    ContentStore, ProviderRegistry, ScoringRulesStore, SearchFilters, StatsStore, StoreError,
    TagStore,
};
use crate::model::{Content, ContentStats, Provider, Tag};
use crate::pagination::Pagination;

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!(StoreError::Unavailable("lock poisoned".into()))
}

// ------------------------------------------------------------
// Contents
// ------------------------------------------------------------

#[derive(Default)]
struct ContentState {
    next_id: i64,
    rows: BTreeMap<i64, Content>,
    by_key: HashMap<(i64, String), i64>,
}

#[derive(Default)]
pub struct MemoryContentStore {
    inner: Mutex<ContentState>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches(content: &Content, filters: &SearchFilters) -> bool {
    if !content.is_active {
        return false;
    }
    if let Some(kind) = &filters.content_type {
        if &content.content_type != kind {
            return false;
        }
    }
    let q = filters.query.trim();
    q.is_empty() || content.title.to_lowercase().contains(&q.to_lowercase())
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn upsert_contents(&self, contents: &[Content]) -> Result<()> {
        let now = Utc::now();
        let mut g = self.inner.lock().map_err(poisoned)?;
        for c in contents {
            let key = (c.provider_id, c.provider_content_id.clone());
            match g.by_key.get(&key).copied() {
                Some(id) => {
                    if let Some(row) = g.rows.get_mut(&id) {
                        row.title = c.title.clone();
                        row.content_type = c.content_type.clone();
                        row.published_at = c.published_at;
                        row.is_active = c.is_active;
                        row.updated_at = now;
                    }
                }
                None => {
                    g.next_id += 1;
                    let id = g.next_id;
                    let row = Content {
                        id,
                        created_at: now,
                        updated_at: now,
                        ..c.clone()
                    };
                    g.rows.insert(id, row);
                    g.by_key.insert(key, id);
                }
            }
        }
        Ok(())
    }

    async fn find_by_provider(&self, provider_id: i64) -> Result<Vec<Content>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.rows
            .values()
            .filter(|c| c.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> Result<(Vec<Content>, i64)> {
        let g = self.inner.lock().map_err(poisoned)?;
        let mut hits: Vec<&Content> = g.rows.values().filter(|c| matches(c, filters)).collect();
        // Newest first, ID as tie-break keeps pages stable.
        hits.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(a.id.cmp(&b.id)));

        let total = hits.len() as i64;
        let page = hits
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Content>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(ids.iter().filter_map(|id| g.rows.get(id).cloned()).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Content>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.rows.get(&id).cloned())
    }
}

// ------------------------------------------------------------
// Stats
// ------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStatsStore {
    inner: Mutex<HashMap<i64, ContentStats>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn upsert_stats(&self, stats: &[ContentStats]) -> Result<()> {
        let now = Utc::now();
        let mut g = self.inner.lock().map_err(poisoned)?;
        for s in stats {
            let mut row = s.clone();
            row.last_sync_at = Some(now);
            g.insert(s.content_id, row);
        }
        Ok(())
    }

    async fn get_by_content_ids(&self, ids: &[i64]) -> Result<HashMap<i64, ContentStats>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| g.get(id).map(|s| (*id, s.clone())))
            .collect())
    }

    async fn get_by_content_id(&self, id: i64) -> Result<Option<ContentStats>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.get(&id).cloned())
    }
}

// ------------------------------------------------------------
// Tags
// ------------------------------------------------------------

#[derive(Default)]
struct TagState {
    next_id: i64,
    by_name: HashMap<String, Tag>,
    assignments: HashMap<i64, Vec<i64>>,
}

#[derive(Default)]
pub struct MemoryTagStore {
    inner: Mutex<TagState>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>> {
        let mut g = self.inner.lock().map_err(poisoned)?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            if let Some(tag) = g.by_name.get(name) {
                out.push(tag.clone());
                continue;
            }
            g.next_id += 1;
            let tag = Tag {
                id: g.next_id,
                name: name.clone(),
            };
            g.by_name.insert(name.clone(), tag.clone());
            out.push(tag);
        }
        Ok(out)
    }

    async fn replace_content_tags(&self, content_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut g = self.inner.lock().map_err(poisoned)?;
        if let Some(missing) = tag_ids
            .iter()
            .find(|id| !g.by_name.values().any(|t| t.id == **id))
        {
            return Err(StoreError::NotFound {
                entity: "tag",
                key: missing.to_string(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        let ids: Vec<i64> = tag_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        g.assignments.insert(content_id, ids);
        Ok(())
    }

    async fn tags_for_content(&self, content_id: i64) -> Result<Vec<Tag>> {
        let g = self.inner.lock().map_err(poisoned)?;
        let Some(ids) = g.assignments.get(&content_id) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Tag> = g
            .by_name
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.id);
        Ok(out)
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

#[derive(Default)]
struct ProviderState {
    next_id: i64,
    rows: BTreeMap<i64, Provider>,
}

#[derive(Default)]
pub struct MemoryProviderRegistry {
    inner: Mutex<ProviderState>,
}

impl MemoryProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderRegistry for MemoryProviderRegistry {
    async fn list_enabled(&self) -> Result<Vec<Provider>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.rows.values().filter(|p| p.is_enabled).cloned().collect())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Provider>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.rows.values().find(|p| p.code == code).cloned())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Provider>> {
        let g = self.inner.lock().map_err(poisoned)?;
        Ok(g.rows.get(&id).cloned())
    }

    async fn upsert(&self, provider: Provider) -> Result<Provider> {
        let now = Utc::now();
        let mut g = self.inner.lock().map_err(poisoned)?;
        let existing = g
            .rows
            .values()
            .find(|p| p.code == provider.code)
            .map(|p| (p.id, p.created_at));

        let stored = match existing {
            Some((id, created_at)) => Provider {
                id,
                created_at,
                updated_at: now,
                ..provider
            },
            None => {
                g.next_id += 1;
                Provider {
                    id: g.next_id,
                    created_at: now,
                    updated_at: now,
                    ..provider
                }
            }
        };
        g.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

// ------------------------------------------------------------
// Scoring rules
// ------------------------------------------------------------

/// Rules held in memory; groups can be changed at runtime.
#[derive(Default)]
pub struct MemoryRulesStore {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryRulesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&self, group: &str, payload: &str) {
        if let Ok(mut g) = self.inner.write() {
            g.insert(group.to_string(), payload.as_bytes().to_vec());
        }
    }
}

#[async_trait]
impl ScoringRulesStore for MemoryRulesStore {
    async fn scoring_rules(&self) -> Result<HashMap<String, Vec<u8>>> {
        let g = self.inner.read().map_err(poisoned)?;
        Ok(g.clone())
    }
}
