// src/pagination.rs
//! 1-indexed pagination and the bounds applied at the API edge.

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// `(page - 1) * page_size`; page 0 is treated as page 1.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Apply defaults and the max page size to raw request values.
pub fn normalize(page: Option<i64>, page_size: Option<i64>, cfg: &PaginationConfig) -> Pagination {
    let default_page = if cfg.default_page > 0 { cfg.default_page } else { 1 };
    let default_size = if cfg.default_page_size > 0 {
        cfg.default_page_size
    } else {
        10
    };
    let max_size = if cfg.max_page_size > 0 {
        cfg.max_page_size
    } else {
        default_size
    };

    let page = page.filter(|p| *p > 0).unwrap_or(default_page);
    let size = page_size
        .filter(|s| *s > 0)
        .unwrap_or(default_size)
        .min(max_size);

    Pagination::new(clamp_u32(page), clamp_u32(size))
}

fn clamp_u32(v: i64) -> u32 {
    u32::try_from(v.max(1)).unwrap_or(u32::MAX)
}
