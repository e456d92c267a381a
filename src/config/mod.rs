// src/config/mod.rs
//! Application configuration.
//!
//! Loaded from TOML: `$APP_CONFIG_PATH` if set, else `config/app.toml`, else
//! built-in defaults. Every section and field is optional.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::model::{ProviderFormat, ScoringConfig};
use crate::store::rules_file::DEFAULT_RULES_PATH;

const ENV_PATH: &str = "APP_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/app.toml";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const BREAKER_TRIP_RUNS: u64 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub pagination: PaginationConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub rate_limit: RateLimitConfig,
    pub scoring: ScoringSection,
    pub providers: Vec<ProviderSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".into(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.http_addr
            .parse()
            .with_context(|| format!("invalid server.http_addr '{}'", self.http_addr))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: i64,
    pub provider_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS as i64,
            provider_timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    /// Non-positive values fall back to 60s.
    pub fn interval(&self) -> Duration {
        positive_secs(self.interval_secs, DEFAULT_SYNC_INTERVAL_SECS)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS as i64,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Non-positive values fall back to one hour.
    pub fn ttl(&self) -> Duration {
        positive_secs(self.ttl_secs, DEFAULT_CACHE_TTL_SECS)
    }
}

fn positive_secs(value: i64, fallback: u64) -> Duration {
    if value <= 0 {
        Duration::from_secs(fallback)
    } else {
        Duration::from_secs(value as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page: i64,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Prefix for per-provider breaker names.
    pub name: String,
    pub max_requests: u32,
    /// Closed-state counting window; 0 keeps counts until the state changes.
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "provider".into(),
            max_requests: 3,
            interval_secs: 0,
            timeout_secs: 300,
        }
    }
}

/// Token bucket applied to the `/api/v1` routes. `rps = 0` disables it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub rps: u32,
    /// Bucket size; 0 means `rps`.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { rps: 100, burst: 200 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    #[serde(flatten)]
    pub defaults: ScoringConfig,
    pub rules_path: PathBuf,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            defaults: ScoringConfig::default(),
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
        }
    }
}

/// A provider registered at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSeed {
    pub code: String,
    pub name: String,
    pub format: ProviderFormat,
    pub base_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the config file via env var + fallbacks:
    /// 1) $APP_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_PATH} points to non-existent path {}", pb.display()));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        // The breaker sees one fetch per provider per sync run, so a window
        // shorter than three runs can never reach the trip threshold.
        let sync_secs = self.sync.interval().as_secs();
        let window = self.circuit_breaker.interval_secs;
        if window > 0 && window < BREAKER_TRIP_RUNS * sync_secs {
            return Err(anyhow!(
                "circuit_breaker.interval_secs ({window}) must be 0 or at least {} ({BREAKER_TRIP_RUNS} sync intervals)",
                BREAKER_TRIP_RUNS * sync_secs
            ));
        }
        if self.circuit_breaker.timeout_secs <= sync_secs {
            tracing::warn!(
                timeout_secs = self.circuit_breaker.timeout_secs,
                sync_interval_secs = sync_secs,
                "breaker open timeout does not exceed the sync interval; every run will retry an open provider"
            );
        }
        for p in &self.providers {
            if p.code.trim().is_empty() {
                return Err(anyhow!("provider seed with empty code"));
            }
            if p.base_url.trim().is_empty() {
                return Err(anyhow!("provider '{}' has empty base_url", p.code));
            }
        }
        Ok(())
    }
}
