//! Circuit breaker for provider fetches.
//!
//! States:
//! - **closed**: calls pass through; outcomes are counted per generation and the
//!   counts reset every `interval` (if non-zero).
//! - **open**: calls are rejected without touching the wrapped client until
//!   `timeout` elapses.
//! - **half-open**: up to `max_requests` trial calls; the first success closes
//!   the breaker, any failure reopens it.
//!
//! Trips from closed when a generation has at least 3 requests and a failure
//! ratio of at least 0.6. State lives behind a mutex that is never held across
//! the wrapped call.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::ingest::types::ProviderClient;
use crate::model::{Provider, ProviderContentItem};

const TRIP_MIN_REQUESTS: u32 = 3;
const TRIP_FAILURE_RATIO: f64 = 0.6;
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Call rejected by the breaker; the wrapped client was not invoked.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakerError {
    #[error("circuit breaker '{0}' is open")]
    Open(String),
    #[error("circuit breaker '{0}' is half-open and has no trial slots left")]
    TooManyRequests(String),
}

#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub name: String,
    /// Concurrent trial calls allowed while half-open.
    pub max_requests: u32,
    /// Rolling window for closed-state counts; zero never resets.
    pub interval: Duration,
    /// Time spent open before probing again.
    pub timeout: Duration,
}

impl BreakerSettings {
    pub fn from_config(cfg: &CircuitBreakerConfig, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_requests: cfg.max_requests,
            interval: Duration::from_secs(cfg.interval_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    fn ready_to_trip(&self) -> bool {
        self.requests >= TRIP_MIN_REQUESTS
            && f64::from(self.total_failures) / f64::from(self.requests) >= TRIP_FAILURE_RATIO
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    max_requests: u32,
    interval: Duration,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        let interval = settings.interval;
        Self {
            name: settings.name,
            max_requests: settings.max_requests.max(1),
            interval,
            timeout: if settings.timeout.is_zero() {
                DEFAULT_OPEN_TIMEOUT
            } else {
                settings.timeout
            },
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry: (!interval.is_zero()).then(|| Instant::now() + interval),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, applying any transition due to elapsed time.
    pub fn state(&self) -> CircuitState {
        let mut g = self.lock();
        self.refresh(&mut g, Instant::now());
        g.state
    }

    pub fn counts(&self) -> Counts {
        let mut g = self.lock();
        self.refresh(&mut g, Instant::now());
        g.counts
    }

    /// Run `f` under the breaker. Rejections return [`BreakerError`] without
    /// calling `f`.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = self.before_request()?;
        let result = f().await;
        self.after_request(generation, result.is_ok());
        result
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn before_request(&self) -> Result<u64, BreakerError> {
        let mut g = self.lock();
        self.refresh(&mut g, Instant::now());
        match g.state {
            CircuitState::Open => return Err(BreakerError::Open(self.name.clone())),
            CircuitState::HalfOpen if g.counts.requests >= self.max_requests => {
                return Err(BreakerError::TooManyRequests(self.name.clone()))
            }
            _ => {}
        }
        g.counts.on_request();
        Ok(g.generation)
    }

    fn after_request(&self, before: u64, success: bool) {
        let now = Instant::now();
        let mut g = self.lock();
        self.refresh(&mut g, now);
        // Outcome belongs to a generation that has already been reset.
        if g.generation != before {
            return;
        }

        match (g.state, success) {
            (CircuitState::Closed, true) => g.counts.on_success(),
            (CircuitState::Closed, false) => {
                g.counts.on_failure();
                if g.counts.ready_to_trip() {
                    self.transition(&mut g, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                g.counts.on_success();
                self.transition(&mut g, CircuitState::Closed, now);
            }
            (CircuitState::HalfOpen, false) => {
                g.counts.on_failure();
                self.transition(&mut g, CircuitState::Open, now);
            }
            (CircuitState::Open, _) => {}
        }
    }

    fn refresh(&self, g: &mut Inner, now: Instant) {
        match g.state {
            CircuitState::Closed => {
                if g.expiry.is_some_and(|e| e <= now) {
                    self.new_generation(g, now);
                }
            }
            CircuitState::Open => {
                if g.expiry.is_some_and(|e| e <= now) {
                    self.transition(g, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
    }

    fn transition(&self, g: &mut Inner, to: CircuitState, now: Instant) {
        if g.state == to {
            return;
        }
        let from = g.state;
        g.state = to;
        self.new_generation(g, now);

        counter!("breaker_transitions_total", "to" => to.as_str()).increment(1);
        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = from.as_str(),
                "circuit breaker opened"
            ),
            _ => tracing::info!(
                breaker = %self.name,
                from = from.as_str(),
                to = to.as_str(),
                "circuit breaker state change"
            ),
        }
    }

    fn new_generation(&self, g: &mut Inner, now: Instant) {
        g.generation = g.generation.wrapping_add(1);
        g.counts = Counts::default();
        g.expiry = match g.state {
            CircuitState::Closed => (!self.interval.is_zero()).then(|| now + self.interval),
            CircuitState::Open => Some(now + self.timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

/// A provider client guarded by its own circuit breaker.
pub struct ResilientProviderClient {
    inner: Arc<dyn ProviderClient>,
    breaker: CircuitBreaker,
}

impl ResilientProviderClient {
    pub fn new(inner: Arc<dyn ProviderClient>, settings: BreakerSettings) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(settings),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl ProviderClient for ResilientProviderClient {
    async fn fetch_contents(&self, provider: &Provider) -> Result<Vec<ProviderContentItem>> {
        self.breaker
            .call(|| self.inner.fetch_contents(provider))
            .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
