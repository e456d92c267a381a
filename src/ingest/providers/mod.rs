// src/ingest/providers/mod.rs
pub mod json_feed;
pub mod xml_feed;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Provider;

/// Bound on every provider call so a stalled feed cannot hang a sync run.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("search-aggregator/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout.min(Duration::from_secs(4)))
        .timeout(timeout)
        .build()
        .context("building provider http client")
}

/// GET the provider's base URL. Non-2xx statuses are errors.
pub(crate) async fn fetch_body(http: &reqwest::Client, provider: &Provider) -> Result<Vec<u8>> {
    let resp = http
        .get(&provider.base_url)
        .send()
        .await
        .with_context(|| format!("fetch {} feed from {}", provider.code, provider.base_url))?;

    let status = resp.status();
    if !status.is_success() {
        bail!(
            "provider {} returned unexpected status {}",
            provider.code,
            status.as_u16()
        );
    }

    let body = resp
        .bytes()
        .await
        .with_context(|| format!("read {} response body", provider.code))?;
    Ok(body.to_vec())
}

static RE_LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("leading int regex"));
static RE_MIN_SEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+):([+-]?\d+)").expect("mm:ss regex"));

/// Leading integer of a free-form string ("120", "95s"); anything else is 0.
pub(crate) fn parse_leading_seconds(raw: &str) -> i32 {
    RE_LEADING_INT
        .captures(raw)
        .and_then(|c| c[1].parse::<i32>().ok())
        .unwrap_or(0)
}

/// "MM:SS" → minutes*60 + seconds, else a bare seconds count.
pub(crate) fn parse_clock_duration(raw: &str) -> i32 {
    if let Some(c) = RE_MIN_SEC.captures(raw) {
        if let (Ok(m), Ok(s)) = (c[1].parse::<i32>(), c[2].parse::<i32>()) {
            return m.saturating_mul(60).saturating_add(s);
        }
    }
    parse_leading_seconds(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_seconds_is_lenient() {
        assert_eq!(parse_leading_seconds("120"), 120);
        assert_eq!(parse_leading_seconds(" 95s"), 95);
        assert_eq!(parse_leading_seconds(""), 0);
        assert_eq!(parse_leading_seconds("PT5M"), 0);
    }

    #[test]
    fn clock_duration_handles_both_shapes() {
        assert_eq!(parse_clock_duration("2:30"), 150);
        assert_eq!(parse_clock_duration("15:00"), 900);
        assert_eq!(parse_clock_duration("300"), 300);
        assert_eq!(parse_clock_duration(""), 0);
        assert_eq!(parse_clock_duration("abc"), 0);
    }
}
