use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::{PaginationConfig, RateLimitConfig};
use crate::model::ContentType;
use crate::pagination;
use crate::search::{ContentWithScore, SearchPage, SearchRequest, SearchService, SortMode};

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub pagination: PaginationConfig,
    pub rate_limit: RateLimitConfig,
}

/// `/health` stays outside the rate limit.
pub fn router(state: AppState) -> Router {
    let mut api: Router<AppState> = Router::new()
        .route("/api/v1/contents", get(search_contents))
        .route("/api/v1/contents/{id}", get(get_content))
        .route("/api/v1/metadata", get(metadata));
    if let Some(limiter) = build_limiter(&state.rate_limit) {
        api = api.route_layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    api.route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn build_limiter(cfg: &RateLimitConfig) -> Option<Arc<DefaultDirectRateLimiter>> {
    let rps = NonZeroU32::new(cfg.rps)?;
    let burst = NonZeroU32::new(cfg.burst).unwrap_or(rps);
    Some(Arc::new(RateLimiter::direct(
        Quota::per_second(rps).allow_burst(burst),
    )))
}

async fn rate_limit(
    State(limiter): State<Arc<DefaultDirectRateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.check().is_err() {
        counter!("http_rate_limited_total").increment(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                error: "rate limit exceeded".into(),
            }),
        )
            .into_response();
    }
    next.run(req).await
}

/// Internal failures map to 500 with a short message; details go to the log.
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: "internal error".into(),
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    #[serde(default, rename = "type")]
    content_type: String,
    #[serde(default)]
    sort: String,
    page: Option<i64>,
    page_size: Option<i64>,
}

/// `""` and `"all"` mean no type filter.
fn type_filter(raw: &str) -> Option<ContentType> {
    let t = raw.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(ContentType::parse(t))
    }
}

async fn search_contents(
    State(state): State<AppState>,
    Query(q): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let req = SearchRequest {
        query: q.query.trim().to_string(),
        content_type: type_filter(&q.content_type),
        sort: SortMode::parse(&q.sort),
        pagination: pagination::normalize(q.page, q.page_size, &state.pagination),
    };
    Ok(Json(state.search.search(&req).await?))
}

async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.search.get_content(id).await? {
        Some(item) => Ok(Json::<ContentWithScore>(item).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("content {id} not found"),
            }),
        )
            .into_response()),
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MetaOption {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PaginationMeta {
    pub default_page: i64,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub content_types: Vec<MetaOption>,
    pub sort_options: Vec<MetaOption>,
    pub pagination: PaginationMeta,
}

pub fn metadata_for(cfg: &PaginationConfig) -> Metadata {
    let content_types = [("all", "All"), ("video", "Video"), ("article", "Article")]
        .into_iter()
        .map(|(id, name)| MetaOption {
            id: id.into(),
            display_name: name.into(),
        })
        .collect();
    let sort_options = SortMode::ALL
        .iter()
        .map(|m| MetaOption {
            id: m.as_str().into(),
            display_name: m.display_name().into(),
        })
        .collect();
    Metadata {
        content_types,
        sort_options,
        pagination: PaginationMeta {
            default_page: cfg.default_page,
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
        },
    }
}

async fn metadata(State(state): State<AppState>) -> Json<Metadata> {
    Json(metadata_for(&state.pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_empty_mean_no_filter() {
        assert_eq!(type_filter(""), None);
        assert_eq!(type_filter(" ALL "), None);
        assert_eq!(type_filter("video"), Some(ContentType::Video));
    }

    #[test]
    fn zero_rps_disables_limiter() {
        assert!(build_limiter(&RateLimitConfig { rps: 0, burst: 10 }).is_none());
        let limiter = build_limiter(&RateLimitConfig { rps: 1, burst: 0 }).unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err(), "burst 0 falls back to rps");
    }

    #[test]
    fn metadata_lists_sort_modes() {
        let m = metadata_for(&PaginationConfig::default());
        let ids: Vec<&str> = m.sort_options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["score_desc", "score_asc", "recency_desc"]);
        assert_eq!(m.content_types.len(), 3);
        assert_eq!(m.pagination.max_page_size, 50);
    }
}
