//! API Handlers
//!
//! Each manga handler validates its parameters, asks the policy for a
//! `{key, duration}` pair and hands an upstream fetcher to the cache-aside
//! executor. Validation failures return before the cache layer is touched.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Uri},
    Json,
};
use serde_json::{json, Value};

use crate::cache::{CacheAside, CacheConfig, CachePolicy, CacheStore, Route};
use crate::error::{GatewayError, Result};
use crate::models::{
    normalize_path_segment, Envelope, HealthResponse, RankingKind, RequestParams, StatsResponse,
    StoreStats,
};
use crate::provider::MangaProvider;

/// Request header carrying a client-requested TTL in seconds.
pub const CACHE_EXPIRY_HEADER: &str = "x-cache-expiry";

const HOME_TOP_LIMIT: usize = 10;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: CacheAside,
    pub policy: Arc<CachePolicy>,
    pub provider: Arc<dyn MangaProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CacheStore>,
        policy: CachePolicy,
        provider: Arc<dyn MangaProvider>,
    ) -> Self {
        Self {
            executor: CacheAside::new(store),
            policy: Arc::new(policy),
            provider,
        }
    }
}

type ApiResponse = Result<Json<Envelope<Value>>>;

fn requested_ttl(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CACHE_EXPIRY_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

async fn cached<F, Fut>(state: &AppState, config: CacheConfig, fetcher: F) -> ApiResponse
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    let data = state
        .executor
        .get_or_compute(&config.key, config.duration, fetcher)
        .await?;
    Ok(Json(Envelope::ok(data)))
}

/// `results` array of an upstream listing, optionally cut to `limit`.
fn results(listing: Value, limit: Option<usize>) -> Value {
    let mut items = match listing {
        Value::Object(mut fields) => match fields.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    Value::Array(items)
}

/// Upstream lists chapters newest first; clients get them in reading order.
fn chapters_ascending(mut info: Value) -> Value {
    if let Some(fields) = info.as_object_mut() {
        let chapters = match fields.remove("chapters") {
            Some(Value::Array(mut chapters)) => {
                chapters.reverse();
                chapters
            }
            _ => Vec::new(),
        };
        fields.insert("chapters".to_string(), Value::Array(chapters));
    }
    info
}

// == Manga Routes ==

/// Handler for GET /api/v2/manga
pub async fn providers_handler(State(state): State<AppState>) -> ApiResponse {
    let config = state
        .policy
        .resolve(Route::Providers, &[], &RequestParams::default(), None);
    let name = state.provider.name();
    cached(&state, config, move || async move {
        Ok(json!({ "providers": [name] }))
    })
    .await
}

/// Handler for GET /api/v2/manga/mangahere/info?id=
pub async fn info_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResponse {
    let params = RequestParams::from_query(query.as_deref());
    let id = params.require("id")?.to_string();
    let config = state
        .policy
        .resolve(Route::Info, &[], &params, requested_ttl(&headers));

    let provider = state.provider.clone();
    cached(&state, config, move || async move {
        let info = provider.manga_info(&id).await?;
        Ok(chapters_ascending(info))
    })
    .await
}

/// Handler for GET /api/v2/manga/mangahere/read?chapterId=
pub async fn read_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResponse {
    let params = RequestParams::from_query(query.as_deref());
    let chapter_id = params.require("chapterId")?.to_string();
    let config = state
        .policy
        .resolve(Route::Read, &[], &params, requested_ttl(&headers));

    let provider = state.provider.clone();
    cached(&state, config, move || async move {
        provider.chapter_pages(&chapter_id).await
    })
    .await
}

/// Handler for GET /api/v2/manga/mangahere/rankings?type=
pub async fn rankings_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResponse {
    let params = RequestParams::from_query(query.as_deref());
    let kind = RankingKind::from_params(&params)?;
    let config = state
        .policy
        .resolve(Route::Rankings, &[], &params, requested_ttl(&headers));

    let provider = state.provider.clone();
    cached(&state, config, move || async move { provider.ranking(kind).await }).await
}

/// Handler for GET /api/v2/manga/mangahere/hot
pub async fn hot_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let config = state.policy.resolve(
        Route::Hot,
        &[],
        &RequestParams::default(),
        requested_ttl(&headers),
    );

    let provider = state.provider.clone();
    cached(&state, config, move || async move { provider.hot_releases().await }).await
}

/// Handler for GET /api/v2/manga/mangahere/trending
pub async fn trending_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let config = state.policy.resolve(
        Route::Trending,
        &[],
        &RequestParams::default(),
        requested_ttl(&headers),
    );

    let provider = state.provider.clone();
    cached(&state, config, move || async move { provider.trending().await }).await
}

/// Handler for GET /api/v2/manga/mangahere/recent-updates?page=
pub async fn recent_updates_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResponse {
    let params = RequestParams::from_query(query.as_deref());
    let page = params.page();
    let config = state
        .policy
        .resolve(Route::RecentUpdates, &[], &params, requested_ttl(&headers));

    let provider = state.provider.clone();
    cached(&state, config, move || async move {
        provider.recent_updates(page).await
    })
    .await
}

/// Handler for GET /api/v2/manga/mangahere/home
///
/// Aggregates five upstream calls, so it keeps the long TTL whatever the
/// route default or the client asks for.
pub async fn home_handler(State(state): State<AppState>) -> ApiResponse {
    let config = state
        .policy
        .resolve(Route::Home, &[], &RequestParams::default(), None)
        .with_duration(state.policy.long_ttl());

    let provider = state.provider.clone();
    cached(&state, config, move || async move {
        let (today, weekly, hot, trending, recent) = tokio::try_join!(
            provider.ranking(RankingKind::Day),
            provider.ranking(RankingKind::Week),
            provider.hot_releases(),
            provider.trending(),
            provider.recent_updates(1),
        )?;

        Ok(json!({
            "top10Today": results(today, Some(HOME_TOP_LIMIT)),
            "top10Weekly": results(weekly, Some(HOME_TOP_LIMIT)),
            "hot": results(hot, None),
            "trending": results(trending, Some(HOME_TOP_LIMIT)),
            "recentUpdates": results(recent, None),
        }))
    })
    .await
}

/// Handler for GET /api/v2/manga/mangahere/:query?page=
pub async fn search_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResponse {
    let search = normalize_path_segment(&raw);
    if search.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "search query must not be empty".to_string(),
        ));
    }

    let params = RequestParams::from_query(query.as_deref());
    let page = params.page();
    let config = state.policy.resolve(
        Route::Search,
        &[("query", raw.as_str())],
        &params,
        requested_ttl(&headers),
    );

    let provider = state.provider.clone();
    cached(&state, config, move || async move {
        provider.search(&search, page).await
    })
    .await
}

// == Service Routes ==

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /v
pub async fn version_handler() -> String {
    format!(
        "{}: v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.executor.store().stats().await.map(StoreStats::from);

    Json(StatsResponse {
        store,
        executor: state.executor.stats(),
        in_flight: state.executor.in_flight(),
    })
}

/// Fallback for unmatched routes.
pub async fn not_found_handler(uri: Uri) -> GatewayError {
    GatewayError::NotFound(format!("Route {} not found", uri.path()))
}
