//! API Routes
//!
//! Configures the Axum router: manga routes under `/api/v2`, service routes
//! at the root, a JSON 404 fallback, and the response middleware.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, home_handler, hot_handler, info_handler, not_found_handler,
    providers_handler, rankings_handler, read_handler, recent_updates_handler, search_handler,
    stats_handler, trending_handler, version_handler, AppState,
};
use crate::config::Config;

/// Base path of the versioned API.
pub const BASE_PATH: &str = "/api/v2";

const FALLBACK_CACHE_CONTROL: &str = "s-maxage=60, stale-while-revalidate=30";

/// `Cache-Control` value advertised to shared caches.
pub fn cache_control_value(config: &Config) -> HeaderValue {
    let value = format!(
        "s-maxage={}, stale-while-revalidate={}",
        config.s_maxage, config.stale_while_revalidate
    );
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CACHE_CONTROL))
}

async fn cache_control(
    State(value): State<HeaderValue>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(header::CACHE_CONTROL, value);
    response
}

fn manga_routes() -> Router<AppState> {
    Router::new()
        .route("/manga", get(providers_handler))
        .route("/manga/mangahere/info", get(info_handler))
        .route("/manga/mangahere/read", get(read_handler))
        .route("/manga/mangahere/rankings", get(rankings_handler))
        .route("/manga/mangahere/hot", get(hot_handler))
        .route("/manga/mangahere/trending", get(trending_handler))
        .route("/manga/mangahere/recent-updates", get(recent_updates_handler))
        .route("/manga/mangahere/home", get(home_handler))
        .route("/manga/mangahere/:query", get(search_handler))
}

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Cache-Control: CDN hints on every response
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(BASE_PATH, manga_routes())
        .route("/health", get(health_handler))
        .route("/v", get(version_handler))
        .route("/stats", get(stats_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(
            cache_control_value(config),
            cache_control,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
