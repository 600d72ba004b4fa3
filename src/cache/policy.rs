//! Cache Policy Resolver
//!
//! Turns an inbound request into the `{key, duration}` pair the executor
//! consumes. Keys depend only on the route template and the normalized
//! parameters that route reads, so parameter order, percent-encoding and
//! unrelated query parameters never split one resource over several keys.
//! Durations come from a per-route table.

use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::models::{normalize_path_segment, RequestParams};

// == Route ==
/// Cacheable routes of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Providers,
    Info,
    Read,
    Rankings,
    Hot,
    Trending,
    RecentUpdates,
    Home,
    Search,
}

impl Route {
    /// Route template, relative to the API base path.
    pub fn template(self) -> &'static str {
        match self {
            Route::Providers => "/manga",
            Route::Info => "/manga/mangahere/info",
            Route::Read => "/manga/mangahere/read",
            Route::Rankings => "/manga/mangahere/rankings",
            Route::Hot => "/manga/mangahere/hot",
            Route::Trending => "/manga/mangahere/trending",
            Route::RecentUpdates => "/manga/mangahere/recent-updates",
            Route::Home => "/manga/mangahere/home",
            Route::Search => "/manga/mangahere/:query",
        }
    }

    /// Query parameters that select the resource on this route.
    fn query_params(self) -> &'static [&'static str] {
        match self {
            Route::Info => &["id"],
            Route::Read => &["chapterId"],
            Route::Rankings => &["type"],
            Route::RecentUpdates | Route::Search => &["page"],
            Route::Providers | Route::Hot | Route::Trending | Route::Home => &[],
        }
    }
}

/// Normalized value of `name`, with route defaults applied.
fn normalized(name: &str, params: &RequestParams) -> Option<String> {
    match name {
        "page" => Some(params.page().to_string()),
        "type" => Some(params.get("type").unwrap_or("total").to_string()),
        other => params.get(other).map(str::to_string),
    }
}

// == TTL Class ==
/// Duration class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Listings and rankings; short-lived and client-adjustable
    Default,
    /// Detail and chapter content; rarely changes upstream
    Long,
    /// Never stored
    Bypass,
}

// == Cache Config ==
/// Cache key and duration for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub key: String,
    /// Seconds; 0 means do not cache
    pub duration: u64,
}

impl CacheConfig {
    /// Replaces the duration for handlers whose cost profile differs from
    /// their route default.
    pub fn with_duration(self, duration: u64) -> Self {
        Self { duration, ..self }
    }
}

// == Cache Policy ==
/// Per-route TTL table plus key derivation.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    default_ttl: u64,
    long_ttl: u64,
    classes: HashMap<Route, TtlClass>,
}

impl CachePolicy {
    /// Empty table: every route uses the default TTL.
    pub fn new(default_ttl: u64, long_ttl: u64) -> Self {
        Self {
            default_ttl,
            long_ttl,
            classes: HashMap::new(),
        }
    }

    /// Standard table for the manga routes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl, config.long_ttl)
            .with_class(Route::Providers, TtlClass::Bypass)
            .with_class(Route::Info, TtlClass::Long)
            .with_class(Route::Read, TtlClass::Long)
    }

    pub fn with_class(mut self, route: Route, class: TtlClass) -> Self {
        self.classes.insert(route, class);
        self
    }

    pub fn class_of(&self, route: Route) -> TtlClass {
        self.classes.get(&route).copied().unwrap_or(TtlClass::Default)
    }

    pub fn long_ttl(&self) -> u64 {
        self.long_ttl
    }

    /// Duration for `route`. A client-requested TTL only replaces the
    /// default class, and never exceeds the long TTL.
    pub fn ttl_for(&self, route: Route, requested: Option<u64>) -> u64 {
        match self.class_of(route) {
            TtlClass::Default => requested.map_or(self.default_ttl, |ttl| ttl.min(self.long_ttl)),
            TtlClass::Long => self.long_ttl,
            TtlClass::Bypass => 0,
        }
    }

    // == Resolve ==
    /// Derives the cache config for a request.
    ///
    /// `path` holds the route's path parameters as extracted by the router;
    /// the router has already percent-decoded them, so they are only trimmed.
    pub fn resolve(
        &self,
        route: Route,
        path: &[(&str, &str)],
        params: &RequestParams,
        requested_ttl: Option<u64>,
    ) -> CacheConfig {
        let mut parts: BTreeMap<&str, String> = BTreeMap::new();
        for (name, raw) in path {
            parts.insert(*name, normalize_path_segment(raw));
        }
        for name in route.query_params() {
            if let Some(value) = normalized(name, params) {
                parts.insert(*name, value);
            }
        }

        let query = parts
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        CacheConfig {
            key: format!("{}?{}", route.template(), query),
            duration: self.ttl_for(route, requested_ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CachePolicy {
        CachePolicy::from_config(&Config::default())
    }

    fn params(raw: &str) -> RequestParams {
        RequestParams::from_query(Some(raw))
    }

    #[test]
    fn test_key_includes_template_and_params() {
        let config = policy().resolve(Route::Info, &[], &params("id=berserk"), None);
        assert_eq!(config.key, "/manga/mangahere/info?id=berserk");
        assert_eq!(config.duration, 43_200);
    }

    #[test]
    fn test_key_ignores_order_and_unrelated_params() {
        let p = policy();
        let a = p.resolve(Route::Info, &[], &params("id=one%20piece&lang=en"), None);
        let b = p.resolve(Route::Info, &[], &params("_=1712&id=one+piece"), None);
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn test_key_applies_defaults() {
        let p = policy();
        let implicit = p.resolve(Route::Rankings, &[], &params(""), None);
        let explicit = p.resolve(Route::Rankings, &[], &params("type=total"), None);
        assert_eq!(implicit.key, explicit.key);

        let bad_page = p.resolve(Route::RecentUpdates, &[], &params("page=abc"), None);
        let first = p.resolve(Route::RecentUpdates, &[], &params("page=1"), None);
        assert_eq!(bad_page.key, first.key);
        assert_ne!(
            first.key,
            p.resolve(Route::RecentUpdates, &[], &params("page=2"), None).key
        );
    }

    #[test]
    fn test_search_key_trims_path() {
        let p = policy();
        let a = p.resolve(Route::Search, &[("query", "one piece")], &params(""), None);
        let b = p.resolve(Route::Search, &[("query", " one piece ")], &params("page=1"), None);
        assert_eq!(a.key, b.key);
        assert_eq!(a.key, "/manga/mangahere/:query?page=1&query=one%20piece");
    }

    #[test]
    fn test_search_key_keeps_plus_and_percent_literal() {
        let p = policy();
        let plus = p.resolve(Route::Search, &[("query", "c++")], &params(""), None);
        let bare = p.resolve(Route::Search, &[("query", "c")], &params(""), None);
        assert_ne!(plus.key, bare.key);
        assert_eq!(plus.key, "/manga/mangahere/:query?page=1&query=c%2B%2B");

        let percent = p.resolve(Route::Search, &[("query", "100%25")], &params(""), None);
        let decoded = p.resolve(Route::Search, &[("query", "100%")], &params(""), None);
        assert_ne!(percent.key, decoded.key);
    }

    #[test]
    fn test_routes_do_not_share_keys() {
        let p = policy();
        let hot = p.resolve(Route::Hot, &[], &params(""), None);
        let trending = p.resolve(Route::Trending, &[], &params(""), None);
        assert_ne!(hot.key, trending.key);
    }

    #[test]
    fn test_ttl_classes() {
        let p = policy();
        assert_eq!(p.ttl_for(Route::Read, None), 43_200);
        assert_eq!(p.ttl_for(Route::Hot, None), 60);
        assert_eq!(p.ttl_for(Route::Providers, None), 0);
    }

    #[test]
    fn test_requested_ttl_only_overrides_default_class() {
        let p = policy();
        assert_eq!(p.ttl_for(Route::Trending, Some(5)), 5);
        assert_eq!(p.ttl_for(Route::Info, Some(5)), 43_200);
        assert_eq!(p.ttl_for(Route::Providers, Some(5)), 0);
    }

    #[test]
    fn test_requested_ttl_capped_at_long_ttl() {
        let p = policy();
        assert_eq!(p.ttl_for(Route::Hot, Some(u64::MAX)), 43_200);
        assert_eq!(p.ttl_for(Route::Hot, Some(43_200)), 43_200);

        let config = p.resolve(Route::Trending, &[], &params(""), Some(u64::MAX));
        assert_eq!(config.duration, 43_200);
    }

    #[test]
    fn test_handler_override() {
        let p = policy();
        let home = p.resolve(Route::Home, &[], &params(""), None);
        assert_eq!(home.duration, 60);

        let home = home.with_duration(p.long_ttl());
        assert_eq!(home.duration, 43_200);
        assert_eq!(home.key, "/manga/mangahere/home?");
    }

    #[test]
    fn test_table_is_configurable() {
        let p = CachePolicy::new(30, 900).with_class(Route::Hot, TtlClass::Bypass);
        assert_eq!(p.ttl_for(Route::Hot, None), 0);
        assert_eq!(p.ttl_for(Route::Trending, None), 30);
    }
}
