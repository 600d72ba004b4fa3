//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::lifecycle::DeploymentEnv;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener port (standalone mode only)
    pub server_port: u16,
    /// Host platform the process is deployed on
    pub deployment_env: DeploymentEnv,
    /// Public hostname of this deployment, if any
    pub hostname: Option<String>,
    /// Base URL of the upstream scraping service
    pub upstream_url: String,
    /// Default (short) TTL in seconds for listing routes
    pub default_ttl: u64,
    /// Long TTL in seconds for detail and chapter-content routes
    pub long_ttl: u64,
    /// Maximum number of entries the in-memory store can hold
    pub max_entries: usize,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Time in-flight requests get to finish once draining starts
    pub shutdown_grace: Duration,
    /// Period of the keep-alive self ping
    pub keepalive_interval: Duration,
    /// `s-maxage` advertised in `Cache-Control`
    pub s_maxage: u64,
    /// `stale-while-revalidate` advertised in `Cache-Control`
    pub stale_while_revalidate: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `GATEWAY_PORT` - listener port (default: 4000)
    /// - `GATEWAY_DEPLOYMENT_ENV` - host platform name (default: standalone)
    /// - `GATEWAY_HOSTNAME` - public hostname (default: unset)
    /// - `GATEWAY_UPSTREAM_URL` - scraping service base URL (default: http://localhost:3000)
    /// - `DEFAULT_TTL` - short TTL in seconds (default: 60)
    /// - `LONG_TTL` - long TTL in seconds (default: 43200)
    /// - `MAX_ENTRIES` - in-memory store capacity (default: 1000)
    /// - `CLEANUP_INTERVAL` - sweep frequency in seconds (default: 60)
    /// - `SHUTDOWN_GRACE_SECS` - drain grace period (default: 10)
    /// - `KEEPALIVE_INTERVAL_SECS` - keep-alive period (default: 480)
    /// - `CACHE_S_MAXAGE` / `CACHE_STALE_WHILE_REVALIDATE` - CDN hints (default: 60 / 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_env("GATEWAY_PORT").unwrap_or(defaults.server_port),
            deployment_env: parse_env("GATEWAY_DEPLOYMENT_ENV")
                .unwrap_or(defaults.deployment_env),
            hostname: env::var("GATEWAY_HOSTNAME")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            upstream_url: env::var("GATEWAY_UPSTREAM_URL")
                .ok()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.upstream_url),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            long_ttl: parse_env("LONG_TTL").unwrap_or(defaults.long_ttl),
            max_entries: parse_env("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            shutdown_grace: parse_env("SHUTDOWN_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
            keepalive_interval: parse_env("KEEPALIVE_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.keepalive_interval),
            s_maxage: parse_env("CACHE_S_MAXAGE").unwrap_or(defaults.s_maxage),
            stale_while_revalidate: parse_env("CACHE_STALE_WHILE_REVALIDATE")
                .unwrap_or(defaults.stale_while_revalidate),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 4000,
            deployment_env: DeploymentEnv::Standalone,
            hostname: None,
            upstream_url: "http://localhost:3000".to_string(),
            default_ttl: 60,
            long_ttl: 60 * 60 * 12,
            max_entries: 1000,
            cleanup_interval: 60,
            shutdown_grace: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(8 * 60),
            s_maxage: 60,
            stale_while_revalidate: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.deployment_env, DeploymentEnv::Standalone);
        assert!(config.hostname.is_none());
        assert_eq!(config.default_ttl, 60);
        assert_eq!(config.long_ttl, 43_200);
        assert_eq!(config.keepalive_interval, Duration::from_secs(480));
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("GATEWAY_PORT");
        env::remove_var("LONG_TTL");
        env::remove_var("GATEWAY_HOSTNAME");
        let config = Config::from_env();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.long_ttl, 43_200);
        assert!(config.hostname.is_none());

        env::set_var("GATEWAY_PORT", "8081");
        env::set_var("DEFAULT_TTL", "not-a-number");
        env::set_var("GATEWAY_DEPLOYMENT_ENV", "Vercel");
        env::set_var("GATEWAY_HOSTNAME", "  ");
        let config = Config::from_env();
        assert_eq!(config.server_port, 8081);
        assert_eq!(config.default_ttl, 60);
        assert_eq!(config.deployment_env, DeploymentEnv::Vercel);
        assert!(config.hostname.is_none());

        env::remove_var("GATEWAY_PORT");
        env::remove_var("DEFAULT_TTL");
        env::remove_var("GATEWAY_DEPLOYMENT_ENV");
        env::remove_var("GATEWAY_HOSTNAME");
    }
}
