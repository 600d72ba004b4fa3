//! Upstream Provider Module
//!
//! The gateway treats scraping as an opaque, slow and fallible data source.
//! [`MangaProvider`] is that contract; [`RemoteProvider`] fulfils it by
//! calling a scraping service over HTTP.

mod remote;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::models::RankingKind;

pub use remote::RemoteProvider;

/// Failure reported by an upstream with an HTTP status worth forwarding.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    pub status: StatusCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

// == Provider Contract ==
/// Async manga data source. Results are opaque JSON.
#[async_trait]
pub trait MangaProvider: Send + Sync + 'static {
    /// Provider name as it appears in routes.
    fn name(&self) -> &'static str;

    async fn manga_info(&self, id: &str) -> anyhow::Result<Value>;

    async fn chapter_pages(&self, chapter_id: &str) -> anyhow::Result<Value>;

    async fn ranking(&self, kind: RankingKind) -> anyhow::Result<Value>;

    async fn hot_releases(&self) -> anyhow::Result<Value>;

    async fn trending(&self) -> anyhow::Result<Value>;

    async fn recent_updates(&self, page: u32) -> anyhow::Result<Value>;

    async fn search(&self, query: &str, page: u32) -> anyhow::Result<Value>;
}
