//! HTTP client for an upstream scraping service.
//!
//! Endpoints mirror the gateway's own routes under
//! `{base}/manga/{provider}/...` and answer with raw JSON.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{MangaProvider, ProviderError};
use crate::models::RankingKind;

const PROVIDER: &str = "mangahere";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`MangaProvider`] backed by a remote scraping service.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteProvider {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building upstream HTTP client")?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let url = format!("{}/manga/{}{}", self.base_url, PROVIDER, path);
        debug!("Upstream GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("{} upstream unreachable", PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<Value> = response.json().await.ok();
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("upstream request failed")
                        .to_string()
                });
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            return Err(ProviderError::new(status, message).into());
        }

        response
            .json()
            .await
            .with_context(|| format!("{} upstream sent malformed JSON", PROVIDER))
    }
}

#[async_trait]
impl MangaProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn manga_info(&self, id: &str) -> anyhow::Result<Value> {
        self.fetch("/info", &[("id", id.to_string())]).await
    }

    async fn chapter_pages(&self, chapter_id: &str) -> anyhow::Result<Value> {
        self.fetch("/read", &[("chapterId", chapter_id.to_string())])
            .await
    }

    async fn ranking(&self, kind: RankingKind) -> anyhow::Result<Value> {
        self.fetch("/rankings", &[("type", kind.to_string())]).await
    }

    async fn hot_releases(&self) -> anyhow::Result<Value> {
        self.fetch("/hot", &[]).await
    }

    async fn trending(&self) -> anyhow::Result<Value> {
        self.fetch("/trending", &[]).await
    }

    async fn recent_updates(&self, page: u32) -> anyhow::Result<Value> {
        self.fetch("/recent-updates", &[("page", page.to_string())])
            .await
    }

    async fn search(&self, query: &str, page: u32) -> anyhow::Result<Value> {
        let path = format!("/{}", urlencoding::encode(query));
        self.fetch(&path, &[("page", page.to_string())]).await
    }
}
