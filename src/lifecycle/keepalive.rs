//! Keep-Alive Pinger
//!
//! Some hosts suspend processes that see no traffic for a while. On those,
//! the gateway pings its own public health endpoint on a fixed interval.
//! A failed ping is logged and the schedule carries on.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{DeploymentEnv, LifecycleController};
use crate::config::Config;

/// Host whose free tier sleeps idle processes.
pub const KEEPALIVE_HOST: DeploymentEnv = DeploymentEnv::Render;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct KeepAlivePinger {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl KeepAlivePinger {
    pub fn new(url: impl Into<String>, interval: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PING_TIMEOUT)
            .build()
            .context("building keep-alive HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            interval,
        })
    }

    /// Pinger for this deployment, if it needs one: a standalone process on
    /// the sleep-prone host with a public hostname configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
        if config.deployment_env.is_serverless() || config.deployment_env != KEEPALIVE_HOST {
            return Ok(None);
        }
        let Some(hostname) = config.hostname.as_deref() else {
            return Ok(None);
        };

        let url = format!("https://{}/health", hostname);
        Self::new(url, config.keepalive_interval).map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Issues one ping; non-success statuses count as failures.
    pub async fn ping_once(&self) -> anyhow::Result<StatusCode> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?;

        Ok(response.status())
    }

    /// Pings every interval until the process starts draining.
    pub fn spawn(self, controller: Arc<LifecycleController>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Keep-alive pinger targeting {} every {:?}",
                self.url, self.interval
            );

            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = controller.wait_for_drain() => {
                        debug!("Keep-alive pinger stopped");
                        break;
                    }
                    _ = ticker.tick() => match self.ping_once().await {
                        Ok(_) => info!("Gateway HEALTH_CHECK at {}", Utc::now().to_rfc3339()),
                        Err(err) => warn!("Gateway HEALTH_CHECK failed; {:#}", err),
                    },
                }
            }
        })
    }
}
