//! Lifecycle Module
//!
//! Decides whether this process serves HTTP itself or leaves that to a
//! serverless host, and in standalone mode owns the process from bind to
//! exit: signal and fault driven draining, bounded grace, keep-alive pings.

mod controller;
mod keepalive;
mod runner;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub use controller::{LifecycleController, LifecycleState, ShutdownOutcome, ShutdownTrigger};
pub use keepalive::{KeepAlivePinger, KEEPALIVE_HOST};
pub use runner::{install_fault_hook, run, serve_on, spawn_signal_listener, ServeOutcome};

// == Deployment Env ==
/// Platform the gateway is deployed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeploymentEnv {
    /// Plain long-running process
    #[default]
    Standalone,
    Docker,
    /// Long-running, but idles to sleep without traffic
    Render,
    Vercel,
    CloudflareWorkers,
}

impl DeploymentEnv {
    /// Hosts that own the process lifecycle themselves.
    pub const SERVERLESS: [DeploymentEnv; 2] =
        [DeploymentEnv::Vercel, DeploymentEnv::CloudflareWorkers];

    pub fn is_serverless(self) -> bool {
        Self::SERVERLESS.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentEnv::Standalone => "standalone",
            DeploymentEnv::Docker => "docker",
            DeploymentEnv::Render => "render",
            DeploymentEnv::Vercel => "vercel",
            DeploymentEnv::CloudflareWorkers => "cloudflare-workers",
        }
    }
}

/// Unknown names fall back to standalone.
impl FromStr for DeploymentEnv {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "docker" => DeploymentEnv::Docker,
            "render" => DeploymentEnv::Render,
            "vercel" => DeploymentEnv::Vercel,
            "cloudflare-workers" | "cloudflare_workers" => DeploymentEnv::CloudflareWorkers,
            _ => DeploymentEnv::Standalone,
        })
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
