//! Standalone runner
//!
//! Binds the listener, wires signals and panics into the controller, and
//! drives the server until it has drained or the grace period runs out.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{DeploymentEnv, KeepAlivePinger, LifecycleController, ShutdownTrigger};
use crate::cache::current_flight;
use crate::config::Config;

/// How [`run`] / [`serve_on`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// A serverless host owns the process; nothing was bound
    Hosted(DeploymentEnv),
    /// Every connection finished within the grace period
    Drained,
    /// The grace period ran out with requests still open
    GraceExpired,
    /// A signal after the grace period forced termination
    Forced,
}

/// Runs the gateway for the configured deployment.
///
/// On a serverless host this returns at once without binding a listener or
/// scheduling keep-alive pings. Otherwise it binds, installs signal and
/// fault handlers, starts the keep-alive pinger when the host needs one, and
/// serves until shutdown.
pub async fn run(
    config: &Config,
    app: Router,
    controller: Arc<LifecycleController>,
) -> anyhow::Result<ServeOutcome> {
    if config.deployment_env.is_serverless() {
        controller.mark_hosted();
        info!(
            "Deployment env '{}' manages the process lifecycle; not binding a listener",
            config.deployment_env
        );
        return Ok(ServeOutcome::Hosted(config.deployment_env));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding listener on {}", addr))?;

    spawn_signal_listener(controller.clone());
    install_fault_hook(controller.clone());

    if let Some(pinger) = KeepAlivePinger::from_config(config)? {
        pinger.spawn(controller.clone());
    }

    serve_on(listener, app, controller).await
}

/// Serves `app` on an already bound listener until shutdown.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    controller: Arc<LifecycleController>,
) -> anyhow::Result<ServeOutcome> {
    let local = listener.local_addr().context("reading listener address")?;
    controller.mark_serving();
    info!("Gateway RUNNING at http://localhost:{}", local.port());

    let drain = {
        let controller = controller.clone();
        async move {
            controller.wait_for_drain().await;
            info!("Draining: no longer accepting connections");
        }
    };
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(drain)
        .into_future();

    let outcome = tokio::select! {
        served = server => {
            served.context("serving HTTP")?;
            ServeOutcome::Drained
        }
        _ = controller.grace_expired() => {
            warn!(
                "Grace period of {:?} elapsed with requests still in flight",
                controller.grace()
            );
            ServeOutcome::GraceExpired
        }
        _ = controller.wait_terminated() => ServeOutcome::Forced,
    };

    controller.mark_terminated();
    info!("Gateway shutdown complete");
    Ok(outcome)
}

/// Feeds SIGINT and SIGTERM into the controller for the process lifetime.
pub fn spawn_signal_listener(controller: Arc<LifecycleController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut signals = {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
                (Err(err), _) | (_, Err(err)) => {
                    error!("Failed to install signal handlers: {}", err);
                    return;
                }
            }
        };

        loop {
            #[cfg(unix)]
            let trigger = tokio::select! {
                _ = signals.0.recv() => ShutdownTrigger::Interrupt,
                _ = signals.1.recv() => ShutdownTrigger::Terminate,
            };

            #[cfg(not(unix))]
            let trigger = match tokio::signal::ctrl_c().await {
                Ok(()) => ShutdownTrigger::Interrupt,
                Err(err) => {
                    error!("Failed to listen for Ctrl+C: {}", err);
                    return;
                }
            };

            controller.shutdown(trigger);
        }
    })
}

/// Routes uncaught panics into a graceful shutdown.
///
/// A panic inside an upstream fetch is not uncaught: the executor turns it
/// into a failure for that key's waiters, so the gateway keeps serving.
pub fn install_fault_hook(controller: Arc<LifecycleController>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        match current_flight() {
            Some(key) => warn!("Upstream fetch for {} panicked: {}", key, info),
            None => {
                controller.shutdown(ShutdownTrigger::Fault(info.to_string()));
            }
        }
        previous(info);
    }));
}
