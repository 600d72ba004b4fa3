//! Lifecycle Controller
//!
//! Single owner of the process state. Every transition is a compare-and-set
//! on a watch channel, so concurrent shutdown triggers race safely and only
//! the first one starts draining.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::GatewayError;

// == Lifecycle State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Process started, listener not bound yet
    Starting,
    /// Listener bound and accepting
    Serving,
    /// No new connections; in-flight requests finishing
    Draining,
    /// Listener closed
    Terminated,
    /// A serverless host owns the process
    Hosted,
}

/// What asked the process to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    Interrupt,
    Terminate,
    /// Uncaught panic
    Fault(String),
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Interrupt => f.write_str("SIGINT"),
            ShutdownTrigger::Terminate => f.write_str("SIGTERM"),
            ShutdownTrigger::Fault(_) => f.write_str("uncaught fault"),
        }
    }
}

/// Effect of a [`LifecycleController::shutdown`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This call started the drain
    Draining,
    /// A drain is already running and its grace period has not elapsed
    AlreadyDraining,
    /// The grace period had elapsed; terminate now
    Forced,
    /// Nothing to do (terminated already, or hosted)
    Ignored,
}

// == Lifecycle Controller ==
#[derive(Debug)]
pub struct LifecycleController {
    state: watch::Sender<LifecycleState>,
    grace: Duration,
    drain_started: OnceLock<Instant>,
}

impl LifecycleController {
    pub fn new(grace: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            state,
            grace,
            drain_started: OnceLock::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> bool {
        self.state.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// `Starting -> Serving`, once the listener is bound.
    pub fn mark_serving(&self) -> bool {
        self.transition(&[LifecycleState::Starting], LifecycleState::Serving)
    }

    /// `Starting -> Hosted`, when a serverless host owns the process.
    pub fn mark_hosted(&self) -> bool {
        self.transition(&[LifecycleState::Starting], LifecycleState::Hosted)
    }

    /// Listener closed; final state.
    pub fn mark_terminated(&self) -> bool {
        self.transition(
            &[
                LifecycleState::Starting,
                LifecycleState::Serving,
                LifecycleState::Draining,
            ],
            LifecycleState::Terminated,
        )
    }

    fn grace_elapsed(&self) -> bool {
        self.drain_started
            .get()
            .is_some_and(|started| started.elapsed() >= self.grace)
    }

    // == Shutdown ==
    /// Requests a graceful shutdown. Idempotent: only the first call starts
    /// draining; a later call once the grace period has run out forces
    /// termination.
    pub fn shutdown(&self, trigger: ShutdownTrigger) -> ShutdownOutcome {
        if let ShutdownTrigger::Fault(detail) = &trigger {
            error!("{}", GatewayError::LifecycleFault(detail.clone()));
        }

        let mut outcome = ShutdownOutcome::Ignored;
        self.state.send_if_modified(|state| match *state {
            LifecycleState::Starting | LifecycleState::Serving => {
                let _ = self.drain_started.set(Instant::now());
                *state = LifecycleState::Draining;
                outcome = ShutdownOutcome::Draining;
                true
            }
            LifecycleState::Draining if self.grace_elapsed() => {
                *state = LifecycleState::Terminated;
                outcome = ShutdownOutcome::Forced;
                true
            }
            LifecycleState::Draining => {
                outcome = ShutdownOutcome::AlreadyDraining;
                false
            }
            LifecycleState::Terminated | LifecycleState::Hosted => false,
        });

        match outcome {
            ShutdownOutcome::Draining => info!(
                "Received {}, draining with a grace period of {:?}",
                trigger, self.grace
            ),
            ShutdownOutcome::AlreadyDraining => {
                info!("Received {} while draining; already shutting down", trigger)
            }
            ShutdownOutcome::Forced => warn!("Received {} after grace period; terminating", trigger),
            ShutdownOutcome::Ignored => {}
        }
        outcome
    }

    /// Resolves once draining has started (or the process terminated).
    pub async fn wait_for_drain(&self) {
        let mut rx = self.subscribe();
        let _ = rx
            .wait_for(|s| matches!(s, LifecycleState::Draining | LifecycleState::Terminated))
            .await;
    }

    pub async fn wait_terminated(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|s| *s == LifecycleState::Terminated).await;
    }

    /// Resolves when the grace period of a running drain has elapsed.
    pub async fn grace_expired(&self) {
        self.wait_for_drain().await;
        let started = self.drain_started.get().copied().unwrap_or_else(Instant::now);
        tokio::time::sleep_until(started + self.grace).await;
    }
}
