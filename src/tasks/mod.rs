//! Background Tasks Module
//!
//! Periodic work that runs alongside the HTTP server until it drains.

mod cleanup;

pub use cleanup::spawn_cleanup_task;
