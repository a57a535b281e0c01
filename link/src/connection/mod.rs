//! Connection management.
//!
//! This module contains:
//! - [`state`]: status, counters and diagnostics shared with the client handle
//! - [`task`]: the background task owning the transport session, with the
//!   retry loop

pub(crate) mod state;
pub(crate) mod task;

pub(crate) use state::ConnectionState;
pub(crate) use task::{connection_task, ConnCmd, TaskContext};

/// Capacity of the client → task command channel.
pub(crate) const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
pub(crate) const FAR_FUTURE: std::time::Duration = std::time::Duration::from_secs(100 * 365 * 24 * 3600);
