//! Timeout configuration for the realtime client.
//!
//! Centralizes the deadlines applied to transport opens, the receive loop
//! and outbound sends.

use std::time::Duration;

/// Timeout configuration for realtime client operations.
///
/// # Examples
///
/// ```rust
/// use party_link::LinkTimeouts;
/// use std::time::Duration;
///
/// let timeouts = LinkTimeouts::default();
///
/// let timeouts = LinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .receive_timeout_secs(0)
///     .build();
///
/// let timeouts = LinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// Deadline for a transport open: TCP + TLS + HTTP response head for SSE,
    /// WebSocket upgrade + STOMP CONNECTED for STOMP. An expired open counts
    /// as a failed attempt.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Maximum silence on an open session before it is treated as stale and
    /// torn down. Heartbeats count as traffic. Set to 0 to disable.
    /// Default: 60 seconds
    pub receive_timeout: Duration,

    /// Deadline for writing one outbound frame.
    /// Default: 10 seconds
    pub send_timeout: Duration,

    /// How long `disconnect()` waits for the connection task to send its
    /// leave message and close the transport before aborting it.
    /// Default: 2 seconds
    pub shutdown_timeout: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl LinkTimeouts {
    pub fn builder() -> LinkTimeoutsBuilder {
        LinkTimeoutsBuilder::new()
    }

    /// Shorter timeouts suitable for localhost servers.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            receive_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_millis(500),
        }
    }

    /// Longer timeouts for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            receive_timeout: Duration::from_secs(180),
            send_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// Timeouts for tests: short opens, stale detection after `receive_secs`.
    pub fn for_testing(receive_secs: u64) -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            receive_timeout: Duration::from_secs(receive_secs),
            send_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(1),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for custom [`LinkTimeouts`].
#[derive(Debug, Clone)]
pub struct LinkTimeoutsBuilder {
    timeouts: LinkTimeouts,
}

impl LinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: LinkTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the stale-session timeout. 0 disables it.
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.receive_timeout = timeout;
        self
    }

    pub fn receive_timeout_secs(self, secs: u64) -> Self {
        self.receive_timeout(Duration::from_secs(secs))
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.send_timeout = timeout;
        self
    }

    pub fn send_timeout_secs(self, secs: u64) -> Self {
        self.send_timeout(Duration::from_secs(secs))
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.shutdown_timeout = timeout;
        self
    }

    pub fn build(self) -> LinkTimeouts {
        self.timeouts
    }
}
