//! Application-level configuration.
//!
//! Timeouts for correlated calls and the session lifecycle. File and
//! environment loading lives in the infrastructure layer.

use std::time::Duration;

/// Deadline applied when neither the call nor the service overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(40_000);

/// Service-wide timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Default deadline of a correlated command.
    pub command_timeout: Duration,
    /// Deadline for the connected pulse after `start`.
    pub start_timeout: Duration,
    /// Deadline for the disconnected pulse after `stop`.
    pub stop_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_TIMEOUT,
            start_timeout: DEFAULT_TIMEOUT,
            stop_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Creates a ServiceConfig with every timeout given in milliseconds.
    pub fn from_millis(command_ms: u64, start_ms: u64, stop_ms: u64) -> Self {
        Self {
            command_timeout: Duration::from_millis(command_ms),
            start_timeout: Duration::from_millis(start_ms),
            stop_timeout: Duration::from_millis(stop_ms),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides [`ServiceConfig::command_timeout`] for this call.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn with_timeout_millis(millis: u64) -> Self {
        Self::with_timeout(Duration::from_millis(millis))
    }
}
