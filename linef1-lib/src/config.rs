use crate::constants::{DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_READ_TIMEOUT, RESYNC_PAUSE};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing and retry policy of a [`LineF1`](crate::LineF1) engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Wait for an acknowledgment before retransmitting
    pub ack_timeout: Duration,
    /// Wait for a measurement in the high-level read methods
    pub read_timeout: Duration,
    /// Retransmissions used by the high-level command methods
    pub max_retries: u32,
    /// Pause before discarding the receive buffer after a bad frame
    pub resync_pause: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            resync_pause: RESYNC_PAUSE,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_resync_pause(mut self, pause: Duration) -> Self {
        self.resync_pause = pause;
        self
    }
}
