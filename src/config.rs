//! Configuration for hidwire
//!
//! Timing and limits for a single protocol link, with sensible defaults.

use std::time::Duration;

/// Configuration for one chunk link / protocol coordinator
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Polling Configuration
    // -------------------------------------------------------------------------
    /// How long a single wait for the next chunk may last (milliseconds)
    pub poll_interval_ms: u64,

    /// Silence after which the transport liveness probe is consulted
    /// (milliseconds). A live transport restarts the timer.
    pub liveness_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Framing Limits
    // -------------------------------------------------------------------------
    /// Largest declared message length accepted on the read path (in bytes)
    pub max_message_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            liveness_timeout_ms: 10_000,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the per-wait poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the liveness timeout (in milliseconds)
    pub fn liveness_timeout_ms(mut self, ms: u64) -> Self {
        self.config.liveness_timeout_ms = ms;
        self
    }

    /// Set the maximum accepted message size (in bytes)
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
