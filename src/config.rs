//! Configuration for sirepkit
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// TCP port the Sirep service listens on
pub const SIREP_PORT: u16 = 29820;

/// Main configuration for a Sirep session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Target Configuration
    // -------------------------------------------------------------------------
    /// Device host name or IP address
    pub target: String,

    /// Device TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timeout Configuration
    // -------------------------------------------------------------------------
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Read timeout (milliseconds)
    ///
    /// During the record loop an idle read of this length ends the stream.
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Record Configuration
    // -------------------------------------------------------------------------
    /// Largest record payload accepted from the device (in bytes)
    pub max_payload_size: u32,

    /// How many bytes of each record payload are hex-logged
    pub log_data_truncation: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: "127.0.0.1".to_string(),
            port: SIREP_PORT,
            connect_timeout_ms: 3000,
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
            max_payload_size: 64 * 1024 * 1024, // 64 MB
            log_data_truncation: 0x64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string used for connecting and logging
    pub fn address(&self) -> String {
        if self.target.contains(':') && !self.target.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.target, self.port)
        } else {
            format!("{}:{}", self.target, self.port)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the device host name or IP address
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.config.target = target.into();
        self
    }

    /// Set the device TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest accepted record payload (in bytes)
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set how many payload bytes are hex-logged per record
    pub fn log_data_truncation(mut self, bytes: usize) -> Self {
        self.config.log_data_truncation = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
