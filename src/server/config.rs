//! Server Configuration

/// Default interval between expired-key sweeps
pub const DEFAULT_CLEANUP_INTERVAL: &str = "4s";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bind address
    pub bind: String,

    /// Port number
    pub port: u16,

    /// Interval expression for the cleanup job, e.g. `"4s"` or `"1m30s"`
    pub cleanup_interval: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 50051,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL.to_string(),
        }
    }
}

impl Config {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Set cleanup interval expression
    pub fn with_cleanup_interval(mut self, interval: impl Into<String>) -> Self {
        self.cleanup_interval = interval.into();
        self
    }

    /// `bind:port` string for the listener
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
