use std::time::Duration;
use tandem::constants::DEFAULT_PUMP_INTERVAL_MS;

/// Per-endpoint settings.
#[derive(Debug, Clone)]
pub struct RpcEndpointConfig {
    /// Used as a prefix in log lines.
    pub name: String,
    /// How often a blocked synchronous call re-checks its completion and the
    /// endpoint's liveness.
    pub pump_interval: Duration,
}

impl RpcEndpointConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pump_interval: Duration::from_millis(DEFAULT_PUMP_INTERVAL_MS),
        }
    }

    pub fn with_pump_interval(mut self, pump_interval: Duration) -> Self {
        self.pump_interval = pump_interval;
        self
    }
}

impl Default for RpcEndpointConfig {
    fn default() -> Self {
        Self::new("endpoint")
    }
}
