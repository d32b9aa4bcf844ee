use serde::{Deserialize, Serialize};

/// One monitored network device.
///
/// Fetched fresh from the inventory at the start of every run; never
/// cached across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub device_id: i64,
    pub hostname: String,
    pub disabled: bool,
    /// Seconds the last poll/discovery of this device took.
    pub last_poll_duration: f64,
}

impl Host {
    pub fn new(device_id: i64, hostname: impl Into<String>) -> Self {
        Self {
            device_id,
            hostname: hostname.into(),
            disabled: false,
            last_poll_duration: 0.0,
        }
    }

    pub fn with_last_poll_duration(mut self, seconds: f64) -> Self {
        self.last_poll_duration = seconds;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}
