use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{
    CONNECT_RETRY_DELAY_MS, DEFAULT_SCAN_DURATION_SECS, DEVICE_NAME_PREFIX, MAX_CONNECT_RETRIES, ScanOptions,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Advertised name prefix a device must have to be listed
    pub name_prefix: String,

    /// How long a scan runs before giving up, in seconds
    pub scan_timeout_secs: u64,

    /// Minimum signal strength in dBm. Weaker devices are ignored; `null` accepts all.
    pub min_rssi: Option<i16>,

    /// Connection attempts before giving up
    pub connect_retries: u32,

    /// Pause between connection attempts, in milliseconds
    pub connect_retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            name_prefix: DEVICE_NAME_PREFIX.to_string(),
            scan_timeout_secs: DEFAULT_SCAN_DURATION_SECS,
            min_rssi: None,
            connect_retries: MAX_CONNECT_RETRIES,
            connect_retry_delay_ms: CONNECT_RETRY_DELAY_MS,
        }
    }
}

impl ConnectionConfig {
    pub fn scan_options(&self, stop_at_first: bool) -> ScanOptions {
        ScanOptions {
            timeout: Duration::from_secs(self.scan_timeout_secs),
            name_prefix: self.name_prefix.clone(),
            min_rssi: self.min_rssi,
            stop_at_first,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}
