use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{
    CommandTiming, DEFAULT_LOCK_HOLD_TIME_MS, K10_REFRESH_DELAY_MS, POLLING_RATE_MS, RESTART_DISCONNECT_DELAY_MS,
    SETTINGS_RELOAD_DELAY_MS,
};

/// Delays of the polling loop and of command follow-ups, all in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub k10_refresh_delay_ms: u64,
    pub settings_reload_delay_ms: u64,
    pub restart_disconnect_delay_ms: u64,

    /// Used for press-and-hold until the device reports its own hold time
    pub default_hold_time_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            poll_interval_ms: POLLING_RATE_MS,
            k10_refresh_delay_ms: K10_REFRESH_DELAY_MS,
            settings_reload_delay_ms: SETTINGS_RELOAD_DELAY_MS,
            restart_disconnect_delay_ms: RESTART_DISCONNECT_DELAY_MS,
            default_hold_time_ms: DEFAULT_LOCK_HOLD_TIME_MS,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make the interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn command_timing(&self) -> CommandTiming {
        CommandTiming {
            k10_refresh_delay: Duration::from_millis(self.k10_refresh_delay_ms),
            settings_reload_delay: Duration::from_millis(self.settings_reload_delay_ms),
            restart_disconnect_delay: Duration::from_millis(self.restart_disconnect_delay_ms),
            default_hold_time: Duration::from_millis(self.default_hold_time_ms),
        }
    }
}
