//! Constants used throughout the application
//! This module contains all the constant values used in the application,
//! such as UUIDs, timeouts, and other configuration values.

use uuid::Uuid;

/// Advertised name prefix of GuitarCabinet controllers
pub const DEVICE_NAME_PREFIX: &str = "GuitarCabinet";

/// The UUID of the GuitarCabinet primary service
pub const UUID_CABINET_SERVICE: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Target humidity characteristic
pub const UUID_TARGET_HUMIDITY_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a1);

/// Current temperature characteristic ("T:<celsius>")
pub const UUID_CURRENT_TEMPERATURE_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a2);

/// Current humidity characteristic ("H:<percent>")
pub const UUID_CURRENT_HUMIDITY_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a3);

/// All settings characteristic ("key=value,...")
pub const UUID_ALL_SETTINGS_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a4);

/// System info characteristic ("E:1.5,RES_W:LOW,...")
pub const UUID_SYSTEM_INFO_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a5);

/// K10 magnetic lock characteristic
pub const UUID_K10_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a6);

/// Device command characteristic (reboot, factory reset)
pub const UUID_COMMAND_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a7);

/// Maximum number of connection retries
pub const MAX_CONNECT_RETRIES: u32 = 3;

/// Delay between connection retries in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Scan duration in seconds
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 10;

/// Period of the fallback polling loop in milliseconds
pub const POLLING_RATE_MS: u64 = 3000;

/// Delay before re-reading the K10 status after a lock command
pub const K10_REFRESH_DELAY_MS: u64 = 500;

/// Delay before reloading everything after a settings write
pub const SETTINGS_RELOAD_DELAY_MS: u64 = 1000;

/// Delay before dropping the link after a reboot or factory reset
pub const RESTART_DISCONNECT_DELAY_MS: u64 = 1000;

/// Hold time used until the device reports its own `HOLD` value
pub const DEFAULT_LOCK_HOLD_TIME_MS: u64 = 1000;

/// Capacity of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
