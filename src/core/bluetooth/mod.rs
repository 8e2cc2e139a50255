//! Bluetooth functionality for the cabinet control panel
//! This module handles all bluetooth operations including scanning,
//! connecting, and exchanging data with the cabinet controller.

mod commands;
mod connection;
mod constants;
mod manager;
mod notification;
mod poller;
mod scanner;
mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use commands::{CommandExecutor, CommandTiming, PendingRefresh, PressHold};
pub use connection::ConnectionManager;
pub use constants::*; // Re-export all constants
pub use manager::CabinetManager;
pub use notification::{NOTIFIED_CHARACTERISTICS, NotificationHandler, handle_notification};
pub use poller::Poller;
pub use scanner::{BluetoothScanner, ScanOptions, extract_mac_address, is_cabinet_name};
pub use transport::{BluestTransport, CharacteristicTransport, MappedCharacteristic};
pub use types::{BluetoothDevice, CabinetCharacteristic};

#[cfg(test)]
pub(crate) use transport::fake;
