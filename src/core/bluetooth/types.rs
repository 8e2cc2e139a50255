//! Defines shared data structures for the Bluetooth module.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    UUID_ALL_SETTINGS_CHAR, UUID_COMMAND_CHAR, UUID_CURRENT_HUMIDITY_CHAR,
    UUID_CURRENT_TEMPERATURE_CHAR, UUID_K10_CHAR, UUID_SYSTEM_INFO_CHAR, UUID_TARGET_HUMIDITY_CHAR,
};
use crate::core::protocol::ProtocolError;

/// Represents a discovered Bluetooth device
#[derive(Debug, Clone, Serialize)]
pub struct BluetoothDevice {
    /// Platform-specific unique identifier for the device (especially important on macOS)
    pub id: String,
    /// The advertised name of the device
    pub name: String,
    /// The address of the device (MAC address on most platforms, N/A on macOS)
    pub address: String,
    /// The signal strength (RSSI) of the device, if reported
    pub rssi: Option<i16>,
    /// Whether the device is connected
    pub is_connected: bool,
}

impl BluetoothDevice {
    /// Creates a new BluetoothDevice instance
    pub fn new(id: String, name: String, address: String, rssi: Option<i16>, is_connected: bool) -> Self {
        Self {
            id,
            name,
            address,
            rssi,
            is_connected,
        }
    }
}

impl fmt::Display for BluetoothDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] id={}", self.name, self.address, self.id)?;
        if let Some(rssi) = self.rssi {
            write!(f, " rssi={}dBm", rssi)?;
        }
        if self.is_connected {
            write!(f, " (connected)")?;
        }
        Ok(())
    }
}

/// The fixed characteristic layout of the cabinet service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CabinetCharacteristic {
    TargetHumidity,
    CurrentTemperature,
    CurrentHumidity,
    AllSettings,
    SystemInfo,
    K10,
    Command,
}

impl CabinetCharacteristic {
    pub const ALL: [CabinetCharacteristic; 7] = [
        Self::TargetHumidity,
        Self::CurrentTemperature,
        Self::CurrentHumidity,
        Self::AllSettings,
        Self::SystemInfo,
        Self::K10,
        Self::Command,
    ];

    pub fn uuid(&self) -> Uuid {
        match self {
            Self::TargetHumidity => UUID_TARGET_HUMIDITY_CHAR,
            Self::CurrentTemperature => UUID_CURRENT_TEMPERATURE_CHAR,
            Self::CurrentHumidity => UUID_CURRENT_HUMIDITY_CHAR,
            Self::AllSettings => UUID_ALL_SETTINGS_CHAR,
            Self::SystemInfo => UUID_SYSTEM_INFO_CHAR,
            Self::K10 => UUID_K10_CHAR,
            Self::Command => UUID_COMMAND_CHAR,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Short name used in logs and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::TargetHumidity => "target-humidity",
            Self::CurrentTemperature => "temperature",
            Self::CurrentHumidity => "humidity",
            Self::AllSettings => "settings",
            Self::SystemInfo => "system-info",
            Self::K10 => "k10",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for CabinetCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CabinetCharacteristic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or(ProtocolError::UnknownCharacteristic(wanted))
    }
}
