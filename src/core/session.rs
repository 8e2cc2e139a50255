//! Cabinet session state
//! Holds the last known state of a connected cabinet and implements the
//! read/write operations on top of a [`CharacteristicTransport`].

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use crate::core::bluetooth::{CabinetCharacteristic, CharacteristicTransport, EVENT_CHANNEL_CAPACITY};
use crate::core::protocol::{
    self, CabinetUpdate, DeviceCommand, K10Command, K10Status, Settings, SystemInfo, decode_utf8,
    diff_settings, encode_settings,
};
use crate::error::PanelError;

/// Last known state of the cabinet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CabinetState {
    /// Temperature in °C
    pub temperature: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    pub system_info: Option<SystemInfo>,
    pub k10: K10Status,
    /// Settings as last read from (or successfully written to) the device
    pub settings: Settings,
}

impl CabinetState {
    pub fn apply(&mut self, update: &CabinetUpdate) {
        match update {
            CabinetUpdate::Temperature(value) => self.temperature = Some(*value),
            CabinetUpdate::Humidity(value) => self.humidity = Some(*value),
            CabinetUpdate::SystemInfo(info) => self.system_info = Some(info.clone()),
            CabinetUpdate::K10(status) => self.k10.merge(status),
            CabinetUpdate::Settings(settings) => self.settings = settings.clone(),
        }
    }

    /// Hold time reported by the device, or `default` until it reported one
    pub fn hold_time(&self, default: Duration) -> Duration {
        self.k10
            .hold_time_ms
            .map(|ms| Duration::from_millis(ms.into()))
            .unwrap_or(default)
    }
}

impl fmt::Display for CabinetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.temperature {
            Some(t) => writeln!(f, "Temperature: {:.1}°C", t)?,
            None => writeln!(f, "Temperature: --")?,
        }
        match self.humidity {
            Some(h) => writeln!(f, "Humidity: {:.1}%", h)?,
            None => writeln!(f, "Humidity: --")?,
        }
        if let Some(info) = &self.system_info {
            writeln!(f, "{}", info)?;
        }
        write!(f, "{}", self.k10)
    }
}

/// Events published by a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Update(CabinetUpdate),
    Disconnected,
}

/// Result of a settings save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SaveOutcome {
    /// Every edit matched the current value; nothing was written
    NoChanges,
    /// The settings string that was written
    Sent(String),
}

/// Characteristics re-read by the polling loop
const POLLED_CHARACTERISTICS: [CabinetCharacteristic; 4] = [
    CabinetCharacteristic::CurrentTemperature,
    CabinetCharacteristic::CurrentHumidity,
    CabinetCharacteristic::SystemInfo,
    CabinetCharacteristic::K10,
];

/// Characteristics read on connect and on refresh, in order
const LOADED_CHARACTERISTICS: [CabinetCharacteristic; 5] = [
    CabinetCharacteristic::CurrentTemperature,
    CabinetCharacteristic::CurrentHumidity,
    CabinetCharacteristic::SystemInfo,
    CabinetCharacteristic::AllSettings,
    CabinetCharacteristic::K10,
];

/// A connected cabinet
pub struct Session<T: CharacteristicTransport> {
    transport: T,
    state: Mutex<CabinetState>,
    notifying: Mutex<HashSet<CabinetCharacteristic>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<T: CharacteristicTransport> Session<T> {
    pub fn new(transport: T) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            state: Mutex::new(CabinetState::default()),
            notifying: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CabinetState {
        self.state.lock().await.clone()
    }

    /// Applies an update to the state and publishes it
    pub async fn apply(&self, update: CabinetUpdate) {
        self.state.lock().await.apply(&update);
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::Update(update));
    }

    pub fn notify_disconnected(&self) {
        let _ = self.events.send(SessionEvent::Disconnected);
    }

    pub async fn set_notifying(&self, characteristic: CabinetCharacteristic, notifying: bool) {
        let mut guard = self.notifying.lock().await;
        if notifying {
            guard.insert(characteristic);
        } else {
            guard.remove(&characteristic);
        }
    }

    pub async fn is_notifying(&self, characteristic: CabinetCharacteristic) -> bool {
        self.notifying.lock().await.contains(&characteristic)
    }

    /// Reads a characteristic and returns its payload as text
    pub async fn read_raw(&self, characteristic: CabinetCharacteristic) -> Result<String> {
        self.require(characteristic)?;
        let value = self.transport.read(characteristic).await?;
        Ok(decode_utf8(&value))
    }

    /// Reads, decodes and applies one characteristic. Failures are logged, not returned.
    pub async fn refresh(&self, characteristic: CabinetCharacteristic) -> bool {
        if !self.transport.has_characteristic(characteristic) {
            debug!("Characteristic '{}' not present, skipping", characteristic);
            return false;
        }
        let value = match self.transport.read(characteristic).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read characteristic '{}': {}", characteristic, e);
                return false;
            }
        };
        match protocol::decode(characteristic, &value) {
            Ok(update) => {
                self.apply(update).await;
                true
            }
            Err(e) => {
                warn!("Ignoring payload of '{}': {}", characteristic, e);
                false
            }
        }
    }

    /// Loads everything the panel shows
    pub async fn load_all_data(&self) -> CabinetState {
        info!("Loading all data from device...");
        for characteristic in LOADED_CHARACTERISTICS {
            self.refresh(characteristic).await;
        }
        info!("All data loaded.");
        self.snapshot().await
    }

    /// Re-reads the values not covered by an active notification subscription
    pub async fn poll_once(&self) {
        for characteristic in POLLED_CHARACTERISTICS {
            if !self.is_notifying(characteristic).await {
                self.refresh(characteristic).await;
            }
        }
    }

    pub async fn refresh_k10(&self) -> K10Status {
        self.refresh(CabinetCharacteristic::K10).await;
        self.state.lock().await.k10
    }

    /// Writes the edits that differ from the last read settings
    pub async fn save_settings(&self, edits: &[(String, String)]) -> Result<SaveOutcome> {
        self.require_connected(CabinetCharacteristic::AllSettings).await?;

        let current = self.state.lock().await.settings.clone();
        let changed = diff_settings(&current, edits).map_err(PanelError::from)?;
        if changed.is_empty() {
            info!("No changed settings to send.");
            return Ok(SaveOutcome::NoChanges);
        }

        let encoded = encode_settings(&changed).map_err(PanelError::from)?;
        info!("Sending settings: {}", encoded);
        self.transport
            .write(CabinetCharacteristic::AllSettings, encoded.as_bytes())
            .await?;

        let mut state = self.state.lock().await;
        for (key, value) in &changed {
            state.settings.insert(key, value);
        }
        info!("Settings sent successfully.");
        Ok(SaveOutcome::Sent(encoded))
    }

    pub async fn send_k10(&self, command: K10Command) -> Result<()> {
        self.require(CabinetCharacteristic::K10)?;
        self.transport
            .write(CabinetCharacteristic::K10, &command.to_bytes())
            .await?;
        info!("K10: sent command \"{}\"", command.as_str());
        Ok(())
    }

    pub async fn send_device_command(&self, command: DeviceCommand) -> Result<()> {
        self.require_connected(CabinetCharacteristic::Command).await?;
        self.transport
            .write(CabinetCharacteristic::Command, &command.to_bytes())
            .await?;
        info!("Command \"{}\" sent.", command.as_str());
        Ok(())
    }

    fn require(&self, characteristic: CabinetCharacteristic) -> Result<(), PanelError> {
        if self.transport.has_characteristic(characteristic) {
            Ok(())
        } else {
            Err(PanelError::CharacteristicUnavailable(characteristic))
        }
    }

    async fn require_connected(&self, characteristic: CabinetCharacteristic) -> Result<(), PanelError> {
        self.require(characteristic)?;
        if self.transport.is_connected().await {
            Ok(())
        } else {
            Err(PanelError::NotConnected)
        }
    }
}
