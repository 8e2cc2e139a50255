//! Characteristic level access to a connected cabinet
//! Everything above the transport talks to the device through [`CharacteristicTransport`].

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use bluest::{Characteristic, Device};
use log::debug;

use crate::core::bluetooth::types::CabinetCharacteristic;

/// Read/write access to the cabinet characteristics
#[async_trait::async_trait]
pub trait CharacteristicTransport: Send + Sync + 'static {
    /// Whether the connected firmware exposes `characteristic`
    fn has_characteristic(&self, characteristic: CabinetCharacteristic) -> bool;

    /// Whether the link is still up
    async fn is_connected(&self) -> bool;

    /// Read the current value of a characteristic
    async fn read(&self, characteristic: CabinetCharacteristic) -> Result<Vec<u8>>;

    /// Write a value to a characteristic
    async fn write(&self, characteristic: CabinetCharacteristic, data: &[u8]) -> Result<()>;
}

/// A characteristic found on the device together with its notify capability
#[derive(Clone)]
pub struct MappedCharacteristic {
    pub characteristic: Characteristic,
    pub notify: bool,
}

/// [`CharacteristicTransport`] backed by bluest handles
pub struct BluestTransport {
    device: Device,
    characteristics: HashMap<CabinetCharacteristic, MappedCharacteristic>,
}

impl BluestTransport {
    pub fn new(device: Device, characteristics: HashMap<CabinetCharacteristic, MappedCharacteristic>) -> Self {
        Self { device, characteristics }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Characteristics that advertise the notify property
    pub fn notifiable(&self) -> Vec<(CabinetCharacteristic, Characteristic)> {
        let mut found: Vec<_> = self
            .characteristics
            .iter()
            .filter(|(_, mapped)| mapped.notify)
            .map(|(kind, mapped)| (*kind, mapped.characteristic.clone()))
            .collect();
        found.sort_by_key(|(kind, _)| *kind);
        found
    }

    fn get(&self, characteristic: CabinetCharacteristic) -> Result<&Characteristic> {
        self.characteristics
            .get(&characteristic)
            .map(|mapped| &mapped.characteristic)
            .ok_or_else(|| anyhow!("Characteristic '{}' not found", characteristic))
    }
}

#[async_trait::async_trait]
impl CharacteristicTransport for BluestTransport {
    fn has_characteristic(&self, characteristic: CabinetCharacteristic) -> bool {
        self.characteristics.contains_key(&characteristic)
    }

    async fn is_connected(&self) -> bool {
        self.device.is_connected().await
    }

    async fn read(&self, characteristic: CabinetCharacteristic) -> Result<Vec<u8>> {
        let value = self.get(characteristic)?.read().await?;
        debug!("Read {} bytes from {}", value.len(), characteristic);
        Ok(value)
    }

    async fn write(&self, characteristic: CabinetCharacteristic, data: &[u8]) -> Result<()> {
        debug!("Writing {:?} to {}", String::from_utf8_lossy(data), characteristic);
        self.get(characteristic)?.write(data).await?;
        Ok(())
    }
}
