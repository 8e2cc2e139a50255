//! Bluetooth connection handling for the cabinet
//! This module handles connecting to and disconnecting from the controller

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::{Adapter, Device};
use log::{debug, info, warn};

use crate::core::bluetooth::constants::UUID_CABINET_SERVICE;
use crate::core::bluetooth::transport::{BluestTransport, MappedCharacteristic};
use crate::core::bluetooth::types::CabinetCharacteristic;

/// Connection manager for the cabinet
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    max_retries: u32,
    retry_delay: Duration,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            adapter,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Connect to the cabinet with retry mechanism
    pub async fn connect_with_retry(&self, device: &Device) -> Result<BluestTransport> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_connect(device).await {
                Ok(transport) => {
                    info!("Successfully connected to device");
                    return Ok(transport);
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        info!("Retrying connection in {} ms...", self.retry_delay.as_millis());
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to connect after {} attempts", self.max_retries)))
    }

    /// Try to connect to the cabinet and map its characteristics
    async fn try_connect(&self, device: &Device) -> Result<BluestTransport> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Device details - ID: {}, Name: {:?}", device.id(), name);

        if !device.is_connected().await {
            info!("Initiating connection to {}...", device.id());
            self.adapter.connect_device(device).await?;
        }

        info!("Connection successful, discovering services...");
        let service = device
            .discover_services_with_uuid(UUID_CABINET_SERVICE)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Cabinet service not found: {}", UUID_CABINET_SERVICE))?;
        info!("Found cabinet service: {}", service.uuid());

        let mut characteristics = HashMap::new();
        for characteristic in service.discover_characteristics().await? {
            let uuid = characteristic.uuid();
            let Some(kind) = CabinetCharacteristic::from_uuid(uuid) else {
                debug!("Ignoring unknown characteristic {}", uuid);
                continue;
            };
            let notify = match characteristic.properties().await {
                Ok(properties) => properties.notify,
                Err(e) => {
                    warn!("Could not read properties of '{}': {}", kind, e);
                    false
                }
            };
            info!("Found characteristic '{}' ({}), notify: {}", kind, uuid, notify);
            characteristics.insert(kind, MappedCharacteristic { characteristic, notify });
        }

        for kind in CabinetCharacteristic::ALL {
            if !characteristics.contains_key(&kind) {
                warn!("Characteristic '{}' not found on this device", kind);
            }
        }
        if characteristics.is_empty() {
            return Err(anyhow!("No cabinet characteristics found"));
        }

        Ok(BluestTransport::new(device.clone(), characteristics))
    }

    /// Disconnect from the cabinet
    pub async fn disconnect(&self, device: &Device) -> Result<()> {
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter.disconnect_device(device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", device.id());
        }
        Ok(())
    }
}
