use std::collections::HashMap;
use std::pin::pin;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Result;
use bluest::{Adapter, Device};
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::types::BluetoothDevice;

static MAC_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").expect("valid MAC address pattern"));

/// What to look for during a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub timeout: Duration,
    pub name_prefix: String,
    /// Devices below this signal strength are ignored
    pub min_rssi: Option<i16>,
    /// Stop as soon as one cabinet was found
    pub stop_at_first: bool,
}

/// A device seen in an advertisement
pub(crate) struct Sighting<D> {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub device: D,
}

pub struct BluetoothScanner {
    adapter: Adapter,
    devices: Arc<Mutex<HashMap<String, Device>>>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, devices: Arc<Mutex<HashMap<String, Device>>>) -> Self {
        Self { adapter, devices }
    }

    /// Scans for cabinets until the timeout or until `cancel` fires.
    /// Devices already connected to this host are reported first.
    pub async fn scan(&self, options: &ScanOptions, cancel: &CancellationToken) -> Result<Vec<BluetoothDevice>> {
        self.devices.lock().await.clear();
        let mut found = Vec::new();

        info!("Checking for connected devices");
        for device in self.adapter.connected_devices().await? {
            let name = device.name().ok();
            if is_cabinet_name(name.as_deref(), &options.name_prefix) {
                found.push(self.add_device(device, name, None).await);
                if options.stop_at_first {
                    return Ok(found);
                }
            }
        }
        if found.is_empty() {
            info!("No connected cabinet detected");
        }

        info!("Starting bluetooth scan for {} s", options.timeout.as_secs());
        let scan_stream = self.adapter.scan(&[]).await?.map(|discovered| {
            let device = discovered.device;
            Sighting {
                id: device.id().to_string(),
                name: discovered.adv_data.local_name.or_else(|| device.name().ok()),
                rssi: discovered.rssi,
                device,
            }
        });
        let known: Vec<String> = found.iter().map(|d: &BluetoothDevice| d.id.clone()).collect();

        for sighting in collect_cabinets(scan_stream, options, cancel, &known).await {
            found.push(self.add_device(sighting.device, sighting.name, sighting.rssi).await);
        }

        info!("Scan complete, {} cabinet(s) found", found.len());
        Ok(found)
    }

    async fn add_device(&self, device: Device, name: Option<String>, rssi: Option<i16>) -> BluetoothDevice {
        let id = device.id().to_string();
        let address = extract_mac_address(&id).unwrap_or_else(|| "N/A".to_string());
        let is_connected = device.is_connected().await;
        let bluetooth_device = BluetoothDevice::new(
            id.clone(),
            name.unwrap_or_else(|| "Unknown".to_string()),
            address,
            rssi,
            is_connected,
        );
        info!("Found cabinet: {}", bluetooth_device);

        self.devices.lock().await.insert(id, device);
        bluetooth_device
    }
}

/// Keeps the cabinet sightings of `stream`, skipping ids in `known` and repeats.
///
/// Stops when the stream ends, the scan timeout passes or `cancel` fires, and
/// after the first match when `stop_at_first` is set.
pub(crate) async fn collect_cabinets<D, S>(
    stream: S,
    options: &ScanOptions,
    cancel: &CancellationToken,
    known: &[String],
) -> Vec<Sighting<D>>
where
    S: Stream<Item = Sighting<D>>,
{
    let mut stream = pin!(stream);
    let deadline = sleep(options.timeout);
    tokio::pin!(deadline);
    let mut found: Vec<Sighting<D>> = Vec::new();

    loop {
        tokio::select! {
            result = stream.next() => {
                let Some(sighting) = result else {
                    info!("Bluetooth scan stream has ended.");
                    break;
                };
                debug!("Found device - Name: {:?}, RSSI: {:?}", sighting.name, sighting.rssi);

                if !is_cabinet_name(sighting.name.as_deref(), &options.name_prefix)
                    || !rssi_acceptable(sighting.rssi, options.min_rssi)
                {
                    continue;
                }
                if known.contains(&sighting.id) || found.iter().any(|f| f.id == sighting.id) {
                    continue;
                }
                found.push(sighting);
                if options.stop_at_first {
                    break;
                }
            }
            _ = &mut deadline => {
                info!("Scan timeout reached");
                break;
            }
            _ = cancel.cancelled() => {
                info!("Scan cancelled");
                break;
            }
        }
    }
    found
}

/// Last MAC-looking substring of a platform device id, upper-cased
pub fn extract_mac_address(device_id: &str) -> Option<String> {
    MAC_ADDRESS
        .find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase())
}

/// Returns true if the advertised name belongs to a cabinet
pub fn is_cabinet_name(name: Option<&str>, prefix: &str) -> bool {
    name.map(|name| name.starts_with(prefix)).unwrap_or(false)
}

fn rssi_acceptable(rssi: Option<i16>, min_rssi: Option<i16>) -> bool {
    match (rssi, min_rssi) {
        (_, None) => true,
        (Some(rssi), Some(min)) => rssi >= min,
        (None, Some(_)) => false,
    }
}
