//! Bluetooth manager for the cabinet control panel
//! This module provides the main interface for bluetooth operations

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use bluest::{Adapter, Device};
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::PanelConfig;
use crate::core::bluetooth::commands::{CommandExecutor, PressHold};
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::poller::Poller;
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::bluetooth::scanner::extract_mac_address;
use crate::core::bluetooth::transport::BluestTransport;
use crate::core::bluetooth::types::BluetoothDevice;
use crate::core::protocol::DeviceCommand;
use crate::core::session::{CabinetState, Session};
use crate::error::PanelError;

/// Everything owned by an established connection
struct ActiveConnection {
    device: BluetoothDevice,
    session: Arc<Session<BluestTransport>>,
    executor: CommandExecutor<BluestTransport>,
    notifications: NotificationHandler,
    poller: Poller,
}

/// Manages Bluetooth operations
pub struct CabinetManager {
    config: PanelConfig,
    /// Map of device ids to devices found by the last scan
    devices: Arc<Mutex<HashMap<String, Device>>>,
    connection_manager: ConnectionManager,
    scanner: BluetoothScanner,
    active: Option<ActiveConnection>,
}

impl CabinetManager {
    /// Creates a new CabinetManager on the default adapter
    pub async fn new(config: PanelConfig) -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");

        let devices = Arc::new(Mutex::new(HashMap::new()));
        let connection_manager = ConnectionManager::new(
            adapter.clone(),
            config.connection.connect_retries,
            config.connection.retry_delay(),
        );
        let scanner = BluetoothScanner::new(adapter, devices.clone());

        Ok(Self {
            config,
            devices,
            connection_manager,
            scanner,
            active: None,
        })
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Scans for cabinets using the configured prefix, RSSI floor and timeout.
    /// Cancelling `cancel` ends the scan early with what was found so far.
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<Vec<BluetoothDevice>> {
        let options = self.config.connection.scan_options(false);
        self.scanner.scan(&options, cancel).await
    }

    /// Connects to the device with the given id, or to the first cabinet found.
    ///
    /// On success everything is loaded once, then notifications and polling start.
    pub async fn connect(&mut self, device_id: Option<&str>) -> Result<CabinetState> {
        if let Some(active) = &self.active {
            if device_id.is_none_or(|id| id == active.device.id) {
                info!("Device already connected.");
                return Ok(active.session.snapshot().await);
            }
            self.disconnect().await?;
        }

        let device = self.find_device(device_id).await?;
        let transport = self.connection_manager.connect_with_retry(&device).await?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let id = device.id().to_string();
        let address = extract_mac_address(&id).unwrap_or_else(|| "N/A".to_string());
        let info = BluetoothDevice::new(id, name, address, None, true);

        let session = Arc::new(Session::new(transport));
        let state = session.load_all_data().await;
        let notifications = NotificationHandler::start(session.clone()).await;
        info!("{} notification subscription(s) active", notifications.active_subscriptions());
        let poller = Poller::start(session.clone(), self.config.timing.poll_interval());
        let executor = CommandExecutor::new(session.clone(), self.config.timing.command_timing());

        info!("Connected to {}", info);
        self.active = Some(ActiveConnection {
            device: info,
            session,
            executor,
            notifications,
            poller,
        });
        Ok(state)
    }

    async fn find_device(&mut self, device_id: Option<&str>) -> Result<Device> {
        if let Some(device) = self.lookup(device_id).await {
            return Ok(device);
        }

        let options = self.config.connection.scan_options(device_id.is_none());
        let found = self.scanner.scan(&options, &CancellationToken::new()).await?;
        if found.is_empty() {
            return Err(anyhow!("No {} device found", self.config.connection.name_prefix));
        }

        self.lookup(device_id).await.ok_or_else(|| match device_id {
            Some(id) => anyhow!("Device not found with ID: {}", id),
            None => anyhow!("No device found"),
        })
    }

    async fn lookup(&self, device_id: Option<&str>) -> Option<Device> {
        let devices = self.devices.lock().await;
        match device_id {
            Some(id) => devices.get(id).cloned(),
            None => devices.values().next().cloned(),
        }
    }

    pub fn connected_device(&self) -> Option<&BluetoothDevice> {
        self.active.as_ref().map(|active| &active.device)
    }

    pub fn session(&self) -> Result<Arc<Session<BluestTransport>>> {
        self.active
            .as_ref()
            .map(|active| active.session.clone())
            .ok_or_else(|| PanelError::NotConnected.into())
    }

    pub fn executor(&self) -> Result<CommandExecutor<BluestTransport>> {
        self.active
            .as_ref()
            .map(|active| active.executor.clone())
            .ok_or_else(|| PanelError::NotConnected.into())
    }

    pub fn press_hold(&self) -> Result<PressHold<BluestTransport>> {
        Ok(self.executor()?.press_hold())
    }

    /// Sends a device command; the link is dropped once the device restarts.
    pub async fn send_device_command(&mut self, command: DeviceCommand) -> Result<()> {
        let executor = self.executor()?;
        if let Some(delay) = executor.send_device_command(command).await? {
            sleep(delay).await;
            self.disconnect().await?;
        }
        Ok(())
    }

    /// Stops polling and notifications, then drops the link. Does nothing when not connected.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            info!("No device connected");
            return Ok(());
        };

        active.poller.stop().await;
        active.notifications.stop().await;
        let device = active.session.transport().device().clone();
        drop(active.executor);
        drop(active.session);
        info!("Connected state cleared, releasing device and characteristic objects.");

        if let Err(e) = self.connection_manager.disconnect(&device).await {
            warn!("Failed to disconnect cleanly: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Checks if a device is currently connected.
    pub async fn is_connected(&self) -> bool {
        match &self.active {
            Some(active) => active.session.transport().device().is_connected().await,
            None => false,
        }
    }
}
