//! Errors surfaced by the control panel operations

use thiserror::Error;

use crate::core::bluetooth::CabinetCharacteristic;
use crate::core::protocol::{ProtocolError, SettingError};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("device is not connected")]
    NotConnected,

    #[error("characteristic '{0}' is not available on this device")]
    CharacteristicUnavailable(CabinetCharacteristic),

    #[error(transparent)]
    Setting(#[from] SettingError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
