use serde::Serialize;

/// Maintenance commands written to the command characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceCommand {
    /// Restore factory settings, then restart
    ResetToDefaults,
    /// Restart the controller
    Reboot,
}

impl DeviceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResetToDefaults => "RESET_TO_DEFAULTS",
            Self::Reboot => "REBOOT",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_str().as_bytes().to_vec()
    }

    /// Whether the device drops the link after executing the command
    pub fn restarts_device(&self) -> bool {
        matches!(self, Self::ResetToDefaults | Self::Reboot)
    }
}
