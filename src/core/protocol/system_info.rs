use std::fmt;

use serde::Serialize;

use super::{parse_leading_float, split_pairs};

/// Status payload of the system info characteristic,
/// e.g. `E:1.5,RES_W:LOW,RES_S:OK,HUM_RELAY:ON,VENT_RELAY:OFF`.
///
/// Each message replaces the previous one completely; absent fields fall back
/// to the defaults reported by the accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    /// Humidifier efficiency in %/min
    pub efficiency: Option<f64>,
    /// Water reservoir status
    pub water: Option<String>,
    /// Silica gel status
    pub silica: Option<String>,
    /// Humidifier relay state
    pub humidifier_relay: Option<String>,
    /// Ventilation relay state
    pub vent_relay: Option<String>,
}

impl SystemInfo {
    pub fn parse(data: &str) -> Self {
        let mut info = Self::default();
        for (key, value) in split_pairs(data, ':') {
            match key {
                "E" => info.efficiency = parse_leading_float(value),
                "RES_W" => info.water = Some(value.to_string()),
                "RES_S" => info.silica = Some(value.to_string()),
                "HUM_RELAY" => info.humidifier_relay = Some(value.to_string()),
                "VENT_RELAY" => info.vent_relay = Some(value.to_string()),
                _ => log::debug!("Ignoring unknown system info field {}={}", key, value),
            }
        }
        info
    }

    pub fn water_status(&self) -> &str {
        self.water.as_deref().unwrap_or("OK")
    }

    pub fn silica_status(&self) -> &str {
        self.silica.as_deref().unwrap_or("OK")
    }

    pub fn humidifier_relay_status(&self) -> &str {
        self.humidifier_relay.as_deref().unwrap_or("OFF")
    }

    pub fn vent_relay_status(&self) -> &str {
        self.vent_relay.as_deref().unwrap_or("OFF")
    }
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(efficiency) = self.efficiency {
            writeln!(f, "Efficiency: {:.1}%/min", efficiency)?;
        }
        writeln!(f, "Water: {}", self.water_status())?;
        writeln!(f, "Silica gel: {}", self.silica_status())?;
        writeln!(f, "Humidifier relay: {}", self.humidifier_relay_status())?;
        write!(f, "Fan: {}", self.vent_relay_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let info = SystemInfo::parse("E:1.5,RES_W:LOW,RES_S:OK,HUM_RELAY:ON,VENT_RELAY:OFF");
        assert_eq!(info.efficiency, Some(1.5));
        assert_eq!(info.water_status(), "LOW");
        assert_eq!(info.silica_status(), "OK");
        assert_eq!(info.humidifier_relay_status(), "ON");
        assert_eq!(info.vent_relay_status(), "OFF");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let info = SystemInfo::parse("RES_S:EMPTY, X:1, broken");
        assert_eq!(info.efficiency, None);
        assert_eq!(info.water_status(), "OK");
        assert_eq!(info.silica_status(), "EMPTY");
        assert_eq!(info.humidifier_relay_status(), "OFF");
    }

    #[test]
    fn test_bad_efficiency_is_dropped() {
        let info = SystemInfo::parse("E:n/a,HUM_RELAY:ON");
        assert_eq!(info.efficiency, None);
        assert_eq!(info.humidifier_relay.as_deref(), Some("ON"));
    }

    #[test]
    fn test_display() {
        let info = SystemInfo::parse("E:2,VENT_RELAY:ON");
        let text = info.to_string();
        assert!(text.starts_with("Efficiency: 2.0%/min\n"));
        assert!(text.ends_with("Fan: ON"));
    }
}
