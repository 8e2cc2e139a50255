//! Metadata for every setting the controller exposes
//! The table drives validation, normalization of edited values and grouping for display.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use super::{Settings, parse_leading_float, parse_leading_int};

#[derive(Debug, Error, PartialEq)]
pub enum SettingError {
    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("setting '{0}' is read-only")]
    ReadOnly(String),

    #[error("'{key}' must be a number, got {value:?}")]
    NotANumber { key: String, value: String },

    #[error("'{key}' must be between {min} and {max}, got {value}")]
    OutOfRange { key: String, value: String, min: f64, max: f64 },

    #[error("'{key}' must be one of {allowed}, got {value:?}")]
    NotAnOption { key: String, value: String, allowed: String },

    #[error("'{key}' must be on/off, got {value:?}")]
    NotABoolean { key: String, value: String },

    #[error("expected key=value, got {0:?}")]
    MalformedEdit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SettingGroup {
    Main,
    Timeouts,
    SoundAlerts,
    WaterHeater,
    HumidityLogic,
    DhtCalibration,
    AutoReboot,
    Statistics,
    Other,
}

impl SettingGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Timeouts => "Timeouts",
            Self::SoundAlerts => "Sound alerts",
            Self::WaterHeater => "Water heater",
            Self::HumidityLogic => "Humidity logic",
            Self::DhtCalibration => "DHT calibration",
            Self::AutoReboot => "Auto reboot",
            Self::Statistics => "Statistics",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingKind {
    Number {
        min: f64,
        max: f64,
        step: f64,
        unit: &'static str,
        /// Sent with one decimal place instead of as an integer
        float: bool,
    },
    Select {
        options: &'static [SelectOption],
    },
    Checkbox,
    ReadOnly {
        /// Unix seconds
        timestamp: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: SettingKind,
    pub group: SettingGroup,
}

const fn int(min: f64, max: f64, step: f64, unit: &'static str) -> SettingKind {
    SettingKind::Number { min, max, step, unit, float: false }
}

const fn float(min: f64, max: f64, step: f64, unit: &'static str) -> SettingKind {
    SettingKind::Number { min, max, step, unit, float: true }
}

const fn def(key: &'static str, label: &'static str, kind: SettingKind, group: SettingGroup) -> SettingDefinition {
    SettingDefinition { key, label, kind, group }
}

const fn opt(value: &'static str, text: &'static str) -> SelectOption {
    SelectOption { value, text }
}

const LOCK_TIMEOUT_OPTIONS: &[SelectOption] =
    &[opt("0", "Off"), opt("1", "30 s"), opt("2", "1 min"), opt("3", "2 min"), opt("4", "5 min")];

const MENU_TIMEOUT_OPTIONS: &[SelectOption] =
    &[opt("0", "Off"), opt("1", "15 s"), opt("2", "30 s"), opt("3", "1 min"), opt("4", "2 min")];

const SCREEN_TIMEOUT_OPTIONS: &[SelectOption] =
    &[opt("0", "Off"), opt("1", "30 s"), opt("2", "1 min"), opt("3", "5 min"), opt("4", "10 min")];

const READ_ONLY: SettingKind = SettingKind::ReadOnly { timestamp: false };

use SettingGroup::*;

pub static SETTING_DEFINITIONS: &[SettingDefinition] = &[
    def("targetHumidity", "Target humidity", int(0.0, 100.0, 1.0, "%"), Main),
    def("lockHoldTime", "Lock hold time (K10)", int(100.0, 5000.0, 100.0, " ms"), Main),
    def("lockTimeIndex", "Menu lock timeout", SettingKind::Select { options: LOCK_TIMEOUT_OPTIONS }, Timeouts),
    def("menuTimeoutOptionIndex", "Menu timeout", SettingKind::Select { options: MENU_TIMEOUT_OPTIONS }, Timeouts),
    def("screenTimeoutOptionIndex", "Screen timeout", SettingKind::Select { options: SCREEN_TIMEOUT_OPTIONS }, Timeouts),
    def("doorSoundEnabled", "Open door sound", SettingKind::Checkbox, SoundAlerts),
    def("waterSilicaSoundEnabled", "Resource sound", SettingKind::Checkbox, SoundAlerts),
    def("waterHeaterEnabled", "Water heater", SettingKind::Checkbox, WaterHeater),
    def("waterHeaterMaxTemp", "Max heater temperature", int(20.0, 45.0, 1.0, "°C"), WaterHeater),
    def("deadZonePercent", "Dead zone", float(0.1, 10.0, 0.1, "%"), HumidityLogic),
    def("minHumidityChange", "Min humidity change (timer)", float(0.1, 5.0, 0.1, "%"), HumidityLogic),
    def("maxOperationDuration", "Max operation time", int(1.0, 60.0, 1.0, " min"), HumidityLogic),
    def("operationCooldown", "Cooldown", int(1.0, 30.0, 1.0, " min"), HumidityLogic),
    def("maxSafeHumidity", "Max safe humidity", int(50.0, 100.0, 1.0, "%"), HumidityLogic),
    def("resourceCheckDiff", "Resource difference threshold", int(1.0, 20.0, 1.0, "%"), HumidityLogic),
    def("humidityHysteresis", "Humidity hysteresis", float(0.1, 5.0, 0.1, "%"), HumidityLogic),
    def("lowFaultThreshold", "Low resource threshold", int(1.0, 10.0, 1.0, ""), HumidityLogic),
    def("emptyFaultThreshold", "Empty resource threshold", int(1.0, 20.0, 1.0, ""), HumidityLogic),
    def("tempOffsetTop", "Temperature offset (top)", int(-20.0, 20.0, 1.0, "°C"), DhtCalibration),
    def("humOffsetTop", "Humidity offset (top)", int(-20.0, 20.0, 1.0, "%"), DhtCalibration),
    def("tempOffsetHum", "Temperature offset (humidifier)", int(-20.0, 20.0, 1.0, "°C"), DhtCalibration),
    def("humOffsetHum", "Humidity offset (humidifier)", int(-20.0, 20.0, 1.0, "%"), DhtCalibration),
    def("autoRebootEnabled", "Auto reboot", SettingKind::Checkbox, AutoReboot),
    def("autoRebootHour", "Reboot hour", int(0.0, 23.0, 1.0, " h"), AutoReboot),
    def("autoRebootMinute", "Reboot minute", int(0.0, 59.0, 1.0, " min"), AutoReboot),
    def("autoRebootDays", "Reboot interval", int(1.0, 30.0, 1.0, " days"), AutoReboot),
    def("resetCount", "Manual resets", READ_ONLY, Statistics),
    def("wdtResetCount", "Watchdog resets", READ_ONLY, Statistics),
    def("autoRebootCounter", "Auto reboots", READ_ONLY, Statistics),
    def("totalRebootCounter", "Total reboots", READ_ONLY, Statistics),
    def("lastRebootTimestamp", "Last reboot", SettingKind::ReadOnly { timestamp: true }, Statistics),
];

/// Looks a setting up by key, returning its position in the table as well.
pub fn find_definition(key: &str) -> Option<(usize, &'static SettingDefinition)> {
    SETTING_DEFINITIONS.iter().enumerate().find(|(_, d)| d.key == key)
}

impl SettingDefinition {
    pub fn is_writable(&self) -> bool {
        !matches!(self.kind, SettingKind::ReadOnly { .. })
    }

    /// Converts a user supplied value into the exact form the controller expects.
    pub fn normalize(&self, raw: &str) -> Result<String, SettingError> {
        let raw = raw.trim();
        match self.kind {
            SettingKind::Number { min, max, float, .. } => {
                let not_a_number = || SettingError::NotANumber {
                    key: self.key.to_string(),
                    value: raw.to_string(),
                };
                let (value, text) = if float {
                    let value = parse_leading_float(raw).ok_or_else(not_a_number)?;
                    let rounded = (value * 10.0).round() / 10.0;
                    (rounded, format!("{:.1}", rounded))
                } else {
                    let value = parse_leading_int(raw).ok_or_else(not_a_number)?;
                    (value as f64, value.to_string())
                };
                if value < min || value > max {
                    return Err(SettingError::OutOfRange {
                        key: self.key.to_string(),
                        value: text,
                        min,
                        max,
                    });
                }
                Ok(text)
            }
            SettingKind::Select { options } => options
                .iter()
                .find(|o| o.value == raw)
                .map(|o| o.value.to_string())
                .ok_or_else(|| SettingError::NotAnOption {
                    key: self.key.to_string(),
                    value: raw.to_string(),
                    allowed: options.iter().map(|o| o.value).collect::<Vec<_>>().join("/"),
                }),
            SettingKind::Checkbox => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok("1".to_string()),
                "0" | "false" | "off" | "no" => Ok("0".to_string()),
                _ => Err(SettingError::NotABoolean {
                    key: self.key.to_string(),
                    value: raw.to_string(),
                }),
            },
            SettingKind::ReadOnly { .. } => Err(SettingError::ReadOnly(self.key.to_string())),
        }
    }

    /// Human readable rendering of a raw value read from the device
    pub fn display_value(&self, raw: &str) -> String {
        match self.kind {
            SettingKind::Number { unit, .. } => format!("{}{}", raw, unit),
            SettingKind::Select { options } => options
                .iter()
                .find(|o| o.value == raw)
                .map(|o| o.text.to_string())
                .unwrap_or_else(|| raw.to_string()),
            SettingKind::Checkbox => (if raw == "1" { "on" } else { "off" }).to_string(),
            SettingKind::ReadOnly { timestamp: true } => raw
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| raw.to_string()),
            SettingKind::ReadOnly { timestamp: false } => raw.to_string(),
        }
    }
}

/// One row of a grouped settings listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRow {
    pub key: String,
    pub label: String,
    pub raw: String,
    pub display: String,
    pub writable: bool,
}

/// Groups the values read from the device by section, in table order.
/// Keys the table does not know (newer firmware) end up under [`SettingGroup::Other`].
pub fn grouped_settings(settings: &Settings) -> BTreeMap<SettingGroup, Vec<SettingRow>> {
    let mut groups: BTreeMap<SettingGroup, Vec<SettingRow>> = BTreeMap::new();
    for definition in SETTING_DEFINITIONS {
        let Some(raw) = settings.get(definition.key) else {
            continue;
        };
        groups.entry(definition.group).or_default().push(SettingRow {
            key: definition.key.to_string(),
            label: definition.label.to_string(),
            raw: raw.to_string(),
            display: definition.display_value(raw),
            writable: definition.is_writable(),
        });
    }
    for (key, raw) in settings.iter() {
        if find_definition(key).is_none() {
            groups.entry(SettingGroup::Other).or_default().push(SettingRow {
                key: key.to_string(),
                label: key.to_string(),
                raw: raw.to_string(),
                display: raw.to_string(),
                writable: false,
            });
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(key: &str) -> &'static SettingDefinition {
        find_definition(key).unwrap().1
    }

    #[test]
    fn test_table_is_complete() {
        assert_eq!(SETTING_DEFINITIONS.len(), 31);
        let writable = SETTING_DEFINITIONS.iter().filter(|d| d.is_writable()).count();
        assert_eq!(writable, 26);
        assert_eq!(find_definition("targetHumidity").unwrap().0, 0);
        assert!(find_definition("hysteresis").is_none());
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(definition("targetHumidity").normalize("55"), Ok("55".to_string()));
        assert_eq!(definition("targetHumidity").normalize(" 55.7 "), Ok("55".to_string()));
        assert_eq!(definition("deadZonePercent").normalize("2"), Ok("2.0".to_string()));
        assert_eq!(definition("deadZonePercent").normalize("1.26"), Ok("1.3".to_string()));
        assert_eq!(definition("tempOffsetTop").normalize("-3"), Ok("-3".to_string()));
        assert!(matches!(
            definition("lockHoldTime").normalize("50"),
            Err(SettingError::OutOfRange { .. })
        ));
        assert!(matches!(
            definition("humidityHysteresis").normalize("0.04"),
            Err(SettingError::OutOfRange { .. })
        ));
        assert!(matches!(
            definition("autoRebootHour").normalize("noon"),
            Err(SettingError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_normalize_select_and_checkbox() {
        assert_eq!(definition("lockTimeIndex").normalize("3"), Ok("3".to_string()));
        assert_eq!(
            definition("lockTimeIndex").normalize("7"),
            Err(SettingError::NotAnOption {
                key: "lockTimeIndex".to_string(),
                value: "7".to_string(),
                allowed: "0/1/2/3/4".to_string(),
            })
        );
        assert_eq!(definition("doorSoundEnabled").normalize("On"), Ok("1".to_string()));
        assert_eq!(definition("doorSoundEnabled").normalize("false"), Ok("0".to_string()));
        assert!(definition("doorSoundEnabled").normalize("maybe").is_err());
    }

    #[test]
    fn test_read_only_rejected() {
        assert_eq!(
            definition("resetCount").normalize("0"),
            Err(SettingError::ReadOnly("resetCount".to_string()))
        );
    }

    #[test]
    fn test_display_values() {
        assert_eq!(definition("lockHoldTime").display_value("1000"), "1000 ms");
        assert_eq!(definition("screenTimeoutOptionIndex").display_value("4"), "10 min");
        assert_eq!(definition("screenTimeoutOptionIndex").display_value("9"), "9");
        assert_eq!(definition("waterHeaterEnabled").display_value("1"), "on");
        assert_eq!(definition("wdtResetCount").display_value("7"), "7");
        assert_eq!(definition("lastRebootTimestamp").display_value("never"), "never");

        let expected = DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(definition("lastRebootTimestamp").display_value("1700000000"), expected);
    }

    #[test]
    fn test_grouping() {
        let settings = Settings::parse("resetCount=2,targetHumidity=50,futureKey=9,lockHoldTime=1000");
        let groups = grouped_settings(&settings);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![SettingGroup::Main, SettingGroup::Statistics, SettingGroup::Other]);

        let main: Vec<_> = groups[&SettingGroup::Main].iter().map(|r| r.key.as_str()).collect();
        assert_eq!(main, vec!["targetHumidity", "lockHoldTime"]);
        assert!(!groups[&SettingGroup::Statistics][0].writable);
        assert_eq!(groups[&SettingGroup::Other][0].key, "futureKey");
    }
}
