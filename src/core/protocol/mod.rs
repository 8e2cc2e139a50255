//! Wire codec for the cabinet characteristics
//! Every characteristic carries a short UTF-8 string: a tagged sensor reading,
//! a comma separated list of `KEY:value` pairs, or the `key=value` settings string.

mod command;
mod definitions;
mod k10;
mod sensor;
mod settings;
mod system_info;

use serde::Serialize;
use thiserror::Error;

use crate::core::bluetooth::CabinetCharacteristic;

pub use command::DeviceCommand;
pub use definitions::{
    SETTING_DEFINITIONS, SelectOption, SettingDefinition, SettingError, SettingGroup, SettingKind,
    SettingRow, find_definition, grouped_settings,
};
pub use k10::{K10Command, K10Status};
pub use sensor::{HUMIDITY_TAG, TEMPERATURE_TAG, parse_humidity, parse_temperature};
pub use settings::{Settings, canonical_key, diff_settings, encode_settings, parse_edit};
pub use system_info::SystemInfo;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("expected a '{expected}' reading, got {payload:?}")]
    MissingTag { expected: &'static str, payload: String },

    #[error("not a number: {0:?}")]
    InvalidNumber(String),

    #[error("{0:?} contains a reserved character (',' or '=')")]
    ReservedCharacter(String),

    #[error("characteristic '{0}' does not carry decodable state")]
    NotDecodable(CabinetCharacteristic),

    #[error("unknown characteristic: {0}")]
    UnknownCharacteristic(String),
}

/// A typed value decoded from one characteristic payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CabinetUpdate {
    Temperature(f64),
    Humidity(f64),
    SystemInfo(SystemInfo),
    K10(K10Status),
    Settings(Settings),
}

/// Decodes a raw payload read from (or notified by) `characteristic`.
pub fn decode(characteristic: CabinetCharacteristic, bytes: &[u8]) -> Result<CabinetUpdate, ProtocolError> {
    let data = decode_utf8(bytes);
    match characteristic {
        CabinetCharacteristic::CurrentTemperature => parse_temperature(&data).map(CabinetUpdate::Temperature),
        CabinetCharacteristic::CurrentHumidity => parse_humidity(&data).map(CabinetUpdate::Humidity),
        CabinetCharacteristic::SystemInfo => Ok(CabinetUpdate::SystemInfo(SystemInfo::parse(&data))),
        CabinetCharacteristic::K10 => Ok(CabinetUpdate::K10(K10Status::parse(&data))),
        CabinetCharacteristic::AllSettings => Ok(CabinetUpdate::Settings(Settings::parse(&data))),
        other => Err(ProtocolError::NotDecodable(other)),
    }
}

/// Invalid sequences are replaced rather than rejected.
pub fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Splits `a<d>b,c<d>e` into trimmed pairs, skipping items without a key or a value.
pub(crate) fn split_pairs(data: &str, delimiter: char) -> impl Iterator<Item = (&str, &str)> {
    data.split(',').filter_map(move |item| {
        let (key, value) = item.split_once(delimiter)?;
        let (key, value) = (key.trim(), value.trim());
        (!key.is_empty() && !value.is_empty()).then_some((key, value))
    })
}

/// Parses the longest numeric prefix of `text`, so `"24.5C"` yields `24.5`.
pub(crate) fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - end - 1;
        if digits + frac_digits > 0 {
            digits += frac_digits;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses the leading integer of `text`, so `"1000ms"` and `"12.7"` yield 1000 and 12.
pub(crate) fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    text[..end].parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pairs_uses_first_delimiter() {
        let pairs: Vec<_> = split_pairs(" a : 1 ,b:2:3,:4,c:, d", ':').collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2:3")]);
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("24.5"), Some(24.5));
        assert_eq!(parse_leading_float("  -3.25C"), Some(-3.25));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("7."), Some(7.0));
        assert_eq!(parse_leading_float("1e2x"), Some(100.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("nan"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("1000"), Some(1000));
        assert_eq!(parse_leading_int("12.7"), Some(12));
        assert_eq!(parse_leading_int(" -4 "), Some(-4));
        assert_eq!(parse_leading_int("ms"), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn test_decode_by_characteristic() {
        assert_eq!(
            decode(CabinetCharacteristic::CurrentTemperature, b"T:24.5"),
            Ok(CabinetUpdate::Temperature(24.5))
        );
        assert_eq!(
            decode(CabinetCharacteristic::CurrentHumidity, b"H:55.1"),
            Ok(CabinetUpdate::Humidity(55.1))
        );
        match decode(CabinetCharacteristic::K10, b"LOCK:active,DOOR:open,HOLD:1500") {
            Ok(CabinetUpdate::K10(status)) => {
                assert_eq!(status.lock_active, Some(true));
                assert_eq!(status.hold_time_ms, Some(1500));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            decode(CabinetCharacteristic::Command, b"REBOOT"),
            Err(ProtocolError::NotDecodable(CabinetCharacteristic::Command))
        );
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        assert_eq!(decode_utf8(b"T:2\xff"), "T:2\u{fffd}");
        assert_eq!(
            decode(CabinetCharacteristic::CurrentTemperature, b"T:2\xff"),
            Ok(CabinetUpdate::Temperature(2.0))
        );
    }
}
