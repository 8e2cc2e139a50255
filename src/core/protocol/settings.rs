//! The settings string: `key1=val1,key2=val2,...`

use std::collections::BTreeMap;

use serde::Serialize;

use super::definitions::{SettingError, find_definition};
use super::{ProtocolError, split_pairs};

/// Older firmware builds used different names for a couple of keys.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("hysteresis", "humidityHysteresis"),
    ("rebootCounter", "autoRebootCounter"),
];

pub fn canonical_key(key: &str) -> &str {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key)
}

/// Last known settings of the controller, keyed by canonical setting name.
/// Keys the device spells with an older alias are written back with that spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, String>,
    #[serde(skip)]
    wire_keys: BTreeMap<String, String>,
}

impl Settings {
    pub fn parse(data: &str) -> Self {
        let mut settings = Self::default();
        for (key, value) in split_pairs(data, '=') {
            settings.insert(key, value);
        }
        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(canonical_key(key)).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        let canonical = canonical_key(key);
        if canonical != key {
            self.wire_keys.insert(canonical.to_string(), key.to_string());
        }
        self.values.insert(canonical.to_string(), value.to_string());
    }

    /// The spelling the device uses for `key`
    pub fn wire_key<'a>(&'a self, key: &'a str) -> &'a str {
        let canonical = canonical_key(key);
        self.wire_keys.get(canonical).map(String::as_str).unwrap_or(canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Serializes pairs in the order given.
pub fn encode_settings(pairs: &[(String, String)]) -> Result<String, ProtocolError> {
    let mut encoded = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        for part in [key, value] {
            if part.is_empty() || part.contains(|c: char| c == ',' || c == '=') {
                return Err(ProtocolError::ReservedCharacter(part.clone()));
            }
        }
        encoded.push(format!("{}={}", key, value));
    }
    Ok(encoded.join(","))
}

/// Returns the edits that actually change something, normalized and in table order.
/// Keys are spelled the way the device reported them.
///
/// Both sides are normalized before comparing, so `deadZonePercent=2` on the
/// device and an edit of `2.0` count as equal. When the same key is edited more
/// than once the last edit wins.
pub fn diff_settings(
    current: &Settings,
    edits: &[(String, String)],
) -> Result<Vec<(String, String)>, SettingError> {
    let mut changed: BTreeMap<usize, (String, String)> = BTreeMap::new();

    for (key, value) in edits {
        let key = canonical_key(key.trim());
        let (index, definition) =
            find_definition(key).ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
        if !definition.is_writable() {
            return Err(SettingError::ReadOnly(key.to_string()));
        }
        let wanted = definition.normalize(value)?;

        let existing = current
            .get(key)
            .map(|raw| definition.normalize(raw).unwrap_or_else(|_| raw.to_string()));
        if existing.as_deref() == Some(wanted.as_str()) {
            changed.remove(&index);
        } else {
            changed.insert(index, (current.wire_key(key).to_string(), wanted));
        }
    }

    Ok(changed.into_values().collect())
}

/// Parses `key=value` command line edits.
pub fn parse_edit(edit: &str) -> Result<(String, String), SettingError> {
    let (key, value) = edit
        .split_once('=')
        .ok_or_else(|| SettingError::MalformedEdit(edit.to_string()))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(SettingError::MalformedEdit(edit.to_string()));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edits(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_settings() {
        let settings = Settings::parse("targetHumidity=50, lockHoldTime = 1000 ,bad,=3,empty=,deadZonePercent=1.5");
        assert_eq!(settings.len(), 3);
        assert_eq!(settings.get("targetHumidity"), Some("50"));
        assert_eq!(settings.get("lockHoldTime"), Some("1000"));
        assert_eq!(settings.get("deadZonePercent"), Some("1.5"));
        assert_eq!(settings.get("empty"), None);
    }

    #[test]
    fn test_value_keeps_everything_after_first_equals() {
        let settings = Settings::parse("note=a=b");
        assert_eq!(settings.get("note"), Some("a=b"));
    }

    #[test]
    fn test_aliases_are_canonicalized() {
        let settings = Settings::parse("hysteresis=0.5,rebootCounter=4");
        assert_eq!(settings.get("humidityHysteresis"), Some("0.5"));
        assert_eq!(settings.get("autoRebootCounter"), Some("4"));
        assert_eq!(settings.get("hysteresis"), Some("0.5"));
    }

    #[test]
    fn test_encode() {
        let encoded = encode_settings(&edits(&[("targetHumidity", "55"), ("deadZonePercent", "1.5")])).unwrap();
        assert_eq!(encoded, "targetHumidity=55,deadZonePercent=1.5");
        assert_eq!(encode_settings(&[]).unwrap(), "");
        assert_eq!(
            encode_settings(&edits(&[("a", "1,b=2")])),
            Err(ProtocolError::ReservedCharacter("1,b=2".to_string()))
        );
    }

    #[test]
    fn test_diff_only_changed_in_table_order() {
        let current = Settings::parse("targetHumidity=50,lockHoldTime=1000,doorSoundEnabled=1,deadZonePercent=2");
        let diff = diff_settings(
            &current,
            &edits(&[
                ("doorSoundEnabled", "off"),
                ("deadZonePercent", "2.0"),
                ("targetHumidity", "55"),
                ("lockHoldTime", "1000"),
            ]),
        )
        .unwrap();
        assert_eq!(diff, edits(&[("targetHumidity", "55"), ("doorSoundEnabled", "0")]));
    }

    #[test]
    fn test_diff_last_edit_wins() {
        let current = Settings::parse("targetHumidity=50");
        let diff = diff_settings(&current, &edits(&[("targetHumidity", "60"), ("targetHumidity", "50")])).unwrap();
        assert!(diff.is_empty());

        let diff = diff_settings(&current, &edits(&[("targetHumidity", "50"), ("targetHumidity", "65")])).unwrap();
        assert_eq!(diff, edits(&[("targetHumidity", "65")]));
    }

    #[test]
    fn test_diff_includes_keys_missing_on_device() {
        let diff = diff_settings(&Settings::default(), &edits(&[("hysteresis", "0.55")])).unwrap();
        assert_eq!(diff, edits(&[("humidityHysteresis", "0.6")]));
    }

    #[test]
    fn test_diff_keeps_device_key_spelling() {
        let current = Settings::parse("hysteresis=0.5,rebootCounter=3,targetHumidity=50");
        assert_eq!(current.wire_key("humidityHysteresis"), "hysteresis");
        assert_eq!(current.wire_key("targetHumidity"), "targetHumidity");

        let diff = diff_settings(
            &current,
            &edits(&[("humidityHysteresis", "0.8"), ("targetHumidity", "55")]),
        )
        .unwrap();
        assert_eq!(diff, edits(&[("targetHumidity", "55"), ("hysteresis", "0.8")]));
    }

    #[test]
    fn test_diff_rejects_invalid_edits() {
        let current = Settings::default();
        assert_eq!(
            diff_settings(&current, &edits(&[("colour", "red")])),
            Err(SettingError::UnknownKey("colour".to_string()))
        );
        assert_eq!(
            diff_settings(&current, &edits(&[("totalRebootCounter", "0")])),
            Err(SettingError::ReadOnly("totalRebootCounter".to_string()))
        );
        assert!(diff_settings(&current, &edits(&[("autoRebootHour", "24")])).is_err());
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(parse_edit("targetHumidity = 55"), Ok(("targetHumidity".to_string(), "55".to_string())));
        assert!(parse_edit("targetHumidity").is_err());
        assert!(parse_edit("=5").is_err());
    }
}
