//! K10 magnetic lock: status payload and lock commands

use std::fmt;

use log::warn;
use serde::Serialize;

use super::{parse_leading_int, split_pairs};

/// Lock commands written to the K10 characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum K10Command {
    /// The button went down
    Press,
    /// The button went up
    Release,
    /// The button was held for the full hold time
    Activate,
}

impl K10Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Press => "PRESS",
            Self::Release => "RELEASE",
            Self::Activate => "ACTIVATE",
        }
    }

    /// Convert the command to its byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_str().as_bytes().to_vec()
    }
}

/// Lock status reported as `LOCK:active,DOOR:open,HOLD:1000`.
///
/// Devices may send any subset of the fields, so every field is optional and
/// [`K10Status::merge`] only overwrites what a message actually carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct K10Status {
    pub lock_active: Option<bool>,
    pub door_open: Option<bool>,
    pub hold_time_ms: Option<u32>,
}

impl K10Status {
    pub fn parse(data: &str) -> Self {
        let mut status = Self::default();
        for (key, value) in split_pairs(data, ':') {
            match key {
                "LOCK" => status.lock_active = Some(value == "active"),
                "DOOR" => status.door_open = Some(value == "open"),
                "HOLD" => {
                    status.hold_time_ms = parse_leading_int(value).and_then(|ms| u32::try_from(ms).ok());
                    if status.hold_time_ms.is_none() {
                        warn!("Ignoring invalid K10 hold time {:?}", value);
                    }
                }
                _ => {}
            }
        }
        status
    }

    pub fn merge(&mut self, other: &K10Status) {
        if other.lock_active.is_some() {
            self.lock_active = other.lock_active;
        }
        if other.door_open.is_some() {
            self.door_open = other.door_open;
        }
        if other.hold_time_ms.is_some() {
            self.hold_time_ms = other.hold_time_ms;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_active.unwrap_or(false)
    }

    pub fn is_door_open(&self) -> bool {
        self.door_open.unwrap_or(false)
    }
}

impl fmt::Display for K10Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lock: {}", if self.is_locked() { "ACTIVATED" } else { "released" })?;
        writeln!(f, "Door: {}", if self.is_door_open() { "open" } else { "closed" })?;
        match self.hold_time_ms {
            Some(ms) => write!(f, "Hold time: {} ms", ms),
            None => write!(f, "Hold time: unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(K10Command::Press.to_bytes(), b"PRESS".to_vec());
        assert_eq!(K10Command::Release.to_bytes(), b"RELEASE".to_vec());
        assert_eq!(K10Command::Activate.to_bytes(), b"ACTIVATE".to_vec());
    }

    #[test]
    fn test_parse_status() {
        let status = K10Status::parse("LOCK:inactive,DOOR:closed,HOLD:1000");
        assert_eq!(status.lock_active, Some(false));
        assert_eq!(status.door_open, Some(false));
        assert_eq!(status.hold_time_ms, Some(1000));

        let status = K10Status::parse("LOCK: active , DOOR:open");
        assert!(status.is_locked());
        assert!(status.is_door_open());
        assert_eq!(status.hold_time_ms, None);
    }

    #[test]
    fn test_invalid_hold_is_ignored() {
        assert_eq!(K10Status::parse("HOLD:-5").hold_time_ms, None);
        assert_eq!(K10Status::parse("HOLD:soon").hold_time_ms, None);
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut status = K10Status::parse("LOCK:active,DOOR:closed,HOLD:1200");
        status.merge(&K10Status::parse("DOOR:open"));
        assert_eq!(status.lock_active, Some(true));
        assert_eq!(status.door_open, Some(true));
        assert_eq!(status.hold_time_ms, Some(1200));
    }
}
