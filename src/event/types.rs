//! Decoded event record

use super::codes::EventType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One decoded `struct input_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    /// Timestamp seconds
    pub sec: u64,
    /// Timestamp microseconds within `sec`
    pub usec: u64,
    /// Event category
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Type-specific code (key code, axis, ...)
    pub code: u16,
    /// Type-specific value (1 = key down, 0 = key up, axis delta, ...)
    pub value: i32,
}

impl EventRecord {
    pub fn new(sec: u64, usec: u64, event_type: EventType, code: u16, value: i32) -> Self {
        Self {
            sec,
            usec,
            event_type,
            code,
            value,
        }
    }

    /// Event timestamp as a duration since the kernel clock's epoch.
    /// `None` if the fields overflow a `Duration`.
    pub fn timestamp(&self) -> Option<Duration> {
        Duration::from_secs(self.sec).checked_add(Duration::from_micros(self.usec))
    }

    /// Check if this is a synchronization marker (`EV_SYN`)
    pub fn is_sync(&self) -> bool {
        self.event_type == EventType::SYN
    }

    /// Check if this is a key or button event
    pub fn is_key(&self) -> bool {
        self.event_type == EventType::KEY
    }
}
