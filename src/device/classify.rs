//! Capability-based device classification
//!
//! Predicates are pure. The list filters keep the caller's order and never
//! touch the records' read sessions.

use super::record::DeviceRecord;
use crate::capability::CapabilityIndex;
use crate::event::codes::key;
use crate::event::EventType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys a device must report to count as a keyboard: Escape, A, B, C, Enter.
///
/// Devices with `EV_KEY` but no typing keys (power buttons, lid switches,
/// remote controls) fail this check.
pub const DEFAULT_KEYBOARD_SIGNATURE: [u16; 5] = [
    key::KEY_ESC,
    key::KEY_A,
    key::KEY_B,
    key::KEY_C,
    key::KEY_ENTER,
];

/// Set of key codes identifying a keyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyboardSignature(Vec<u16>);

impl KeyboardSignature {
    pub fn new(codes: Vec<u16>) -> Self {
        Self(codes)
    }

    pub fn codes(&self) -> &[u16] {
        &self.0
    }
}

impl Default for KeyboardSignature {
    fn default() -> Self {
        Self(DEFAULT_KEYBOARD_SIGNATURE.to_vec())
    }
}

/// Coarse device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Keyboard,
    Pointer,
    Mouse,
    TouchDevice,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceClass::Keyboard => "keyboard",
            DeviceClass::Pointer => "pointer",
            DeviceClass::Mouse => "mouse",
            DeviceClass::TouchDevice => "touch",
        };
        write!(f, "{}", label)
    }
}

/// `EV_KEY`, no relative or absolute axes, and every signature key
pub fn is_keyboard(caps: &CapabilityIndex, signature: &KeyboardSignature) -> bool {
    caps.supports_event(EventType::KEY)
        && !caps.supports_event(EventType::REL)
        && !caps.supports_event(EventType::ABS)
        && caps.supports_all_keys(signature.codes())
}

/// `EV_REL` or `EV_ABS`
pub fn is_pointer(caps: &CapabilityIndex) -> bool {
    is_mouse(caps) || is_touch_device(caps)
}

/// `EV_REL`
pub fn is_mouse(caps: &CapabilityIndex) -> bool {
    caps.supports_event(EventType::REL)
}

/// `EV_ABS`
pub fn is_touch_device(caps: &CapabilityIndex) -> bool {
    caps.supports_event(EventType::ABS)
}

/// Every class `caps` falls into, most specific first
pub fn classes(caps: &CapabilityIndex, signature: &KeyboardSignature) -> Vec<DeviceClass> {
    let mut classes = Vec::new();
    if is_keyboard(caps, signature) {
        classes.push(DeviceClass::Keyboard);
    }
    if is_mouse(caps) {
        classes.push(DeviceClass::Mouse);
    }
    if is_touch_device(caps) {
        classes.push(DeviceClass::TouchDevice);
    }
    if is_pointer(caps) {
        classes.push(DeviceClass::Pointer);
    }
    classes
}

pub fn keyboards<'a>(
    devices: &'a [DeviceRecord],
    signature: &KeyboardSignature,
) -> Vec<&'a DeviceRecord> {
    devices
        .iter()
        .filter(|d| d.is_keyboard(signature))
        .collect()
}

pub fn pointers(devices: &[DeviceRecord]) -> Vec<&DeviceRecord> {
    devices.iter().filter(|d| d.is_pointer()).collect()
}

pub fn mice(devices: &[DeviceRecord]) -> Vec<&DeviceRecord> {
    devices.iter().filter(|d| d.is_mouse()).collect()
}

pub fn touch_devices(devices: &[DeviceRecord]) -> Vec<&DeviceRecord> {
    devices.iter().filter(|d| d.is_touch_device()).collect()
}
