//! Input event type and key code constants
//!
//! Values mirror `linux/input-event-codes.h`. Only the codes the crate itself
//! reasons about are named here; any other `u16` is still a valid code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event category (`EV_*`)
///
/// Doubles as the bit index into a device's event-type capability mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub u16);

impl EventType {
    pub const SYN: EventType = EventType(0x00);
    pub const KEY: EventType = EventType(0x01);
    pub const REL: EventType = EventType(0x02);
    pub const ABS: EventType = EventType(0x03);
    pub const MSC: EventType = EventType(0x04);
    pub const SW: EventType = EventType(0x05);
    pub const LED: EventType = EventType(0x11);
    pub const SND: EventType = EventType(0x12);
    pub const REP: EventType = EventType(0x14);
    pub const FF: EventType = EventType(0x15);
    pub const PWR: EventType = EventType(0x16);
    pub const FF_STATUS: EventType = EventType(0x17);

    /// Kernel name of this event type, if it has one
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            EventType::SYN => "EV_SYN",
            EventType::KEY => "EV_KEY",
            EventType::REL => "EV_REL",
            EventType::ABS => "EV_ABS",
            EventType::MSC => "EV_MSC",
            EventType::SW => "EV_SW",
            EventType::LED => "EV_LED",
            EventType::SND => "EV_SND",
            EventType::REP => "EV_REP",
            EventType::FF => "EV_FF",
            EventType::PWR => "EV_PWR",
            EventType::FF_STATUS => "EV_FF_STATUS",
            _ => return None,
        };
        Some(name)
    }

    /// Bit index of this type in the event-type capability mask
    #[inline]
    pub fn bit(&self) -> usize {
        usize::from(self.0)
    }
}

impl From<u16> for EventType {
    fn from(value: u16) -> Self {
        EventType(value)
    }
}

impl From<EventType> for u16 {
    fn from(value: EventType) -> Self {
        value.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "EV_{:#04x}", self.0),
        }
    }
}

/// Key codes (`KEY_*`) used by the keyboard signature
pub mod key {
    pub const KEY_RESERVED: u16 = 0;
    pub const KEY_ESC: u16 = 1;
    pub const KEY_ENTER: u16 = 28;
    pub const KEY_A: u16 = 30;
    pub const KEY_C: u16 = 46;
    pub const KEY_B: u16 = 48;
    pub const KEY_POWER: u16 = 116;
    pub const BTN_LEFT: u16 = 0x110;
    pub const BTN_TOUCH: u16 = 0x14a;
    /// Highest key code the kernel defines (`KEY_MAX`)
    pub const KEY_MAX: u16 = 0x2ff;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventType::KEY.to_string(), "EV_KEY");
        assert_eq!(EventType::FF_STATUS.to_string(), "EV_FF_STATUS");
        assert_eq!(EventType(0x1e).to_string(), "EV_0x1e");
        assert!(EventType(0x1e).name().is_none());
    }

    #[test]
    fn test_event_type_bits() {
        assert_eq!(EventType::SYN.bit(), 0);
        assert_eq!(EventType::KEY.bit(), 1);
        assert_eq!(EventType::REL.bit(), 2);
        assert_eq!(EventType::ABS.bit(), 3);
        assert_eq!(EventType::LED.bit(), 17);
    }

    #[test]
    fn test_event_type_serializes_as_number() {
        let json = serde_json::to_string(&EventType::ABS).unwrap();
        assert_eq!(json, "3");
        let parsed: EventType = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, EventType::REL);
    }
}
