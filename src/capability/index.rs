//! Event and key capability queries for one device

use super::bitmask::Bitmask;
use crate::event::codes::EventType;
use crate::platform::ByteOrder;
use crate::{Error, Result};

/// Capability snapshot of one device
///
/// Immutable after construction and freely shared across threads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityIndex {
    events: Bitmask,
    keys: Bitmask,
}

impl CapabilityIndex {
    /// Build an index from already-parsed masks.
    ///
    /// # Errors
    /// Returns `Error::Format` unless the event mask has exactly one segment.
    pub fn new(events: Bitmask, keys: Bitmask) -> Result<Self> {
        if events.segments().len() != 1 {
            return Err(Error::Format(format!(
                "expected 1 event-type segment, got {}",
                events.segments().len()
            )));
        }
        Ok(Self { events, keys })
    }

    /// Event-type mask
    pub fn events(&self) -> &Bitmask {
        &self.events
    }

    /// Key-type mask
    pub fn keys(&self) -> &Bitmask {
        &self.keys
    }

    /// Whether the device emits events of `event_type`
    #[inline]
    pub fn supports_event(&self, event_type: EventType) -> bool {
        self.events.bit(event_type.bit())
    }

    /// Whether the device can produce `key_code`.
    ///
    /// The segment holding `key_code` is located with the key mask's own
    /// segment width. Codes past the end of the mask, and every code on a
    /// device with an empty key mask, are unsupported.
    #[inline]
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.keys.bit(usize::from(key_code))
    }

    /// Whether the device can produce every code in `codes`
    pub fn supports_all_keys(&self, codes: &[u16]) -> bool {
        codes.iter().all(|code| self.supports_key(*code))
    }

    /// Supported event types, ascending
    pub fn supported_events(&self) -> impl Iterator<Item = EventType> + '_ {
        self.events
            .iter_ones()
            .filter_map(|bit| u16::try_from(bit).ok().map(EventType))
    }

    /// Supported key codes, ascending
    pub fn supported_keys(&self) -> impl Iterator<Item = u16> + '_ {
        self.keys
            .iter_ones()
            .filter_map(|bit| u16::try_from(bit).ok())
    }
}

/// Parse a device's `capabilities/ev` and `capabilities/key` exports
pub fn parse_capabilities(
    event_mask_text: &str,
    key_mask_text: &str,
    order: ByteOrder,
) -> Result<CapabilityIndex> {
    let events = Bitmask::parse(event_mask_text, order)?;
    let keys = Bitmask::parse(key_mask_text, order)?;
    CapabilityIndex::new(events, keys)
}
