//! Host byte order detection
//!
//! The kernel writes `struct input_event` and its capability exports in the
//! host's native order. Detection runs once, on first use, and is cached for
//! the rest of the process.

use std::fmt;
use std::sync::OnceLock;

/// Byte order detected on first use
static HOST_ORDER: OnceLock<ByteOrder> = OnceLock::new();

/// Byte order of multi-byte integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least-significant byte first (x86, most ARM configurations)
    Little,
    /// Most-significant byte first
    Big,
}

impl ByteOrder {
    /// Byte order of the running host.
    ///
    /// Probes the in-memory layout of a known integer instead of trusting the
    /// compile target, so an emulated or cross-built binary reports what the
    /// kernel it talks to actually uses.
    pub fn host() -> Self {
        *HOST_ORDER.get_or_init(|| {
            let probe = 0x0102_0304u32.to_ne_bytes();
            let order = if probe[0] == 0x04 {
                ByteOrder::Little
            } else {
                ByteOrder::Big
            };
            tracing::debug!("Detected host byte order: {}", order);
            order
        })
    }

    /// Whether the host lists multi-word bitmask exports most-significant
    /// word first, which means they must be reversed into logical order.
    #[inline]
    pub fn reverses_word_order(&self) -> bool {
        matches!(self, ByteOrder::Little)
    }

    #[inline]
    pub fn read_u16(&self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from(bytes[0]) | u16::from(bytes[1]) << 8,
            ByteOrder::Big => u16::from(bytes[0]) << 8 | u16::from(bytes[1]),
        }
    }

    #[inline]
    pub fn read_u32(&self, bytes: [u8; 4]) -> u32 {
        let mut value = 0u32;
        match self {
            ByteOrder::Little => {
                for (i, b) in bytes.iter().enumerate() {
                    value |= u32::from(*b) << (8 * i);
                }
            }
            ByteOrder::Big => {
                for b in bytes.iter() {
                    value = value << 8 | u32::from(*b);
                }
            }
        }
        value
    }

    #[inline]
    pub fn read_u64(&self, bytes: [u8; 8]) -> u64 {
        let mut value = 0u64;
        match self {
            ByteOrder::Little => {
                for (i, b) in bytes.iter().enumerate() {
                    value |= u64::from(*b) << (8 * i);
                }
            }
            ByteOrder::Big => {
                for b in bytes.iter() {
                    value = value << 8 | u64::from(*b);
                }
            }
        }
        value
    }

    #[inline]
    pub fn write_u16(&self, value: u16) -> [u8; 2] {
        let lo = value as u8;
        let hi = (value >> 8) as u8;
        match self {
            ByteOrder::Little => [lo, hi],
            ByteOrder::Big => [hi, lo],
        }
    }

    #[inline]
    pub fn write_u32(&self, value: u32) -> [u8; 4] {
        let mut out = [0u8; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = match self {
                ByteOrder::Little => 8 * i,
                ByteOrder::Big => 8 * (3 - i),
            };
            *slot = (value >> shift) as u8;
        }
        out
    }

    #[inline]
    pub fn write_u64(&self, value: u64) -> [u8; 8] {
        let mut out = [0u8; 8];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = match self {
                ByteOrder::Little => 8 * i,
                ByteOrder::Big => 8 * (7 - i),
            };
            *slot = (value >> shift) as u8;
        }
        out
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}
