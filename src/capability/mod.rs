//! Device capability model
//!
//! Parses the kernel's hex bitmask exports and answers "does this device
//! support event type X / key code K".

pub mod bitmask;
pub mod index;

pub use bitmask::{parse_bitmask, Bitmask, HOST_WORD_BITS};
pub use index::{parse_capabilities, CapabilityIndex};
