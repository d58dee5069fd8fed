//! Input events
//!
//! Event type and key code constants, the decoded [`EventRecord`], and the
//! [`EventCodec`] that moves records to and from the kernel's binary layout.

pub mod codes;
pub mod types;
pub mod codec;

pub use codec::{EventCodec, RECORD_SIZE};
pub use codes::EventType;
pub use types::EventRecord;
