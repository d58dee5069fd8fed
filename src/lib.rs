//! # dev-input
//!
//! Discovery, classification and event streaming for Linux input devices
//! (`/dev/input/event*`).
//!
//! ## Overview
//!
//! The kernel describes every input device under `/sys/class/input` with a
//! name and a pair of hex capability bitmasks. This library parses those
//! masks, classifies devices as keyboards, mice, touch devices or generic
//! pointers, and reads the fixed 24-byte `struct input_event` records from a
//! device node on a dedicated worker thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dev_input::{CancellationToken, KeyboardSignature, Registry};
//!
//! let registry = Registry::system();
//! let keyboards = registry.keyboards(&KeyboardSignature::default())?;
//!
//! let token = CancellationToken::new();
//! if let Some(keyboard) = keyboards.first() {
//!     let termination = keyboard.listen(&token, |event| {
//!         println!("{:?}", event);
//!     })?;
//!     println!("stopped: {}", termination);
//! }
//! # Ok::<(), dev_input::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`platform`]: host byte order, detected once per process
//! - [`capability`]: bitmask parsing and capability queries
//! - [`event`]: event codes and the binary record codec
//! - [`device`]: device records, sysfs registry and classification
//! - [`listen`]: per-device read loop, cancellation and event queue
//! - [`app`]: CLI and configuration management
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ device node │───▶│ ListenLoop  │───▶│ EventCodec  │───▶│  handler /  │
//! │  (poll/read)│    │  (worker)   │    │  (decode)   │    │ EventQueue  │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! ## Permissions
//!
//! Reading `/dev/input/event*` usually requires membership in the `input`
//! group or root. Enumeration through sysfs does not.

pub mod platform;
pub mod capability;
pub mod event;
pub mod device;
pub mod listen;
pub mod app;

// Re-export commonly used types
pub use capability::{parse_bitmask, parse_capabilities, Bitmask, CapabilityIndex};
pub use device::{
    keyboards, mice, pointers, touch_devices, DeviceClass, DeviceIdentity, DeviceRecord,
    KeyboardSignature, Registry,
};
pub use event::{EventCodec, EventRecord, EventType, RECORD_SIZE};
pub use listen::{
    CancellationToken, EventStream, ListenLoop, ListenSettings, LoopPhase, StreamHandle,
    Termination,
};
pub use platform::ByteOrder;

use std::path::PathBuf;

/// Result type alias for dev-input
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dev-input
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed capability mask: {0}")]
    Format(String),

    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Device already open: {}", .0.display())]
    AlreadyOpen(PathBuf),

    #[error("Device not open: {}", .0.display())]
    NotOpen(PathBuf),

    #[error("Truncated event record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },

    #[error("Event decode error: {0}")]
    Decode(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Listen worker error: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
