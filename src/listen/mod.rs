//! Event streaming
//!
//! One worker thread per listened device reads fixed-width records from the
//! device handle, decodes them and forwards them to a handler or a bounded
//! queue, until a shared [`CancellationToken`] fires or the stream ends.

pub mod cancel;
pub mod source;
pub mod queue;
pub mod session;

pub use cancel::CancellationToken;
pub use queue::{EventQueue, QueueStats};
pub use session::{
    EventStream, ListenLoop, ListenSettings, LoopPhase, StreamHandle, Termination,
    DEFAULT_POLL_INTERVAL,
};
pub use source::{DeviceFile, InputSource};
