//! Host platform facts
//!
//! Properties of the running host that the decoders depend on. They are
//! computed once per process and then passed explicitly to the components
//! that need them, so tests can exercise either value.

pub mod byte_order;

pub use byte_order::ByteOrder;
