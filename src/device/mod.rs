//! Input devices
//!
//! A [`DeviceRecord`] pairs a device's identity and capabilities with its
//! read session. The [`Registry`] builds records from sysfs, and the
//! [`classify`] functions sort them into keyboards, mice, touch devices and
//! pointers.

pub mod classify;
pub mod record;
pub mod registry;

pub use classify::{
    keyboards, mice, pointers, touch_devices, DeviceClass, KeyboardSignature,
    DEFAULT_KEYBOARD_SIGNATURE,
};
pub use record::{DeviceIdentity, DeviceRecord};
pub use registry::{Registry, DEV_INPUT_ROOT, SYSFS_INPUT_ROOT};
