//! Device enumeration through sysfs
//!
//! Every input device with an event node appears as
//! `<sysfs_root>/event<N>/device` with a `name` file and a `capabilities`
//! directory. The matching node is `<dev_root>/event<N>`.

use super::classify::{self, KeyboardSignature};
use super::record::{DeviceIdentity, DeviceRecord};
use crate::capability::{parse_capabilities, CapabilityIndex};
use crate::listen::ListenSettings;
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default sysfs input class directory
pub const SYSFS_INPUT_ROOT: &str = "/sys/class/input";

/// Default device node directory
pub const DEV_INPUT_ROOT: &str = "/dev/input";

/// Reads device records from a sysfs tree
#[derive(Debug, Clone)]
pub struct Registry {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
    settings: ListenSettings,
}

impl Registry {
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(sysfs_root: S, dev_root: D) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
            settings: ListenSettings::default(),
        }
    }

    /// Registry over the live system paths
    pub fn system() -> Self {
        Self::new(SYSFS_INPUT_ROOT, DEV_INPUT_ROOT)
    }

    /// Use `settings` for every record this registry builds.
    ///
    /// The byte order in `settings` also drives capability parsing.
    pub fn with_settings(mut self, settings: ListenSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sysfs_root(&self) -> &Path {
        &self.sysfs_root
    }

    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    pub fn settings(&self) -> &ListenSettings {
        &self.settings
    }

    /// Read one device.
    ///
    /// Returns `Ok(None)` when no `event<id>/device` directory exists.
    ///
    /// # Errors
    /// `Error::Registry` if a file in an existing device directory cannot be
    /// read, `Error::Format` if a capability mask is malformed.
    pub fn device(&self, id: u32) -> Result<Option<DeviceRecord>> {
        let sysfs_path = self.sysfs_root.join(format!("event{}", id)).join("device");
        if !sysfs_path.is_dir() {
            trace!("No device directory at {}", sysfs_path.display());
            return Ok(None);
        }

        let name = read_attribute(&sysfs_path.join("name"))?.trim().to_string();

        let ev_path = sysfs_path.join("capabilities").join("ev");
        let key_path = sysfs_path.join("capabilities").join("key");
        let ev_text = read_attribute(&ev_path)?;
        let key_text = read_attribute(&key_path)?;

        let capabilities = parse_capabilities(&ev_text, &key_text, self.settings.byte_order)
            .map_err(|e| match e {
                Error::Format(msg) => {
                    Error::Format(format!("{}: {}", sysfs_path.display(), msg))
                }
                other => other,
            })?;

        let identity = DeviceIdentity {
            id,
            path: self.dev_root.join(format!("event{}", id)),
            sysfs_path,
            name,
        };
        debug!("Found event{}: {}", id, identity.name);

        Ok(Some(DeviceRecord::new(
            identity,
            capabilities,
            self.settings,
        )))
    }

    /// Ids of every `event<N>` entry, ascending
    pub fn device_ids(&self) -> Result<Vec<u32>> {
        let entries = fs::read_dir(&self.sysfs_root).map_err(|source| Error::Registry {
            path: self.sysfs_root.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Registry {
                path: self.sysfs_root.clone(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(event_id) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Every device, in id order.
    ///
    /// A device that disappears between listing and reading is skipped. Any
    /// other failure aborts the walk.
    pub fn devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut devices = Vec::new();
        for id in self.device_ids()? {
            match self.device(id)? {
                Some(device) => devices.push(device),
                None => debug!("event{} vanished during enumeration", id),
            }
        }
        debug!("Enumerated {} input devices", devices.len());
        Ok(devices)
    }

    pub fn keyboards(&self, signature: &KeyboardSignature) -> Result<Vec<DeviceRecord>> {
        let devices = self.devices()?;
        Ok(devices
            .into_iter()
            .filter(|d| classify::is_keyboard(d.capabilities(), signature))
            .collect())
    }

    pub fn pointers(&self) -> Result<Vec<DeviceRecord>> {
        self.filtered(classify::is_pointer)
    }

    pub fn mice(&self) -> Result<Vec<DeviceRecord>> {
        self.filtered(classify::is_mouse)
    }

    pub fn touch_devices(&self) -> Result<Vec<DeviceRecord>> {
        self.filtered(classify::is_touch_device)
    }

    fn filtered(
        &self,
        predicate: fn(&CapabilityIndex) -> bool,
    ) -> Result<Vec<DeviceRecord>> {
        let devices = self.devices()?;
        Ok(devices
            .into_iter()
            .filter(|d| predicate(d.capabilities()))
            .collect())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::system()
    }
}

/// `N` from an `event<N>` directory name
fn event_id(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("event")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn read_attribute(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source: io::Error| Error::Registry {
        path: path.to_path_buf(),
        source,
    })
}
