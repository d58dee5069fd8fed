//! Device identity, capabilities and read session

use crate::capability::CapabilityIndex;
use crate::device::classify::{self, DeviceClass, KeyboardSignature};
use crate::event::{EventRecord, EventType};
use crate::listen::{
    CancellationToken, EventStream, InputSource, ListenLoop, ListenSettings, LoopPhase,
    StreamHandle, Termination,
};
use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where a device lives and what it calls itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// `N` in `eventN`
    pub id: u32,
    /// Device node, e.g. `/dev/input/event3`
    pub path: PathBuf,
    /// Registry directory, e.g. `/sys/class/input/event3/device`
    pub sysfs_path: PathBuf,
    /// Name reported by the driver
    pub name: String,
}

/// One input device
///
/// Identity and capabilities never change after construction. The read
/// session is guarded internally, so a record can be shared behind an `Arc`
/// while one thread listens to it.
#[derive(Debug)]
pub struct DeviceRecord {
    identity: DeviceIdentity,
    capabilities: CapabilityIndex,
    listener: ListenLoop,
}

impl DeviceRecord {
    pub fn new(
        identity: DeviceIdentity,
        capabilities: CapabilityIndex,
        settings: ListenSettings,
    ) -> Self {
        let listener = ListenLoop::new(identity.path.clone(), settings);
        Self {
            identity,
            capabilities,
            listener,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn id(&self) -> u32 {
        self.identity.id
    }

    pub fn path(&self) -> &Path {
        &self.identity.path
    }

    pub fn sysfs_path(&self) -> &Path {
        &self.identity.sysfs_path
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn capabilities(&self) -> &CapabilityIndex {
        &self.capabilities
    }

    pub fn supports_event(&self, event_type: EventType) -> bool {
        self.capabilities.supports_event(event_type)
    }

    pub fn supports_key(&self, key_code: u16) -> bool {
        self.capabilities.supports_key(key_code)
    }

    pub fn is_keyboard(&self, signature: &KeyboardSignature) -> bool {
        classify::is_keyboard(&self.capabilities, signature)
    }

    pub fn is_pointer(&self) -> bool {
        classify::is_pointer(&self.capabilities)
    }

    pub fn is_mouse(&self) -> bool {
        classify::is_mouse(&self.capabilities)
    }

    pub fn is_touch_device(&self) -> bool {
        classify::is_touch_device(&self.capabilities)
    }

    /// Every class this device falls into
    pub fn classes(&self, signature: &KeyboardSignature) -> Vec<DeviceClass> {
        classify::classes(&self.capabilities, signature)
    }

    /// Read session for this device
    pub fn listener(&self) -> &ListenLoop {
        &self.listener
    }

    pub fn phase(&self) -> LoopPhase {
        self.listener.phase()
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_open()
    }

    /// See [`ListenLoop::open`]
    pub fn open(&self) -> Result<()> {
        self.listener.open()
    }

    /// See [`ListenLoop::attach`]
    pub fn attach<S: InputSource + 'static>(&self, source: S) -> Result<()> {
        self.listener.attach(source)
    }

    /// See [`ListenLoop::close`]
    pub fn close(&self) -> Result<()> {
        self.listener.close()
    }

    /// See [`ListenLoop::start_streaming`]
    pub fn start_streaming<F>(&self, token: &CancellationToken, handler: F) -> Result<StreamHandle>
    where
        F: FnMut(EventRecord) + Send + 'static,
    {
        self.listener.start_streaming(token, handler)
    }

    /// See [`ListenLoop::stream_events`]
    pub fn stream_events(&self, token: &CancellationToken) -> Result<EventStream> {
        self.listener.stream_events(token)
    }

    /// See [`ListenLoop::listen`]
    pub fn listen<F>(&self, token: &CancellationToken, handler: F) -> Result<Termination>
    where
        F: FnMut(EventRecord) + Send,
    {
        self.listener.listen(token, handler)
    }
}
