//! Integration tests for the listen pipeline
//!
//! These tests drive complete device records end to end:
//! sysfs tree -> Registry -> DeviceRecord -> worker -> handler / queue

use dev_input::listen::InputSource;
use dev_input::{
    ByteOrder, CancellationToken, DeviceRecord, Error, EventCodec, EventRecord, EventType,
    ListenSettings, LoopPhase, Registry, Termination, RECORD_SIZE,
};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Fake `/sys/class/input` and `/dev/input` side by side
struct FakeSystem {
    root: TempDir,
}

impl FakeSystem {
    fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(root.path().join("sys")).unwrap();
        fs::create_dir_all(root.path().join("dev")).unwrap();
        Self { root }
    }

    fn sys(&self) -> std::path::PathBuf {
        self.root.path().join("sys")
    }

    fn dev(&self) -> std::path::PathBuf {
        self.root.path().join("dev")
    }

    fn add_device(&self, id: u32, name: &str) {
        let dir = self.sys().join(format!("event{}", id)).join("device");
        fs::create_dir_all(dir.join("capabilities")).unwrap();
        fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        fs::write(dir.join("capabilities/ev"), "120013\n").unwrap();
        fs::write(dir.join("capabilities/key"), "0\n").unwrap();
    }

    fn write_node(&self, id: u32, bytes: &[u8]) {
        fs::write(self.dev().join(format!("event{}", id)), bytes).unwrap();
    }

    fn registry(&self) -> Registry {
        Registry::new(self.sys(), self.dev()).with_settings(settings())
    }
}

fn settings() -> ListenSettings {
    ListenSettings {
        poll_interval: Duration::from_millis(10),
        byte_order: ByteOrder::Little,
        queue_capacity: 8,
    }
}

/// A key press burst: press, sync, release, sync, repeated
fn make_events(count: usize) -> Vec<EventRecord> {
    (0..count)
        .map(|i| {
            let usec = (i as u64) * 1_000;
            if i % 2 == 0 {
                EventRecord::new(1_700_000_000, usec, EventType::KEY, 30, (i % 4 == 0) as i32)
            } else {
                EventRecord::new(1_700_000_000, usec, EventType::SYN, 0, 0)
            }
        })
        .collect()
}

fn encode(events: &[EventRecord]) -> Vec<u8> {
    EventCodec::new(ByteOrder::Little).encode_all(events)
}

/// Source that never becomes readable
struct Idle;

impl InputSource for Idle {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        thread::sleep(timeout);
        Ok(false)
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

fn wait_for_phase(device: &DeviceRecord, phase: LoopPhase) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while device.phase() != phase {
        assert!(Instant::now() < deadline, "timed out waiting for {:?}", phase);
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_listen_delivers_recorded_events_then_ends() {
    let system = FakeSystem::new();
    system.add_device(0, "Recorded Keyboard");
    let events = make_events(40);
    system.write_node(0, &encode(&events));

    let device = system.registry().device(0).unwrap().unwrap();
    assert_eq!(device.path(), system.dev().join("event0"));

    let mut received = Vec::new();
    let termination = device
        .listen(&CancellationToken::new(), |event| received.push(event))
        .unwrap();

    assert!(matches!(termination, Termination::EndOfStream), "got {}", termination);
    assert_eq!(received, events);
    assert_eq!(device.phase(), LoopPhase::Closed);
}

#[test]
fn test_truncated_node_fails_after_whole_records() {
    let system = FakeSystem::new();
    system.add_device(1, "Torn Device");
    let events = make_events(3);
    let mut bytes = encode(&events);
    bytes.extend_from_slice(&[0u8; 5]);
    system.write_node(1, &bytes);

    let device = system.registry().device(1).unwrap().unwrap();
    let mut received = Vec::new();
    let termination = device
        .listen(&CancellationToken::new(), |event| received.push(event))
        .unwrap();

    assert_eq!(received, events);
    match termination {
        Termination::Failed(Error::TruncatedRecord { expected, actual }) => {
            assert_eq!(expected, RECORD_SIZE);
            assert_eq!(actual, 5);
        }
        other => panic!("expected truncation, got {}", other),
    }
    assert_eq!(device.phase(), LoopPhase::Closed);
}

#[test]
fn test_missing_node_fails_to_open() {
    let system = FakeSystem::new();
    system.add_device(2, "Ghost");

    let device = system.registry().device(2).unwrap().unwrap();
    match device.listen(&CancellationToken::new(), |_| {}) {
        Err(Error::Open { path, source }) => {
            assert_eq!(path, system.dev().join("event2"));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("expected open error, got {:?}", other.map(|t| t.to_string())),
    }
    assert_eq!(device.phase(), LoopPhase::Closed);
}

#[test]
fn test_stream_events_through_small_queue() {
    let system = FakeSystem::new();
    system.add_device(0, "Queued Keyboard");
    let events = make_events(100);
    system.write_node(0, &encode(&events));

    let device = system.registry().device(0).unwrap().unwrap();
    let mut stream = device.stream_events(&CancellationToken::new()).unwrap();

    let received: Vec<EventRecord> = stream.by_ref().collect();
    assert_eq!(received, events);

    let stats = stream.stats();
    assert!(stats.peak_occupancy.load(std::sync::atomic::Ordering::Relaxed) <= 8);
    assert!(matches!(stream.termination(), Termination::EndOfStream));
    assert_eq!(device.phase(), LoopPhase::Closed);
}

#[test]
fn test_one_device_ending_leaves_siblings_running() {
    let system = FakeSystem::new();
    system.add_device(0, "Short");
    system.add_device(1, "Quiet");
    system.write_node(0, &encode(&make_events(4)));

    let registry = system.registry();
    let short = registry.device(0).unwrap().unwrap();
    let quiet = registry.device(1).unwrap().unwrap();
    quiet.attach(Idle).unwrap();

    let token = CancellationToken::new();
    let short_handle = short.start_streaming(&token, |_| {}).unwrap();
    let quiet_handle = quiet.start_streaming(&token, |_| {}).unwrap();

    assert!(matches!(short_handle.join(), Termination::EndOfStream));
    assert!(!token.is_cancelled());
    assert_eq!(quiet.phase(), LoopPhase::Streaming);
    assert!(!quiet_handle.is_finished());

    token.cancel();
    assert!(quiet_handle.join().is_cancelled());
    assert_eq!(quiet.phase(), LoopPhase::Closed);
}

#[test]
fn test_one_token_cancels_every_device() {
    let system = FakeSystem::new();
    for id in 0..4 {
        system.add_device(id, "Idle");
    }

    let devices = system.registry().devices().unwrap();
    assert_eq!(devices.len(), 4);

    let token = CancellationToken::new();
    let handles: Vec<_> = devices
        .iter()
        .map(|device| {
            device.attach(Idle).unwrap();
            device.start_streaming(&token, |_| {}).unwrap()
        })
        .collect();

    for device in &devices {
        assert_eq!(device.phase(), LoopPhase::Streaming);
    }

    token.cancel();
    for handle in handles {
        assert!(handle.join().is_cancelled());
    }
    for device in &devices {
        assert_eq!(device.phase(), LoopPhase::Closed);
    }
}

#[test]
fn test_close_from_another_thread_stops_listen() {
    let system = FakeSystem::new();
    system.add_device(5, "Shared");

    let device = Arc::new(system.registry().device(5).unwrap().unwrap());
    device.attach(Idle).unwrap();

    let listener = Arc::clone(&device);
    let worker = thread::spawn(move || listener.listen(&CancellationToken::new(), |_| {}));

    wait_for_phase(&device, LoopPhase::Streaming);
    device.close().unwrap();

    let termination = worker.join().unwrap().unwrap();
    assert!(termination.is_cancelled());
    assert!(matches!(device.close(), Err(Error::NotOpen(_))));
}

#[test]
fn test_handler_cancellation_stops_delivery() {
    let system = FakeSystem::new();
    system.add_device(0, "Chatty");
    system.write_node(0, &encode(&make_events(50)));

    let device = system.registry().device(0).unwrap().unwrap();
    let token = CancellationToken::new();
    let stopper = token.clone();
    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);

    let termination = device
        .listen(&token, move |_| {
            let mut count = counter.lock().unwrap();
            *count += 1;
            if *count == 10 {
                stopper.cancel();
            }
        })
        .unwrap();

    assert!(termination.is_cancelled());
    assert_eq!(*seen.lock().unwrap(), 10);
}

#[test]
fn test_device_can_listen_again_after_stream_end() {
    let system = FakeSystem::new();
    system.add_device(0, "Replayed");
    let events = make_events(6);
    system.write_node(0, &encode(&events));

    let device = system.registry().device(0).unwrap().unwrap();
    for _ in 0..2 {
        let mut received = Vec::new();
        let termination = device
            .listen(&CancellationToken::new(), |event| received.push(event))
            .unwrap();
        assert!(matches!(termination, Termination::EndOfStream));
        assert_eq!(received, events);
    }
}

#[test]
fn test_node_path_follows_dev_root() {
    let system = FakeSystem::new();
    system.add_device(12, "Anywhere");
    let device = system.registry().device(12).unwrap().unwrap();
    assert!(device.path().starts_with(system.dev()));
    assert_eq!(device.path().file_name(), Path::new("event12").file_name());
}
