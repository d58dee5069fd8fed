//! Per-device listen loop
//!
//! Lifecycle: `Closed -> Open -> Streaming -> Closed`.
//!
//! Streaming runs on a dedicated worker thread that owns the device handle.
//! Each iteration checks for cancellation, waits at most one poll interval
//! for the handle to become readable, reads exactly one record, decodes it
//! and hands it on. The handle is released, and the loop returns to
//! `Closed`, whenever the worker exits, whether by cancellation, end of
//! stream, a failure or a panicking handler.

use super::cancel::CancellationToken;
use super::queue::{EventConsumer, EventQueue, QueueStats, DEFAULT_CAPACITY};
use super::source::{read_record, DeviceFile, InputSource, RecordRead};
use crate::event::{EventCodec, EventRecord, RECORD_SIZE};
use crate::platform::ByteOrder;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Default upper bound on how long a worker blocks before rechecking cancellation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Back-off while the consumer side of an [`EventStream`] is full or idle
const QUEUE_BACKOFF: Duration = Duration::from_millis(1);

/// Tunables for a listen loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenSettings {
    /// Longest single readiness wait, which bounds cancellation latency
    pub poll_interval: Duration,
    /// Byte order of records on the device
    pub byte_order: ByteOrder,
    /// Capacity of the queue behind [`ListenLoop::stream_events`]
    pub queue_capacity: usize,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            byte_order: ByteOrder::host(),
            queue_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// How a stream ended
#[derive(Debug)]
pub enum Termination {
    /// The cancellation token fired or the loop was closed
    Cancelled,
    /// The device reported end of stream or went away
    EndOfStream,
    /// A read, truncation or decode failure ended the stream
    Failed(Error),
}

impl Termination {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Termination::Cancelled)
    }

    /// Whether the stream ended on the device's side rather than by request
    pub fn is_stream_end(&self) -> bool {
        !self.is_cancelled()
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Termination::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::EndOfStream => write!(f, "end of stream"),
            Termination::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Observable lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Closed,
    Open,
    Streaming,
}

enum LoopState {
    Closed,
    Open(Box<dyn InputSource>),
    Streaming { stop: Arc<AtomicBool> },
}

impl LoopState {
    fn phase(&self) -> LoopPhase {
        match self {
            LoopState::Closed => LoopPhase::Closed,
            LoopState::Open(_) => LoopPhase::Open,
            LoopState::Streaming { .. } => LoopPhase::Streaming,
        }
    }
}

/// Exclusive read session over one device node
pub struct ListenLoop {
    path: PathBuf,
    settings: ListenSettings,
    state: Arc<Mutex<LoopState>>,
}

impl ListenLoop {
    pub fn new<P: Into<PathBuf>>(path: P, settings: ListenSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            state: Arc::new(Mutex::new(LoopState::Closed)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &ListenSettings {
        &self.settings
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.lock().phase()
    }

    /// Whether a handle is currently held (open or streaming)
    pub fn is_open(&self) -> bool {
        self.phase() != LoopPhase::Closed
    }

    /// Open the device node.
    ///
    /// # Errors
    /// `AlreadyOpen` if a handle is held, `Open` if the OS refuses the node.
    pub fn open(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase() != LoopPhase::Closed {
            return Err(Error::AlreadyOpen(self.path.clone()));
        }
        let source = self.open_source()?;
        *state = LoopState::Open(source);
        info!("Opened {}", self.path.display());
        Ok(())
    }

    /// Open the loop over a caller-supplied source instead of the device node
    pub fn attach<S: InputSource + 'static>(&self, source: S) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase() != LoopPhase::Closed {
            return Err(Error::AlreadyOpen(self.path.clone()));
        }
        *state = LoopState::Open(Box::new(source));
        debug!("Attached source for {}", self.path.display());
        Ok(())
    }

    /// Release the handle.
    ///
    /// A streaming loop is asked to stop; its worker releases the handle
    /// within one poll interval and reports [`Termination::Cancelled`].
    ///
    /// # Errors
    /// `NotOpen` if no handle is held.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        match &*state {
            LoopState::Closed => Err(Error::NotOpen(self.path.clone())),
            LoopState::Open(_) => {
                *state = LoopState::Closed;
                info!("Closed {}", self.path.display());
                Ok(())
            }
            LoopState::Streaming { stop } => {
                stop.store(true, Ordering::SeqCst);
                info!("Stop requested for {}", self.path.display());
                Ok(())
            }
        }
    }

    /// Stream events to `handler` on a dedicated worker thread.
    ///
    /// Opens the device first unless it is already open. The handler runs on
    /// the worker, one event at a time, in device order.
    pub fn start_streaming<F>(&self, token: &CancellationToken, mut handler: F) -> Result<StreamHandle>
    where
        F: FnMut(EventRecord) + Send + 'static,
    {
        let worker = self.begin_streaming(token)?;
        let stop = Arc::clone(&worker.signal.stop);

        let handle = thread::Builder::new()
            .name(self.thread_name())
            .spawn(move || {
                worker.run(|event| {
                    handler(event);
                    ControlFlow::Continue(())
                })
            })
            .map_err(|e| self.spawn_error(e))?;

        Ok(StreamHandle {
            handle,
            stop,
            path: self.path.clone(),
        })
    }

    /// Stream events into a bounded queue read through the returned [`EventStream`]
    pub fn stream_events(&self, token: &CancellationToken) -> Result<EventStream> {
        let capacity = self.settings.queue_capacity;
        if !capacity.is_power_of_two() {
            return Err(Error::Config(format!(
                "queue_capacity must be a power of 2, got {}",
                capacity
            )));
        }
        let queue = EventQueue::with_capacity(capacity);
        let (mut producer, consumer) = queue.split();

        let worker = self.begin_streaming(token)?;
        let stop = Arc::clone(&worker.signal.stop);
        let signal = worker.signal.clone();

        let handle = thread::Builder::new()
            .name(self.thread_name())
            .spawn(move || {
                worker.run(|event| {
                    let mut pending = event;
                    loop {
                        if producer.is_abandoned() {
                            return ControlFlow::Break(());
                        }
                        match producer.push(pending) {
                            Ok(()) => return ControlFlow::Continue(()),
                            Err(back) => {
                                if signal.is_set() {
                                    return ControlFlow::Break(());
                                }
                                pending = back;
                                thread::sleep(QUEUE_BACKOFF);
                            }
                        }
                    }
                })
            })
            .map_err(|e| self.spawn_error(e))?;

        Ok(EventStream {
            consumer,
            worker: StreamHandle {
                handle,
                stop,
                path: self.path.clone(),
            },
        })
    }

    /// Stream events to `handler` and block until the stream terminates.
    ///
    /// # Errors
    /// Returns an error only if streaming could not start; everything after
    /// that is reported through the returned [`Termination`].
    pub fn listen<F>(&self, token: &CancellationToken, mut handler: F) -> Result<Termination>
    where
        F: FnMut(EventRecord) + Send,
    {
        let worker = self.begin_streaming(token)?;
        let name = self.thread_name();

        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name(name)
                .spawn_scoped(scope, move || {
                    worker.run(|event| {
                        handler(event);
                        ControlFlow::Continue(())
                    })
                })
                .map_err(|e| self.spawn_error(e))?;
            Ok(joined(handle.join()))
        })
    }

    fn open_source(&self) -> Result<Box<dyn InputSource>> {
        let file = DeviceFile::open(&self.path).map_err(|source| Error::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(Box::new(file))
    }

    /// Move to `Streaming`, taking the open handle or opening one
    fn begin_streaming(&self, token: &CancellationToken) -> Result<Worker> {
        let mut state = self.state.lock();
        let source = match std::mem::replace(&mut *state, LoopState::Closed) {
            LoopState::Closed => self.open_source()?,
            LoopState::Open(source) => source,
            streaming @ LoopState::Streaming { .. } => {
                *state = streaming;
                return Err(Error::AlreadyOpen(self.path.clone()));
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        *state = LoopState::Streaming {
            stop: Arc::clone(&stop),
        };
        debug!("Streaming {}", self.path.display());

        Ok(Worker {
            source,
            codec: EventCodec::new(self.settings.byte_order),
            signal: StopSignal {
                token: token.clone(),
                stop,
            },
            poll_interval: self.settings.poll_interval,
            path: self.path.clone(),
            delivered: 0,
            _release: ReleaseGuard {
                state: Arc::clone(&self.state),
            },
        })
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::Worker(format!(
            "failed to spawn worker for {}: {}",
            self.path.display(),
            e
        ))
    }

    fn thread_name(&self) -> String {
        let node = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "device".to_string());
        format!("listen-{}", node)
    }
}

impl fmt::Debug for ListenLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenLoop")
            .field("path", &self.path)
            .field("phase", &self.phase())
            .finish()
    }
}

fn joined(result: thread::Result<Termination>) -> Termination {
    result.unwrap_or_else(|_| {
        warn!("Listen worker panicked");
        Termination::Failed(Error::Worker("listen worker panicked".to_string()))
    })
}

/// Token plus the loop's private stop flag
#[derive(Clone)]
struct StopSignal {
    token: CancellationToken,
    stop: Arc<AtomicBool>,
}

impl StopSignal {
    #[inline]
    fn is_set(&self) -> bool {
        self.token.is_cancelled() || self.stop.load(Ordering::SeqCst)
    }
}

/// Returns the loop to `Closed` when the worker goes away.
struct ReleaseGuard {
    state: Arc<Mutex<LoopState>>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        *self.state.lock() = LoopState::Closed;
    }
}

/// State owned by one streaming worker
///
/// Field order matters: `source` drops before `_release` marks the loop closed.
struct Worker {
    source: Box<dyn InputSource>,
    codec: EventCodec,
    signal: StopSignal,
    poll_interval: Duration,
    path: PathBuf,
    delivered: u64,
    _release: ReleaseGuard,
}

impl Worker {
    fn run<F>(mut self, mut deliver: F) -> Termination
    where
        F: FnMut(EventRecord) -> ControlFlow<()>,
    {
        debug!("Listen worker started for {}", self.path.display());
        let termination = self.pump(&mut deliver);
        info!(
            "Stream on {} ended ({}) after {} events",
            self.path.display(),
            termination,
            self.delivered
        );
        termination
    }

    fn pump<F>(&mut self, deliver: &mut F) -> Termination
    where
        F: FnMut(EventRecord) -> ControlFlow<()>,
    {
        let mut buf = [0u8; RECORD_SIZE];

        loop {
            if self.signal.is_set() {
                return Termination::Cancelled;
            }

            match self.source.wait_readable(self.poll_interval) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return Termination::Failed(Error::Io(e)),
            }

            match read_record(&mut self.source, &mut buf) {
                Ok(RecordRead::Complete) => {}
                Ok(RecordRead::EndOfStream) => return Termination::EndOfStream,
                Ok(RecordRead::Partial(actual)) => {
                    return Termination::Failed(Error::TruncatedRecord {
                        expected: RECORD_SIZE,
                        actual,
                    })
                }
                // ENODEV: the device was unplugged
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                    return Termination::EndOfStream
                }
                Err(e) => return Termination::Failed(Error::Io(e)),
            }

            let event = match self.codec.decode(&buf) {
                Ok(event) => event,
                Err(e) => return Termination::Failed(e),
            };

            // No delivery once cancellation has been observed.
            if self.signal.is_set() {
                return Termination::Cancelled;
            }

            trace!(
                "{}: type={} code={} value={}",
                self.path.display(),
                event.event_type,
                event.code,
                event.value
            );
            self.delivered += 1;
            if deliver(event).is_break() {
                return Termination::Cancelled;
            }
        }
    }
}

/// Handle on a worker started by [`ListenLoop::start_streaming`]
///
/// Dropping it detaches the worker, which keeps running until cancellation,
/// [`ListenLoop::close`] or the end of the stream.
pub struct StreamHandle {
    handle: JoinHandle<Termination>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
}

impl StreamHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask this worker alone to stop
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the worker and return how the stream ended
    pub fn join(self) -> Termination {
        joined(self.handle.join())
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("path", &self.path)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Decoded events from a worker started by [`ListenLoop::stream_events`]
///
/// Iterating blocks until the next event arrives and yields `None` once the
/// worker has terminated and every queued event has been handed out; the
/// reason is then available from [`EventStream::termination`]. Dropping the
/// stream stops the worker when it next tries to queue an event.
pub struct EventStream {
    consumer: EventConsumer,
    worker: StreamHandle,
}

impl EventStream {
    /// Next queued event, without waiting
    pub fn try_next(&mut self) -> Option<EventRecord> {
        self.consumer.pop()
    }

    /// Whether the worker has terminated and the queue is drained
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished() && self.consumer.is_empty()
    }

    pub fn path(&self) -> &Path {
        self.worker.path()
    }

    /// Ask the worker to stop
    pub fn stop(&self) {
        self.worker.stop();
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        self.consumer.stats()
    }

    /// Wait for the worker and return how the stream ended.
    ///
    /// Events still queued are discarded. A worker that is still running is
    /// stopped first and reports [`Termination::Cancelled`].
    pub fn termination(self) -> Termination {
        let EventStream { consumer, worker } = self;
        drop(consumer);
        if !worker.is_finished() {
            worker.stop();
        }
        worker.join()
    }
}

impl Iterator for EventStream {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        loop {
            if let Some(event) = self.consumer.pop() {
                return Some(event);
            }
            if self.worker.is_finished() {
                // The worker may have queued one last event before exiting.
                return self.consumer.pop();
            }
            thread::sleep(QUEUE_BACKOFF);
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("path", &self.worker.path())
            .field("queued", &self.consumer.available())
            .finish()
    }
}
