//! Byte sources a listen loop can read from
//!
//! The loop only needs two things from a device handle: a readiness wait that
//! gives up after a timeout, and a plain read. [`DeviceFile`] provides both
//! for a real device node.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opaque byte source behind a listen loop
pub trait InputSource: Send {
    /// Wait up to `timeout` for data. `Ok(false)` means the wait timed out.
    ///
    /// Hang-up and error conditions report `Ok(true)` so the following
    /// [`read`](InputSource::read) surfaces them.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read up to `buf.len()` bytes. `Ok(0)` is end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Device node opened read-only
#[derive(Debug)]
pub struct DeviceFile {
    file: File,
    path: PathBuf,
}

impl DeviceFile {
    /// Open `path` for reading
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InputSource for DeviceFile {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

        // Safety: `fds` is a valid, initialized pollfd that outlives the call,
        // and nfds matches the single entry passed.
        let ready = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ready > 0 && fds.revents != 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl<S: InputSource + ?Sized> InputSource for Box<S> {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).wait_readable(timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

/// Outcome of reading one fixed-width record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordRead {
    /// The buffer was filled
    Complete,
    /// The source ended before the first byte
    EndOfStream,
    /// The source ended after this many bytes
    Partial(usize),
}

/// Fill `buf` completely, retrying interrupted and short reads
pub(crate) fn read_record<S: InputSource + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
) -> io::Result<RecordRead> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(RecordRead::EndOfStream),
            Ok(0) => return Ok(RecordRead::Partial(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(RecordRead::Complete)
}
