//! Frame sinks.
//!
//! The emulator never talks to a serial port directly. It writes whole frames
//! into a [`PacketTransport`], normally a [`DeviceTransport`] pointing at the
//! pty created by `socat`. All producer threads share one sink through
//! [`SharedTransport`], which holds its lock for exactly one write.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Destination for rendered frames.
pub trait PacketTransport: Send {
    /// Writes one complete frame.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Writes each frame to a device path, reopening it every time.
///
/// The path is opened write-only and truncated per frame, which is what a
/// pty device expects and what lets a plain file stand in for one in tests.
#[derive(Debug, Clone)]
pub struct DeviceTransport {
    path: PathBuf,
}

impl DeviceTransport {
    /// Creates a transport for `path`. Nothing is opened until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DeviceTransport { path: path.into() }
    }

    /// The device path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PacketTransport for DeviceTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut device = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        device.write_all(bytes)?;
        device.flush()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Records frames in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    fail: bool,
}

impl MemoryTransport {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every write fails with `BrokenPipe`.
    pub fn failing() -> Self {
        MemoryTransport {
            fail: true,
            ..Self::default()
        }
    }

    /// Frames written so far, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// Number of frames written.
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl PacketTransport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "memory transport closed"));
        }
        self.frames.lock().push(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// A transport shared between producer threads.
#[derive(Clone)]
pub struct SharedTransport {
    inner: Arc<Mutex<Box<dyn PacketTransport>>>,
    description: Arc<str>,
}

impl SharedTransport {
    /// Wraps `transport` for sharing.
    pub fn new(transport: impl PacketTransport + 'static) -> Self {
        let description = transport.describe().into();
        SharedTransport {
            inner: Arc::new(Mutex::new(Box::new(transport))),
            description,
        }
    }

    /// Writes one frame under the lock. Returns how long the lock was held.
    pub fn write(&self, bytes: &[u8]) -> io::Result<Duration> {
        let mut transport = self.inner.lock();
        let start = Instant::now();
        transport.write(bytes)?;
        Ok(start.elapsed())
    }

    /// Description of the wrapped transport.
    pub fn describe(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for SharedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTransport")
            .field("transport", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_records_in_order() {
        let memory = MemoryTransport::new();
        let shared = SharedTransport::new(memory.clone());
        shared.write(&[1, 2, 3]).unwrap();
        shared.write(&[4]).unwrap();
        assert_eq!(memory.frames(), vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(memory.len(), 2);
        assert_eq!(shared.describe(), "memory");
    }

    #[test]
    fn test_failing_transport() {
        let shared = SharedTransport::new(MemoryTransport::failing());
        let err = shared.write(&[0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_device_transport_missing_directory() {
        let mut transport = DeviceTransport::new("/nonexistent-gcsim-dir/device");
        assert!(transport.write(&[0x03]).is_err());
    }
}
