use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Buf, Bytes, BytesMut};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Console output accumulated since the host last drained it.
///
/// Clones share one buffer: firmware logging appends through any clone, the
/// dispatcher consumes from the front. Draining is destructive and in order,
/// so every byte reaches the host exactly once.
#[derive(Clone)]
pub struct OutputCapture {
    buf: Arc<Mutex<BytesMut>>,
}

impl Default for OutputCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputCapture {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BytesMut> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes to the back of the capture.
    pub fn append(&self, data: &[u8]) {
        self.lock().extend_from_slice(data);
    }

    /// Number of bytes waiting to be drained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy up to `max` bytes from the front without consuming them.
    pub fn front(&self, max: usize) -> Bytes {
        let buf = self.lock();
        let n = max.min(buf.len());
        Bytes::copy_from_slice(&buf[..n])
    }

    /// Discard `n` bytes from the front (fewer if less is buffered).
    pub fn consume(&self, n: usize) {
        let mut buf = self.lock();
        let n = n.min(buf.len());
        buf.advance(n);
    }

    /// Remove and return up to `max` bytes from the front.
    pub fn take(&self, max: usize) -> Bytes {
        let mut buf = self.lock();
        let n = max.min(buf.len());
        buf.split_to(n).freeze()
    }
}

impl io::Write for OutputCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.append(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for OutputCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputCapture")
            .field("buffered", &self.len())
            .finish()
    }
}
