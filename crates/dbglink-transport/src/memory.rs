use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{Endpoints, Pipe};

/// One transfer written by an in-memory endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub pipe: Pipe,
    pub bytes: Vec<u8>,
}

/// Shared, append-only record of every transfer one end has written.
#[derive(Debug, Clone, Default)]
pub struct TransferLog {
    inner: Arc<Mutex<Vec<Transfer>>>,
}

impl TransferLog {
    fn push(&self, pipe: Pipe, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Transfer {
                pipe,
                bytes: bytes.to_vec(),
            });
    }

    /// Snapshot of all transfers so far.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the transfers on one pipe.
    pub fn on(&self, pipe: Pipe) -> Vec<Vec<u8>> {
        self.transfers()
            .into_iter()
            .filter(|t| t.pipe == pipe)
            .map(|t| t.bytes)
            .collect()
    }

    /// Number of transfers recorded.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// In-memory endpoint pair, one end of a simulated link.
///
/// Each write is delivered to the peer as one whole transfer, preserving USB
/// transfer boundaries. Dropping one end makes the other end's reads fail
/// with [`TransportError::Disconnected`].
pub struct MemoryEndpoints {
    control_tx: Sender<Vec<u8>>,
    control_rx: Receiver<Vec<u8>>,
    bulk_tx: Sender<Vec<u8>>,
    bulk_rx: Receiver<Vec<u8>>,
    log: TransferLog,
}

/// Create two connected in-memory ends: `(host, device)`.
pub fn pair() -> (MemoryEndpoints, MemoryEndpoints) {
    let (host_control_tx, device_control_rx) = mpsc::channel();
    let (device_control_tx, host_control_rx) = mpsc::channel();
    let (host_bulk_tx, device_bulk_rx) = mpsc::channel();
    let (device_bulk_tx, host_bulk_rx) = mpsc::channel();

    let host = MemoryEndpoints {
        control_tx: host_control_tx,
        control_rx: host_control_rx,
        bulk_tx: host_bulk_tx,
        bulk_rx: host_bulk_rx,
        log: TransferLog::default(),
    };
    let device = MemoryEndpoints {
        control_tx: device_control_tx,
        control_rx: device_control_rx,
        bulk_tx: device_bulk_tx,
        bulk_rx: device_bulk_rx,
        log: TransferLog::default(),
    };
    (host, device)
}

impl MemoryEndpoints {
    /// Handle to the record of transfers written by this end.
    pub fn log(&self) -> TransferLog {
        self.log.clone()
    }

    fn send(&self, pipe: Pipe, bytes: &[u8]) -> Result<usize> {
        let tx = match pipe {
            Pipe::Control => &self.control_tx,
            Pipe::Bulk => &self.bulk_tx,
        };
        tx.send(bytes.to_vec())
            .map_err(|_| TransportError::Disconnected { pipe })?;
        self.log.push(pipe, bytes);
        trace!(%pipe, len = bytes.len(), "memory transfer written");
        Ok(bytes.len())
    }

    fn recv(&self, pipe: Pipe, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let rx = match pipe {
            Pipe::Control => &self.control_rx,
            Pipe::Bulk => &self.bulk_rx,
        };
        let transfer = rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::Timeout { pipe, timeout },
            RecvTimeoutError::Disconnected => TransportError::Disconnected { pipe },
        })?;
        if transfer.len() > buf.len() {
            return Err(TransportError::Overflow {
                pipe,
                size: transfer.len(),
                capacity: buf.len(),
            });
        }
        buf[..transfer.len()].copy_from_slice(&transfer);
        Ok(transfer.len())
    }
}

impl Endpoints for MemoryEndpoints {
    fn write_control(&mut self, packet: &[u8], _timeout: Duration) -> Result<usize> {
        self.send(Pipe::Control, packet)
    }

    fn read_control(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.recv(Pipe::Control, buf, timeout)
    }

    fn write_bulk(&mut self, chunk: &[u8], _timeout: Duration) -> Result<usize> {
        self.send(Pipe::Bulk, chunk)
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.recv(Pipe::Bulk, buf, timeout)
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEndpoints")
            .field("written", &self.log.len())
            .finish()
    }
}
