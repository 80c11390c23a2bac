use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Bulk IN endpoint (device to host).
pub const BULK_IN: u8 = 0x81;
/// Bulk OUT endpoint (host to device).
pub const BULK_OUT: u8 = 0x02;
/// Interrupt IN endpoint (device to host).
pub const INTERRUPT_IN: u8 = 0x83;
/// Interrupt OUT endpoint (host to device).
pub const INTERRUPT_OUT: u8 = 0x04;

/// Which of the two logical pipes a transfer used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipe {
    /// The interrupt pipe carrying command headers.
    Control,
    /// The bulk pipe carrying payload chunks.
    Bulk,
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipe::Control => f.write_str("control"),
            Pipe::Bulk => f.write_str("bulk"),
        }
    }
}

/// One interrupt pipe and one bulk pipe, seen from one end of the link.
///
/// "Write" always means towards the peer and "read" means from the peer, so
/// the same trait serves the host (USB host controller) and the device
/// (endpoint FIFOs). Every call is bounded by `timeout`; implementations
/// never retry.
pub trait Endpoints: Send {
    /// Write one control packet. Returns bytes written.
    fn write_control(&mut self, packet: &[u8], timeout: Duration) -> Result<usize>;

    /// Read one control packet into `buf`. Returns bytes read.
    fn read_control(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write one bulk chunk. Returns bytes written.
    fn write_bulk(&mut self, chunk: &[u8], timeout: Duration) -> Result<usize>;

    /// Read one bulk chunk into `buf`. Returns bytes read.
    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<E: Endpoints + ?Sized> Endpoints for Box<E> {
    fn write_control(&mut self, packet: &[u8], timeout: Duration) -> Result<usize> {
        (**self).write_control(packet, timeout)
    }

    fn read_control(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_control(buf, timeout)
    }

    fn write_bulk(&mut self, chunk: &[u8], timeout: Duration) -> Result<usize> {
        (**self).write_bulk(chunk, timeout)
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_bulk(buf, timeout)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
