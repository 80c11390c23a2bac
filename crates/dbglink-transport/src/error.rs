use std::time::Duration;

use crate::traits::Pipe;

/// Errors that can occur on the endpoint pair.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No attached device advertises the debug interface.
    #[error("no device with interface {class:#04x}/{subclass:#04x}/{protocol:#04x} found")]
    NotFound { class: u8, subclass: u8, protocol: u8 },

    /// The debug interface was found but could not be opened or claimed.
    #[error("failed to claim interface {interface} on bus {bus} address {address}: {reason}")]
    Claim {
        bus: u8,
        address: u8,
        interface: u8,
        reason: String,
    },

    /// A transfer did not complete within its timeout.
    #[error("{pipe} transfer timed out after {timeout:?}")]
    Timeout { pipe: Pipe, timeout: Duration },

    /// The peer went away (device unplugged or rebooted, or the other end dropped).
    #[error("{pipe} endpoint disconnected")]
    Disconnected { pipe: Pipe },

    /// A transfer was larger than the receive buffer.
    #[error("{pipe} transfer overflow ({size} bytes, buffer {capacity})")]
    Overflow {
        pipe: Pipe,
        size: usize,
        capacity: usize,
    },

    /// Host controller / libusb error.
    #[cfg(feature = "usb")]
    #[error("usb error on {pipe}: {source}")]
    Usb { pipe: Pipe, source: rusb::Error },

    /// An I/O error occurred outside a specific pipe (context setup, enumeration).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True if the error is a timeout rather than a hard fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
