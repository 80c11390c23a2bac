//! Endpoint pair abstraction for the dbglink debug protocol.
//!
//! A debug link is one interrupt pipe (8-byte command headers) plus one bulk
//! pipe (payload chunks) in each direction. Backends:
//! - libusb via `rusb` on the host (feature `usb`)
//! - an in-memory pair for simulation and tests
//!
//! This is the lowest layer of dbglink. Everything else builds on top of
//! the [`Endpoints`] trait provided here.

pub mod error;
pub mod filter;
pub mod memory;
pub mod traits;

#[cfg(feature = "usb")]
pub mod usb;

pub use error::{Result, TransportError};
pub use filter::{DeviceFilter, DeviceInfo, DEBUG_CLASS, DEBUG_PROTOCOL, DEBUG_SUBCLASS};
pub use memory::{pair, MemoryEndpoints, Transfer, TransferLog};
pub use traits::{Endpoints, Pipe, BULK_IN, BULK_OUT, INTERRUPT_IN, INTERRUPT_OUT};

#[cfg(feature = "usb")]
pub use usb::UsbEndpoints;
