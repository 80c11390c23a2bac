//! USB debug console and loader for bootloader bring-up.
//!
//! dbglink moves a device's console output to the host and carries console
//! input and whole files back, over one vendor-specific USB interface with an
//! interrupt pipe for command headers and a bulk pipe for payloads.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint pair abstraction (libusb behind `usb`, in-memory)
//! - [`frame`]: 8-byte command headers and chunked payloads
//! - [`device`]: device-side dispatcher and console handler (behind `device`)
//! - [`host`]: host session with output and input pumps (behind `host`)

/// Re-export transport types.
pub mod transport {
    pub use dbglink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dbglink_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use dbglink_device::*;
}

/// Re-export host types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use dbglink_host::*;
}
