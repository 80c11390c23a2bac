//! Device side of the dbglink debug protocol.
//!
//! The firmware links this crate, hands it the endpoint pair of its debug
//! interface, and writes console output into an [`OutputCapture`]. The
//! [`Dispatcher`] answers the host's polls from that capture and delivers the
//! host's command buffers to an [`InputHandler`]. The stock handler,
//! [`Console`], understands the `sendfile`/`getfile` directives and queues
//! everything else for the firmware shell.

pub mod capture;
pub mod console;
pub mod directive;
pub mod dispatcher;
pub mod error;
pub mod memory;

pub use capture::OutputCapture;
pub use console::{CommandQueue, Console, InputHandler, Upload};
pub use directive::{parse_number, Directive};
pub use dispatcher::{
    Dispatcher, DispatcherConfig, RunningDispatcher, Served, DEFAULT_DUMP_LIMIT,
};
pub use error::{DeviceError, Result};
pub use memory::{MemoryAccess, RamWindow};
