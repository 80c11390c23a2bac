//! Host side of the dbglink debug protocol.
//!
//! A [`HostSession`] owns the claimed endpoint pair. Two pumps share it: the
//! [`OutputPump`] polls the device and copies its console output to stdout
//! (or into a download file), while the [`InputPump`] turns interactive lines
//! into console text, uploads and downloads. Every exchange runs as one
//! locked [`Transaction`]; the input side raises a yield request so that the
//! output side steps aside between drain cycles.

pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod output;
pub mod pumps;
pub mod redirect;
pub mod session;

#[cfg(test)]
mod sim;

pub use config::{SessionConfig, DEFAULT_ADDRESS};
pub use error::{HostError, Result};
pub use history::History;
pub use input::{execute, parse_line, InputAction, InputPump, LineSource, ReadLines};
pub use output::{DrainReport, OutputPump};
pub use pumps::{PumpExit, PumpKind, Pumps};
pub use redirect::Redirect;
pub use session::{HostSession, Transaction, YieldGuard};
