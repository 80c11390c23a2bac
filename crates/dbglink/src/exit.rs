use std::fmt;
use std::io;

use dbglink_frame::FrameError;
use dbglink_host::HostError;
use dbglink_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Discovery failures and link faults share one code.
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn host_error(context: &str, err: HostError) -> CliError {
    match err {
        HostError::Frame(err) => frame_error(context, err),
        HostError::Desync { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        HostError::ReadFile { source, .. } | HostError::CreateFile { source, .. } => {
            io_error(context, source)
        }
        HostError::Console(source) | HostError::Input(source) => io_error(context, source),
        HostError::MissingLength { .. }
        | HostError::InvalidLength { .. }
        | HostError::EmptyPath { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dbglink_transport::Pipe;

    use super::*;

    #[test]
    fn missing_device_is_a_transport_error() {
        let err = transport_error(
            "device open failed",
            TransportError::NotFound {
                class: 0xff,
                subclass: 0xff,
                protocol: 0x51,
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("device open failed: no device"));
    }

    #[test]
    fn link_timeout_inside_pump_maps_to_transport() {
        let err = host_error(
            "output pump failed",
            HostError::Frame(FrameError::Transport(TransportError::Timeout {
                pipe: Pipe::Control,
                timeout: Duration::from_secs(1),
            })),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn desync_is_invalid_data() {
        let err = host_error(
            "input pump failed",
            HostError::Desync {
                expected: "DUMP_BUFFER",
                got: 3,
                attempts: 65,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn unreadable_upload_is_a_failure() {
        let err = host_error(
            "upload failed",
            HostError::ReadFile {
                path: "missing.bin".into(),
                source: io::ErrorKind::NotFound.into(),
            },
        );
        assert_eq!(err.code, FAILURE);
    }
}
