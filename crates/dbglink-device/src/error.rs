/// Errors that can occur on the device side of the link.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Header or payload exchange failed.
    #[error("frame error: {0}")]
    Frame(#[from] dbglink_frame::FrameError),

    /// A console directive could not be parsed.
    #[error("invalid directive '{line}': {reason}")]
    InvalidDirective { line: String, reason: String },

    /// A memory access fell outside the accessible window.
    #[error("memory access out of range: {len} bytes at {address:#010x}")]
    OutOfRange { address: u32, len: usize },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
