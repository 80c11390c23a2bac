/// Errors that can occur while exchanging headers and payloads.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A control transfer was not exactly one header long.
    #[error("short command header ({len} bytes, expected 8)")]
    ShortHeader { len: usize },

    /// The payload cannot be announced in a 32-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer stopped delivering bulk data before the announced length.
    #[error("payload truncated ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },

    /// The endpoint pair reported a fault.
    #[error("transport fault: {0}")]
    Transport(#[from] dbglink_transport::TransportError),
}

impl FrameError {
    /// True if the underlying fault was a transfer timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
