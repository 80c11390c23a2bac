use std::path::PathBuf;

use dbglink_frame::command_name;

/// Errors that can occur in host session operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Header or payload exchange failed.
    #[error("frame error: {0}")]
    Frame(#[from] dbglink_frame::FrameError),

    /// The device kept answering with headers that do not fit the transaction.
    #[error(
        "protocol desync: expected {expected}, got {} ({got}) after {attempts} stray headers",
        stray_name(.got)
    )]
    Desync {
        expected: &'static str,
        got: u32,
        attempts: usize,
    },

    /// A local file for upload could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A local file for download could not be created.
    #[error("failed to create {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A download line had no `:<len>` part.
    #[error("download '{line}' is missing ':<len>'")]
    MissingLength { line: String },

    /// A download length did not parse.
    #[error("invalid length '{text}'")]
    InvalidLength { text: String },

    /// An upload/download line named no file.
    #[error("missing file name in '{line}'")]
    EmptyPath { line: String },

    /// Writing device output to the console failed.
    #[error("console write failed: {0}")]
    Console(std::io::Error),

    /// Reading interactive input failed.
    #[error("input read failed: {0}")]
    Input(std::io::Error),

    /// A pump thread panicked.
    #[error("{pump} pump panicked")]
    Panicked { pump: &'static str },
}

fn stray_name(code: &u32) -> &'static str {
    command_name(*code)
}

impl HostError {
    /// True if the link or the pump itself can no longer continue.
    ///
    /// Everything else only drops the offending command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Frame(_)
                | Self::Desync { .. }
                | Self::Console(_)
                | Self::Input(_)
                | Self::Panicked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
