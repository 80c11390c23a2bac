//! Command codes carried in the header's first field.
//!
//! Code 1 is reserved and never sent.

/// Host asks how many console bytes are buffered; device answers with the count.
pub const DUMP_BUFFER: u32 = 0;

/// Reserved, unused.
pub const RESERVED: u32 = 1;

/// Host authorizes the device to stream `data_len` buffered console bytes.
pub const DUMP_BUFFER_GO_AHEAD: u32 = 2;

/// Host announces a `data_len`-byte command buffer.
pub const SEND_COMMAND: u32 = 3;

/// Device authorizes the host to stream the announced command buffer.
pub const SEND_COMMAND_GO_AHEAD: u32 = 4;

/// A recognized command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    DumpBuffer,
    DumpBufferGoAhead,
    SendCommand,
    SendCommandGoAhead,
}

impl Command {
    /// Wire value of this command.
    pub fn code(self) -> u32 {
        match self {
            Command::DumpBuffer => DUMP_BUFFER,
            Command::DumpBufferGoAhead => DUMP_BUFFER_GO_AHEAD,
            Command::SendCommand => SEND_COMMAND,
            Command::SendCommandGoAhead => SEND_COMMAND_GO_AHEAD,
        }
    }

    /// Map a wire value to a command, `None` for reserved or unknown codes.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            DUMP_BUFFER => Some(Command::DumpBuffer),
            DUMP_BUFFER_GO_AHEAD => Some(Command::DumpBufferGoAhead),
            SEND_COMMAND => Some(Command::SendCommand),
            SEND_COMMAND_GO_AHEAD => Some(Command::SendCommandGoAhead),
            _ => None,
        }
    }
}

/// Returns a human-readable name for a command code.
pub fn command_name(code: u32) -> &'static str {
    match code {
        DUMP_BUFFER => "DUMP_BUFFER",
        RESERVED => "RESERVED",
        DUMP_BUFFER_GO_AHEAD => "DUMP_BUFFER_GO_AHEAD",
        SEND_COMMAND => "SEND_COMMAND",
        SEND_COMMAND_GO_AHEAD => "SEND_COMMAND_GO_AHEAD",
        _ => "UNKNOWN",
    }
}
