//! Command header framing and chunked payload transfer for dbglink.
//!
//! Every exchange starts with an 8-byte header on the interrupt pipe:
//! - a 4-byte little-endian command code
//! - a 4-byte little-endian payload length
//!
//! Payloads follow on the bulk pipe in chunks of at most 512 bytes. There is
//! no magic, checksum or delimiter; both ends stay in step only by running
//! matching state machines.

pub mod codec;
pub mod command;
pub mod error;
pub mod link;

pub use codec::{
    announce_len, chunk_lengths, decode_header, header_bytes, CommandHeader,
    LinkConfig, DEFAULT_TIMEOUT, HEADER_SIZE, MAX_CHUNK_SIZE,
};
pub use command::{
    command_name, Command, DUMP_BUFFER, DUMP_BUFFER_GO_AHEAD, RESERVED, SEND_COMMAND,
    SEND_COMMAND_GO_AHEAD,
};
pub use error::{FrameError, Result};
pub use link::Link;
