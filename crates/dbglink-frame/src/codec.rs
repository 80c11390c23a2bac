use std::fmt;
use std::time::Duration;

use bytes::Buf;

use crate::command::{command_name, Command};
use crate::error::{FrameError, Result};

/// Command header: command (4) + data length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest bulk transfer either side issues.
pub const MAX_CHUNK_SIZE: usize = 512;

/// Timeout applied to each header exchange and each payload chunk.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// One command header as carried on the interrupt pipe.
///
/// `command` is kept raw: decoding never rejects an unknown code, callers
/// decide what a stray value means via [`CommandHeader::kind`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandHeader {
    pub command: u32,
    pub data_len: u32,
}

impl CommandHeader {
    /// Create a header for a known command.
    pub fn new(command: Command, data_len: u32) -> Self {
        Self {
            command: command.code(),
            data_len,
        }
    }

    /// The recognized command, or `None` for reserved/unknown codes.
    pub fn kind(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    /// True if this header carries `command`.
    pub fn is(&self, command: Command) -> bool {
        self.command == command.code()
    }

    /// Announced length as a buffer size.
    pub fn len(&self) -> usize {
        self.data_len as usize
    }

    /// True if the header announces no payload.
    pub fn is_empty(&self) -> bool {
        self.data_len == 0
    }
}

impl fmt::Debug for CommandHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, len={})",
            command_name(self.command),
            self.command,
            self.data_len
        )
    }
}

/// Encode a header into a fixed array, ready for one interrupt transfer.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┐
/// │ Command (4B) │ DataLen (4B) │
/// │ LE u32       │ LE u32       │
/// └──────────────┴──────────────┘
/// ```
pub fn header_bytes(header: &CommandHeader) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[..4].copy_from_slice(&header.command.to_le_bytes());
    out[4..].copy_from_slice(&header.data_len.to_le_bytes());
    out
}

/// Decode one header from exactly [`HEADER_SIZE`] bytes.
///
/// There is no magic or checksum; anything eight bytes long decodes.
pub fn decode_header(src: &[u8]) -> Result<CommandHeader> {
    if src.len() != HEADER_SIZE {
        return Err(FrameError::ShortHeader { len: src.len() });
    }
    let mut src = src;
    let command = src.get_u32_le();
    let data_len = src.get_u32_le();
    Ok(CommandHeader { command, data_len })
}

/// Check that a payload length fits the 32-bit length field.
pub fn announce_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}

/// Sizes of the bulk transfers used to move `total` bytes: every chunk is
/// `max_chunk` except a shorter last one, none for `total == 0`.
pub fn chunk_lengths(total: usize, max_chunk: usize) -> impl Iterator<Item = usize> {
    let max_chunk = max_chunk.max(1);
    (0..total.div_ceil(max_chunk)).map(move |i| (total - i * max_chunk).min(max_chunk))
}

/// Configuration for a link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Largest bulk transfer. Default: 512 bytes.
    pub max_chunk_size: usize,
    /// Timeout for each header exchange and each chunk.
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: MAX_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{RESERVED, SEND_COMMAND};

    #[test]
    fn header_is_eight_little_endian_bytes() {
        let header = CommandHeader::new(Command::SendCommand, 0x0102_0304);
        let bytes = header_bytes(&header);

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes, [3, 0, 0, 0, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(decode_header(&bytes).unwrap(), header);
    }

    #[test]
    fn decode_reads_fields_in_order() {
        let header = decode_header(&[2, 0, 0, 0, 17, 0, 0, 0]).unwrap();
        assert_eq!(header.kind(), Some(Command::DumpBufferGoAhead));
        assert_eq!(header.data_len, 17);
    }

    #[test]
    fn decode_passes_unknown_commands_through() {
        let header = decode_header(&header_bytes(&CommandHeader {
            command: RESERVED,
            data_len: 5,
        }))
        .unwrap();
        assert_eq!(header.command, RESERVED);
        assert_eq!(header.kind(), None);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(matches!(
            decode_header(&[0, 0, 0]),
            Err(FrameError::ShortHeader { len: 3 })
        ));
        assert!(matches!(
            decode_header(&[0; 9]),
            Err(FrameError::ShortHeader { len: 9 })
        ));
    }

    #[test]
    fn header_predicates() {
        let header = CommandHeader {
            command: SEND_COMMAND,
            data_len: 0,
        };
        assert!(header.is(Command::SendCommand));
        assert!(!header.is(Command::SendCommandGoAhead));
        assert!(header.is_empty());
        assert_eq!(format!("{header:?}"), "SEND_COMMAND(3, len=0)");
    }

    #[test]
    fn chunk_lengths_cover_total() {
        assert_eq!(chunk_lengths(0, 512).count(), 0);
        assert_eq!(chunk_lengths(1, 512).collect::<Vec<_>>(), vec![1]);
        assert_eq!(chunk_lengths(512, 512).collect::<Vec<_>>(), vec![512]);
        assert_eq!(chunk_lengths(513, 512).collect::<Vec<_>>(), vec![512, 1]);
        assert_eq!(
            chunk_lengths(1300, 512).collect::<Vec<_>>(),
            vec![512, 512, 276]
        );
    }

    #[test]
    fn chunk_lengths_property() {
        for total in [0usize, 7, 511, 512, 1023, 1024, 1025, 4096, 10_000] {
            let chunks: Vec<_> = chunk_lengths(total, MAX_CHUNK_SIZE).collect();
            assert_eq!(chunks.len(), total.div_ceil(MAX_CHUNK_SIZE));
            assert_eq!(chunks.iter().sum::<usize>(), total);
            assert!(chunks.iter().all(|&c| c > 0 && c <= MAX_CHUNK_SIZE));
        }
    }

    #[test]
    fn announce_len_fits_u32() {
        assert_eq!(announce_len(1300).unwrap(), 1300);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            announce_len(u32::MAX as usize + 1),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }
}
