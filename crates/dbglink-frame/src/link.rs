use bytes::{Bytes, BytesMut};
use dbglink_transport::Endpoints;
use tracing::trace;

use crate::codec::{
    chunk_lengths, decode_header, header_bytes, CommandHeader, LinkConfig, HEADER_SIZE,
};
use crate::command::Command;
use crate::error::{FrameError, Result};

/// Header and payload operations over one endpoint pair.
///
/// The link is chunk oriented: a payload of `n` bytes is moved as
/// `ceil(n / max_chunk_size)` bulk transfers. It never retries; a timeout or
/// a short transfer is returned to the caller as-is.
pub struct Link<T> {
    inner: T,
    config: LinkConfig,
    scratch: Vec<u8>,
}

impl<T: Endpoints> Link<T> {
    /// Create a link with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LinkConfig::default())
    }

    /// Create a link with explicit configuration.
    pub fn with_config(inner: T, config: LinkConfig) -> Self {
        let scratch = vec![0u8; config.max_chunk_size.max(1)];
        Self {
            inner,
            config,
            scratch,
        }
    }

    /// Send one header on the interrupt pipe.
    pub fn send_header(&mut self, header: CommandHeader) -> Result<()> {
        let bytes = header_bytes(&header);
        let written = self.inner.write_control(&bytes, self.config.timeout)?;
        if written != HEADER_SIZE {
            return Err(FrameError::ShortHeader { len: written });
        }
        trace!(?header, "header sent");
        Ok(())
    }

    /// Send a header for a known command.
    pub fn send(&mut self, command: Command, data_len: u32) -> Result<()> {
        self.send_header(CommandHeader::new(command, data_len))
    }

    /// Receive one header from the interrupt pipe.
    pub fn recv_header(&mut self) -> Result<CommandHeader> {
        let mut buf = [0u8; HEADER_SIZE];
        let read = self.inner.read_control(&mut buf, self.config.timeout)?;
        let header = decode_header(&buf[..read])?;
        trace!(?header, "header received");
        Ok(header)
    }

    /// Send one bulk chunk of at most `max_chunk_size` bytes.
    pub fn send_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.len() > self.config.max_chunk_size {
            return Err(FrameError::PayloadTooLarge {
                size: chunk.len(),
                max: self.config.max_chunk_size,
            });
        }
        let written = self.inner.write_bulk(chunk, self.config.timeout)?;
        if written != chunk.len() {
            return Err(FrameError::Truncated {
                expected: chunk.len(),
                received: written,
            });
        }
        Ok(())
    }

    /// Receive one bulk chunk of at most `max_len` bytes (capped at `max_chunk_size`).
    pub fn recv_chunk(&mut self, max_len: usize) -> Result<&[u8]> {
        let want = max_len.min(self.config.max_chunk_size);
        let read = self
            .inner
            .read_bulk(&mut self.scratch[..want], self.config.timeout)?;
        Ok(&self.scratch[..read])
    }

    /// Send a whole payload as consecutive chunks. Returns the chunk count.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        let mut chunks = 0usize;
        for len in chunk_lengths(payload.len(), self.config.max_chunk_size) {
            self.send_chunk(&payload[offset..offset + len])?;
            offset += len;
            chunks += 1;
        }
        trace!(len = payload.len(), chunks, "payload sent");
        Ok(chunks)
    }

    /// Receive exactly `len` payload bytes, reassembling chunks.
    ///
    /// `len` comes off the wire, so the buffer grows as chunks arrive instead
    /// of being reserved up front.
    pub fn recv_payload(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(len.min(self.config.max_chunk_size));
        while buf.len() < len {
            let remaining = len - buf.len();
            let chunk = self.recv_chunk(remaining)?;
            if chunk.is_empty() {
                return Err(FrameError::Truncated {
                    expected: len,
                    received: buf.len(),
                });
            }
            buf.extend_from_slice(chunk);
        }
        trace!(len, "payload received");
        Ok(buf.freeze())
    }

    /// Borrow the underlying endpoints.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the link and return the inner endpoints.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl<T: Endpoints> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("transport", &self.inner.transport_name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dbglink_transport::{pair, Pipe, TransportError};

    use super::*;

    fn fast() -> LinkConfig {
        LinkConfig {
            timeout: Duration::from_millis(50),
            ..LinkConfig::default()
        }
    }

    #[test]
    fn header_crosses_the_link() {
        let (host, device) = pair();
        let mut host = Link::with_config(host, fast());
        let mut device = Link::with_config(device, fast());

        host.send(Command::DumpBuffer, 0).unwrap();
        let header = device.recv_header().unwrap();
        assert!(header.is(Command::DumpBuffer));
        assert_eq!(header.data_len, 0);
    }

    #[test]
    fn payload_is_split_into_bounded_chunks() {
        let (host, device) = pair();
        let log = host.log();
        let mut host = Link::with_config(host, fast());
        let mut device = Link::with_config(device, fast());

        let payload: Vec<u8> = (0..1300u32).map(|i| i as u8).collect();
        assert_eq!(host.send_payload(&payload).unwrap(), 3);

        let sizes: Vec<usize> = log.on(Pipe::Bulk).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![512, 512, 276]);

        let received = device.recv_payload(payload.len()).unwrap();
        assert_eq!(received.as_ref(), payload.as_slice());
    }

    #[test]
    fn empty_payload_sends_nothing() {
        let (host, _device) = pair();
        let log = host.log();
        let mut host = Link::with_config(host, fast());

        assert_eq!(host.send_payload(&[]).unwrap(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn recv_payload_zero_reads_nothing() {
        let (_host, device) = pair();
        let mut device = Link::with_config(device, fast());
        assert!(device.recv_payload(0).unwrap().is_empty());
    }

    #[test]
    fn oversized_chunk_is_rejected_before_transfer() {
        let (host, _device) = pair();
        let log = host.log();
        let mut host = Link::with_config(host, fast());

        let err = host.send_chunk(&[0u8; 513]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 513, max: 512 }));
        assert!(log.is_empty());
    }

    #[test]
    fn header_timeout_is_a_transport_fault() {
        let (_host, device) = pair();
        let mut device = Link::with_config(device, fast());
        let err = device.recv_header().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn short_control_transfer_is_rejected() {
        let (mut host, device) = pair();
        let mut device = Link::with_config(device, fast());
        host.write_control(&[0, 0, 0, 0], Duration::from_millis(50))
            .unwrap();
        assert!(matches!(
            device.recv_header(),
            Err(FrameError::ShortHeader { len: 4 })
        ));
    }

    #[test]
    fn empty_bulk_read_truncates_payload() {
        let (mut host, device) = pair();
        let mut device = Link::with_config(device, fast());
        host.write_bulk(b"abc", Duration::from_millis(50)).unwrap();
        host.write_bulk(b"", Duration::from_millis(50)).unwrap();

        let err = device.recv_payload(10).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                expected: 10,
                received: 3
            }
        ));
    }

    #[test]
    fn oversized_announcement_fails_on_the_data_actually_sent() {
        let (mut host, device) = pair();
        let mut device = Link::with_config(device, fast());
        host.write_bulk(b"abc", Duration::from_millis(50)).unwrap();
        host.write_bulk(b"", Duration::from_millis(50)).unwrap();

        let announced = u32::MAX as usize;
        let err = device.recv_payload(announced).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated { expected, received: 3 } if expected == announced
        ));
    }

    #[test]
    fn missing_payload_times_out() {
        let (_host, device) = pair();
        let mut device = Link::with_config(device, fast());
        let err = device.recv_payload(4).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Timeout { pipe: Pipe::Bulk, .. })
        ));
    }
}
