use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use dbglink_frame::{announce_len, Command, Link, LinkConfig};
use dbglink_transport::Endpoints;
use tracing::{debug, warn};

use crate::capture::OutputCapture;
use crate::console::InputHandler;
use crate::error::Result;

/// Largest drain the device announces in reply to one poll.
pub const DEFAULT_DUMP_LIMIT: usize = 64 * 1024;

/// Configuration for the device command dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on the byte count reported for a `DumpBuffer` poll.
    pub dump_limit: usize,
    /// Chunk size and per-transfer timeout. The timeout also bounds how long
    /// the dispatcher waits for a header before reporting [`Served::Idle`].
    pub link: LinkConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dump_limit: DEFAULT_DUMP_LIMIT,
            link: LinkConfig::default(),
        }
    }
}

/// What one pass through the state machine did. The dispatcher is back in
/// Idle after every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// No header arrived within the timeout.
    Idle,
    /// Answered a `DumpBuffer` poll.
    Polled { available: usize },
    /// Streamed capture bytes after `DumpBufferGoAhead`.
    Drained { sent: usize },
    /// Accepted a command buffer after `SendCommand`.
    Received { len: usize },
    /// Dropped a header that does not start a transaction.
    Ignored { command: u32 },
}

/// Device side of the link: answers polls from the capture buffer and feeds
/// received command buffers to an [`InputHandler`].
///
/// Assumes a single host owns the link; no session id is exchanged.
pub struct Dispatcher<T, H> {
    link: Link<T>,
    handler: H,
    capture: OutputCapture,
    dump_limit: usize,
}

impl<T: Endpoints, H: InputHandler> Dispatcher<T, H> {
    pub fn new(endpoints: T, handler: H, capture: OutputCapture) -> Self {
        Self::with_config(endpoints, handler, capture, DispatcherConfig::default())
    }

    pub fn with_config(
        endpoints: T,
        handler: H,
        capture: OutputCapture,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            link: Link::with_config(endpoints, config.link),
            handler,
            capture,
            dump_limit: config.dump_limit,
        }
    }

    /// Wait for one header and run the transaction it starts.
    pub fn serve_one(&mut self) -> Result<Served> {
        let header = match self.link.recv_header() {
            Ok(header) => header,
            Err(err) if err.is_timeout() => return Ok(Served::Idle),
            Err(err) => return Err(err.into()),
        };

        match header.kind() {
            Some(Command::DumpBuffer) => {
                let available = self.capture.len().min(self.dump_limit);
                self.link
                    .send(Command::DumpBuffer, announce_len(available)?)?;
                Ok(Served::Polled { available })
            }
            Some(Command::DumpBufferGoAhead) => self.stream_capture(header.len()),
            Some(Command::SendCommand) => {
                self.link
                    .send(Command::SendCommandGoAhead, header.data_len)?;
                let input = self.link.recv_payload(header.len())?;
                let len = input.len();
                debug!(len, "command buffer received");
                self.handler.handle(input, &self.capture);
                Ok(Served::Received { len })
            }
            _ => {
                warn!(?header, "ignoring unexpected header");
                Ok(Served::Ignored {
                    command: header.command,
                })
            }
        }
    }

    fn stream_capture(&mut self, requested: usize) -> Result<Served> {
        let available = self.capture.len();
        if requested > available {
            warn!(requested, available, "go-ahead exceeds buffered output");
        }
        let total = requested.min(available);
        let max_chunk = self.link.config().max_chunk_size;

        let mut sent = 0usize;
        while sent < total {
            let chunk = self.capture.front((total - sent).min(max_chunk));
            self.link.send_chunk(&chunk)?;
            self.capture.consume(chunk.len());
            sent += chunk.len();
        }
        debug!(sent, "capture drained");
        Ok(Served::Drained { sent })
    }

    /// Serve transactions until `stop` is set or the link faults.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Acquire) {
            self.serve_one()?;
        }
        Ok(())
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn capture(&self) -> &OutputCapture {
        &self.capture
    }
}

impl<T, H> Dispatcher<T, H>
where
    T: Endpoints + 'static,
    H: InputHandler + 'static,
{
    /// Run the dispatcher on its own thread.
    pub fn spawn(mut self) -> RunningDispatcher<T, H> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let result = self.run(&thread_stop);
            (self, result)
        });
        RunningDispatcher { stop, handle }
    }
}

/// A dispatcher running on a background thread.
pub struct RunningDispatcher<T, H> {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<(Dispatcher<T, H>, Result<()>)>,
}

impl<T, H> RunningDispatcher<T, H> {
    /// Ask the thread to stop after its current wait, then hand the
    /// dispatcher back with the reason it ended.
    pub fn stop(self) -> std::thread::Result<(Dispatcher<T, H>, Result<()>)> {
        self.stop.store(true, Ordering::Release);
        self.handle.join()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
