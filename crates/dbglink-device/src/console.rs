use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::capture::OutputCapture;
use crate::directive::Directive;
use crate::error::DeviceError;
use crate::memory::MemoryAccess;

/// Receives every command buffer the host sends.
pub trait InputHandler: Send {
    fn handle(&mut self, input: Bytes, capture: &OutputCapture);
}

/// Console lines waiting for the firmware shell.
///
/// Clones share one queue; the shell pops, the dispatcher pushes.
#[derive(Clone, Default)]
pub struct CommandQueue {
    inner: Arc<(Mutex<VecDeque<String>>, Condvar)>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: String) {
        self.lock().push_back(line);
        self.inner.1.notify_one();
    }

    /// Next line if one is queued.
    pub fn pop(&self) -> Option<String> {
        self.lock().pop_front()
    }

    /// Next line, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<String> {
        let guard = self.lock();
        let (mut guard, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        guard.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("queued", &self.len())
            .finish()
    }
}

/// Location and size of the most recent `sendfile` upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload {
    pub address: u32,
    pub len: usize,
}

/// Default input handler: routes directives to memory and text to the shell.
pub struct Console<M> {
    memory: M,
    queue: CommandQueue,
    pending_upload: Option<u32>,
    last_upload: Option<Upload>,
}

impl<M: MemoryAccess> Console<M> {
    pub fn new(memory: M, queue: CommandQueue) -> Self {
        Self {
            memory,
            queue,
            pending_upload: None,
            last_upload: None,
        }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Address armed by `sendfile` and not yet filled.
    pub fn pending_upload(&self) -> Option<u32> {
        self.pending_upload
    }

    pub fn last_upload(&self) -> Option<Upload> {
        self.last_upload
    }

    fn store_upload(&mut self, address: u32, data: &[u8], capture: &OutputCapture) {
        match self.memory.write(address, data) {
            Ok(()) => {
                info!(
                    address = format_args!("{address:#010x}"),
                    len = data.len(),
                    "file received"
                );
                self.last_upload = Some(Upload {
                    address,
                    len: data.len(),
                });
            }
            Err(err) => report(capture, &err),
        }
    }
}

impl<M: MemoryAccess> InputHandler for Console<M> {
    fn handle(&mut self, input: Bytes, capture: &OutputCapture) {
        if let Some(address) = self.pending_upload.take() {
            self.store_upload(address, &input, capture);
            return;
        }

        let text = String::from_utf8_lossy(&input);
        match Directive::parse(&text) {
            Ok(Directive::SendFile { address }) => {
                debug!(address = format_args!("{address:#010x}"), "upload armed");
                self.pending_upload = Some(address);
            }
            Ok(Directive::GetFile { address, len }) => match self.memory.read(address, len) {
                Ok(bytes) => {
                    debug!(address = format_args!("{address:#010x}"), len, "file queued for host");
                    capture.append(&bytes);
                }
                Err(err) => report(capture, &err),
            },
            Ok(Directive::Line(line)) => self.queue.push(line),
            Err(err) => report(capture, &err),
        }
    }
}

fn report(capture: &OutputCapture, err: &DeviceError) {
    warn!(%err, "console input rejected");
    capture.append(format!("error: {err}\n").as_bytes());
}
