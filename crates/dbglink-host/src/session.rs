use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use dbglink_frame::{announce_len, command_name, Command, CommandHeader, Link};
use dbglink_transport::Endpoints;
use tracing::{debug, error, warn};

use crate::config::SessionConfig;
use crate::error::{HostError, Result};
use crate::redirect::Redirect;

struct LinkState<T> {
    link: Link<T>,
    redirect: Option<Redirect>,
}

#[derive(Default)]
struct Signals {
    yield_requested: bool,
    input_closed: bool,
    shutdown: bool,
}

/// Exclusive owner of a claimed debug link, shared by both pumps.
///
/// The link and the download redirect sit behind one mutex; a
/// [`Transaction`] is the only way to reach either. Yield and shutdown are
/// separate advisory signals so they can be raised without waiting on a
/// transaction in flight.
pub struct HostSession<T> {
    state: Mutex<LinkState<T>>,
    signals: Mutex<Signals>,
    changed: Condvar,
    config: SessionConfig,
}

impl<T: Endpoints> HostSession<T> {
    pub fn new(endpoints: T) -> Self {
        Self::with_config(endpoints, SessionConfig::default())
    }

    pub fn with_config(endpoints: T, config: SessionConfig) -> Self {
        Self {
            state: Mutex::new(LinkState {
                link: Link::with_config(endpoints, config.link.clone()),
                redirect: None,
            }),
            signals: Mutex::new(Signals::default()),
            changed: Condvar::new(),
            config,
        }
    }

    /// Take the transaction lock, blocking until the other pump releases it.
    pub fn begin(&self) -> Transaction<'_, T> {
        Transaction {
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
            max_stray_headers: self.config.max_stray_headers,
        }
    }

    /// True while a download still expects bytes.
    pub fn download_pending(&self) -> bool {
        self.begin().redirect().is_some()
    }
}

impl<T> HostSession<T> {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn signals(&self) -> MutexGuard<'_, Signals> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the output pump to stay off the link until the guard drops.
    pub fn request_yield(&self) -> YieldGuard<'_> {
        self.signals().yield_requested = true;
        YieldGuard {
            signals: &self.signals,
            changed: &self.changed,
        }
    }

    pub fn yield_requested(&self) -> bool {
        self.signals().yield_requested
    }

    /// Block while a yield is requested. Returns `false` once the session is
    /// shut down.
    pub fn wait_for_turn(&self) -> bool {
        let guard = self
            .changed
            .wait_while(self.signals(), |s| s.yield_requested && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        !guard.shutdown
    }

    /// Sleep up to `duration`, waking early on shutdown.
    pub fn idle(&self, duration: Duration) {
        let _ = self
            .changed
            .wait_timeout_while(self.signals(), duration, |s| !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Record that no more input will arrive. The output pump then stops on
    /// its first empty poll with no download pending.
    pub fn close_input(&self) {
        self.signals().input_closed = true;
        self.changed.notify_all();
    }

    pub fn input_closed(&self) -> bool {
        self.signals().input_closed
    }

    /// Tell both pumps to stop. Idempotent.
    pub fn shutdown(&self) {
        let mut signals = self.signals();
        if !signals.shutdown {
            debug!("session shutdown requested");
            signals.shutdown = true;
        }
        drop(signals);
        self.changed.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.signals().shutdown
    }
}

/// Clears the yield request on drop.
pub struct YieldGuard<'a> {
    signals: &'a Mutex<Signals>,
    changed: &'a Condvar,
}

impl Drop for YieldGuard<'_> {
    fn drop(&mut self) {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .yield_requested = false;
        self.changed.notify_all();
    }
}

/// Exclusive use of the link for one or more complete transactions.
pub struct Transaction<'a, T> {
    state: MutexGuard<'a, LinkState<T>>,
    max_stray_headers: usize,
}

impl<T: Endpoints> Transaction<'_, T> {
    /// Send `DumpBuffer(0)` and return how many bytes the device holds.
    pub fn poll(&mut self) -> Result<usize> {
        self.state.link.send(Command::DumpBuffer, 0)?;
        let reply = self.await_header(Command::DumpBuffer)?;
        Ok(reply.len())
    }

    /// Grant a drain of `len` bytes and collect them.
    pub fn go_ahead(&mut self, len: usize) -> Result<Bytes> {
        self.state
            .link
            .send(Command::DumpBufferGoAhead, announce_len(len)?)?;
        Ok(self.state.link.recv_payload(len)?)
    }

    /// Deliver one command buffer: announce, wait for the go-ahead, stream.
    pub fn send_buffer(&mut self, bytes: &[u8]) -> Result<()> {
        let len = announce_len(bytes.len())?;
        self.state.link.send(Command::SendCommand, len)?;
        let grant = self.await_header(Command::SendCommandGoAhead)?;
        if grant.data_len != len {
            warn!(announced = len, granted = grant.data_len, "go-ahead length differs");
        }
        let chunks = self.state.link.send_payload(bytes)?;
        debug!(len, chunks, "command buffer sent");
        Ok(())
    }

    fn await_header(&mut self, want: Command) -> Result<CommandHeader> {
        let mut strays = 0usize;
        loop {
            let header = self.state.link.recv_header()?;
            if header.is(want) {
                return Ok(header);
            }
            strays += 1;
            let expected = command_name(want.code());
            if strays > self.max_stray_headers {
                return Err(HostError::Desync {
                    expected,
                    got: header.command,
                    attempts: strays,
                });
            }
            warn!(?header, expected, strays, "discarding stray header");
        }
    }

    /// Route the next downloaded bytes to `redirect`.
    ///
    /// An empty redirect closes at once. A redirect still pending is
    /// replaced, and its file keeps whatever it received so far.
    pub fn arm_redirect(&mut self, redirect: Redirect) {
        if let Some(old) = self.state.redirect.take() {
            warn!(
                path = %old.path().display(),
                remaining = old.remaining(),
                "replacing unfinished download"
            );
            close(old);
        }
        if redirect.is_complete() {
            close(redirect);
        } else {
            debug!(path = %redirect.path().display(), len = redirect.remaining(), "download armed");
            self.state.redirect = Some(redirect);
        }
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.state.redirect.as_ref()
    }

    /// Feed drained bytes to the active redirect and return what is left
    /// for the console.
    pub fn divert<'d>(&mut self, data: &'d [u8]) -> &'d [u8] {
        let Some(redirect) = self.state.redirect.as_mut() else {
            return data;
        };
        let rest = redirect.absorb(data);
        if redirect.is_complete() {
            if let Some(done) = self.state.redirect.take() {
                close(done);
            }
        }
        rest
    }
}

fn close(redirect: Redirect) {
    let path = redirect.path().to_path_buf();
    if let Err(err) = redirect.finish() {
        error!(path = %path.display(), %err, "failed to flush download");
    }
}
