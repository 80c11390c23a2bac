use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use dbglink_transport::Endpoints;
use tracing::{debug, error, info, warn};

use crate::error::{HostError, Result};
use crate::history::History;
use crate::redirect::Redirect;
use crate::session::{HostSession, Transaction};

/// What one interactive line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Plain console text, sent with a trailing newline.
    Console(String),
    /// `!path[@addr]`
    Upload {
        path: PathBuf,
        address: Option<String>,
    },
    /// `~path[@addr]:len`
    Download {
        path: PathBuf,
        address: Option<String>,
        len: u64,
    },
}

/// Classify one input line. A trailing newline is ignored.
pub fn parse_line(line: &str) -> Result<InputAction> {
    let line = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line);

    if let Some(target) = line.strip_prefix('!') {
        let (path, address) = split_address(target, line)?;
        return Ok(InputAction::Upload { path, address });
    }

    if let Some(target) = line.strip_prefix('~') {
        let (target, len) = target
            .rsplit_once(':')
            .ok_or_else(|| HostError::MissingLength {
                line: line.to_string(),
            })?;
        let len = parse_len(len).ok_or_else(|| HostError::InvalidLength {
            text: len.to_string(),
        })?;
        let (path, address) = split_address(target, line)?;
        return Ok(InputAction::Download { path, address, len });
    }

    Ok(InputAction::Console(line.to_string()))
}

fn split_address(target: &str, line: &str) -> Result<(PathBuf, Option<String>)> {
    let (path, address) = match target.rsplit_once('@') {
        Some((path, address)) if !address.is_empty() => (path, Some(address.to_string())),
        Some((path, _)) => (path, None),
        None => (target, None),
    };
    if path.is_empty() {
        return Err(HostError::EmptyPath {
            line: line.to_string(),
        });
    }
    Ok((PathBuf::from(path), address))
}

fn parse_len(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Carry out one action on the link.
///
/// Local files are opened before the yield is raised, so a bad path never
/// touches the link. A fatal error also shuts the session down.
pub fn execute<T: Endpoints>(session: &HostSession<T>, action: InputAction) -> Result<()> {
    match action {
        InputAction::Console(line) => {
            let mut buffer = line.into_bytes();
            buffer.push(b'\n');
            transact(session, |txn| txn.send_buffer(&buffer))
        }
        InputAction::Upload { path, address } => {
            let data = std::fs::read(&path).map_err(|source| HostError::ReadFile {
                path: path.clone(),
                source,
            })?;
            let address = address.unwrap_or_else(|| session.config().default_address.clone());
            let directive = format!("sendfile {address}");
            transact(session, |txn| {
                txn.send_buffer(directive.as_bytes())?;
                txn.send_buffer(&data)
            })?;
            info!(path = %path.display(), %address, len = data.len(), "file uploaded");
            Ok(())
        }
        InputAction::Download { path, address, len } => {
            let redirect = Redirect::create(&path, len).map_err(|source| HostError::CreateFile {
                path: path.clone(),
                source,
            })?;
            let address = address.unwrap_or_else(|| session.config().default_address.clone());
            let directive = format!("getfile {address} {len}");
            transact(session, |txn| {
                txn.send_buffer(directive.as_bytes())?;
                txn.arm_redirect(redirect);
                Ok(())
            })?;
            debug!(path = %path.display(), %address, len, "download requested");
            Ok(())
        }
    }
}

fn transact<T, F>(session: &HostSession<T>, f: F) -> Result<()>
where
    T: Endpoints,
    F: FnOnce(&mut Transaction<'_, T>) -> Result<()>,
{
    let yielding = session.request_yield();
    let mut txn = session.begin();
    let result = f(&mut txn);
    drop(txn);
    drop(yielding);
    thread::yield_now();

    if let Err(err) = &result {
        if err.is_fatal() {
            session.shutdown();
        }
    }
    result
}

/// Source of interactive lines.
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Lines from any buffered reader.
pub struct ReadLines<R> {
    reader: R,
}

impl<R: BufRead + Send> ReadLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead + Send> LineSource for ReadLines<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// Reads lines, records them, and executes them against the session.
pub struct InputPump<'a, T, S> {
    session: &'a HostSession<T>,
    source: S,
    history: Option<History>,
}

impl<'a, T: Endpoints, S: LineSource> InputPump<'a, T, S> {
    pub fn new(session: &'a HostSession<T>, source: S, history: Option<History>) -> Self {
        Self {
            session,
            source,
            history,
        }
    }

    /// Run until end of input, shutdown, or a fatal error.
    ///
    /// Errors local to one line are logged and the loop continues.
    pub fn run(&mut self) -> Result<()> {
        while !self.session.is_shut_down() {
            let line = match self.source.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("input closed");
                    self.session.close_input();
                    return Ok(());
                }
                Err(err) => {
                    self.session.shutdown();
                    return Err(HostError::Input(err));
                }
            };

            if let Some(history) = self.history.as_mut() {
                if let Err(err) = history.record(&line) {
                    warn!(path = %history.path().display(), %err, "failed to save history");
                }
            }

            match parse_line(&line).and_then(|action| execute(self.session, action)) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    error!(%err, "input pump stopped");
                    return Err(err);
                }
                Err(err) => error!(%err, "command dropped"),
            }
        }
        Ok(())
    }
}
