use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dbglink_transport::Endpoints;
use tracing::{debug, warn};

use crate::error::{HostError, Result};
use crate::history::History;
use crate::input::{InputPump, LineSource};
use crate::output::OutputPump;
use crate::session::HostSession;

/// Which worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpKind {
    Output,
    Input,
}

impl PumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Input => "input",
        }
    }
}

/// The first pump to stop, and why.
#[derive(Debug)]
pub struct PumpExit {
    pub pump: PumpKind,
    pub result: Result<()>,
}

/// Both pumps running on their own threads over one session.
pub struct Pumps<T> {
    session: Arc<HostSession<T>>,
    exits: Receiver<PumpExit>,
    output: JoinHandle<()>,
}

impl<T: Endpoints + 'static> Pumps<T> {
    pub fn spawn<S, W>(
        session: Arc<HostSession<T>>,
        lines: S,
        history: Option<History>,
        console: W,
    ) -> std::io::Result<Self>
    where
        S: LineSource + 'static,
        W: Write + Send + 'static,
    {
        let (tx, exits) = mpsc::channel();

        let output = {
            let session = Arc::clone(&session);
            let tx = tx.clone();
            thread::Builder::new()
                .name("dbglink-output".to_string())
                .spawn(move || {
                    report(&tx, PumpKind::Output, || {
                        OutputPump::new(&*session, console).run()
                    })
                })?
        };

        // The input thread may sit in a blocking read forever; it is detached.
        {
            let session = Arc::clone(&session);
            thread::Builder::new()
                .name("dbglink-input".to_string())
                .spawn(move || {
                    report(&tx, PumpKind::Input, || {
                        InputPump::new(&*session, lines, history).run()
                    })
                })?;
        }

        Ok(Self {
            session,
            exits,
            output,
        })
    }
}

impl<T> Pumps<T> {
    pub fn session(&self) -> &Arc<HostSession<T>> {
        &self.session
    }

    /// Block until either pump stops, then stop the output pump too.
    ///
    /// When input simply ends, output keeps draining for up to the session's
    /// `drain_timeout` so buffered output and armed downloads still land. An
    /// output failure during that drain is what gets reported.
    pub fn wait(self) -> PumpExit {
        let mut exit = self.exits.recv().unwrap_or_else(|_| PumpExit {
            pump: PumpKind::Output,
            result: Err(HostError::Panicked { pump: "output" }),
        });
        debug!(pump = exit.pump.as_str(), ok = exit.result.is_ok(), "pump exited");

        if exit.pump == PumpKind::Input && exit.result.is_ok() {
            let drain = self.session.config().drain_timeout;
            match self.exits.recv_timeout(drain) {
                Ok(output) if output.result.is_err() => exit = output,
                Ok(_) => debug!("output drained"),
                Err(_) => warn!(?drain, "output still busy at drain deadline"),
            }
        }

        self.session.shutdown();
        let _ = self.output.join();
        exit
    }
}

fn report(tx: &Sender<PumpExit>, pump: PumpKind, body: impl FnOnce() -> Result<()>) {
    let result = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        Err(HostError::Panicked {
            pump: pump.as_str(),
        })
    });
    let _ = tx.send(PumpExit { pump, result });
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::input::ReadLines;
    use crate::sim::{self, Rig};

    #[test]
    fn end_of_input_stops_both_pumps() {
        let rig = Rig::attach(0x0900_0000, 256);
        rig.capture.append(b"=> ");

        let pumps = Pumps::spawn(
            Arc::clone(&rig.session),
            ReadLines::new(Cursor::new("version\n")),
            None,
            std::io::sink(),
        )
        .unwrap();
        let exit = pumps.wait();

        assert_eq!(exit.pump, PumpKind::Input);
        assert!(exit.result.is_ok());
        assert!(rig.session.is_shut_down());
        assert_eq!(
            rig.queue.pop_timeout(Duration::from_secs(1)).as_deref(),
            Some("version")
        );
        rig.stop();
    }

    #[test]
    fn download_on_last_line_lands_before_exit() {
        let contents: Vec<u8> = (0..100u8).collect();
        let rig = Rig::with_contents(0x0900_0000, &contents, 256);
        let path = sim::temp_path("eof-download");

        let pumps = Pumps::spawn(
            Arc::clone(&rig.session),
            ReadLines::new(Cursor::new(format!("~{}:100\n", path.display()))),
            None,
            std::io::sink(),
        )
        .unwrap();
        let exit = pumps.wait();

        assert_eq!(exit.pump, PumpKind::Input);
        assert!(exit.result.is_ok());
        assert_eq!(std::fs::read(&path).unwrap(), contents);
        assert!(rig.capture.is_empty());
        let _ = std::fs::remove_file(&path);
        rig.stop();
    }

    #[test]
    fn stalled_download_is_cut_off_at_drain_deadline() {
        let rig = Rig::attach(0x0900_0000, 256);
        let path = sim::temp_path("stalled-download");
        rig.session
            .begin()
            .arm_redirect(crate::redirect::Redirect::create(&path, 8).unwrap());

        let started = Instant::now();
        let pumps = Pumps::spawn(
            Arc::clone(&rig.session),
            ReadLines::new(Cursor::new("")),
            None,
            std::io::sink(),
        )
        .unwrap();
        let exit = pumps.wait();

        assert_eq!(exit.pump, PumpKind::Input);
        assert!(exit.result.is_ok());
        assert!(started.elapsed() >= rig.session.config().drain_timeout);
        assert!(rig.session.is_shut_down());
        assert!(rig.session.download_pending());
        let _ = std::fs::remove_file(&path);
        rig.stop();
    }

    #[test]
    fn output_fault_is_reported() {
        let (session, device) = sim::detached();
        drop(device);

        struct Never;
        impl LineSource for Never {
            fn next_line(&mut self) -> std::io::Result<Option<String>> {
                std::thread::sleep(Duration::from_secs(3600));
                Ok(None)
            }
        }

        let pumps = Pumps::spawn(Arc::new(session), Never, None, std::io::sink()).unwrap();
        let exit = pumps.wait();
        assert_eq!(exit.pump, PumpKind::Output);
        assert!(matches!(exit.result, Err(HostError::Frame(_))));
    }

    #[test]
    fn external_shutdown_ends_output_cleanly() {
        let rig = Rig::attach(0x0900_0000, 256);

        struct Idle;
        impl LineSource for Idle {
            fn next_line(&mut self) -> std::io::Result<Option<String>> {
                std::thread::sleep(Duration::from_secs(3600));
                Ok(None)
            }
        }

        let pumps =
            Pumps::spawn(Arc::clone(&rig.session), Idle, None, std::io::sink()).unwrap();
        pumps.session().shutdown();
        let exit = pumps.wait();
        assert_eq!(exit.pump, PumpKind::Output);
        assert!(exit.result.is_ok());
        rig.stop();
    }
}
