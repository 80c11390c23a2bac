use std::io::Write;
use std::thread;

use dbglink_transport::Endpoints;
use tracing::{debug, error, trace};

use crate::error::{HostError, Result};
use crate::session::HostSession;

/// Counters for one output cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub polls: usize,
    pub go_aheads: usize,
    pub bytes: usize,
}

impl DrainReport {
    /// True if the device had nothing to send.
    pub fn is_idle(&self) -> bool {
        self.go_aheads == 0
    }
}

/// Moves device console output to the host, one lock cycle at a time.
pub struct OutputPump<'a, T, W> {
    session: &'a HostSession<T>,
    console: W,
}

impl<'a, T: Endpoints, W: Write> OutputPump<'a, T, W> {
    pub fn new(session: &'a HostSession<T>, console: W) -> Self {
        Self { session, console }
    }

    /// Poll, and keep draining until a poll reports nothing buffered.
    ///
    /// The whole cycle runs under one transaction lock.
    pub fn poll_once(&mut self) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        let mut txn = self.session.begin();

        let mut total = txn.poll()?;
        report.polls += 1;
        while total > 0 {
            let data = txn.go_ahead(total)?;
            report.go_aheads += 1;
            report.bytes += data.len();

            let rest = txn.divert(&data);
            if !rest.is_empty() {
                self.console.write_all(rest).map_err(HostError::Console)?;
                self.console.flush().map_err(HostError::Console)?;
            }

            total = txn.poll()?;
            report.polls += 1;
        }
        if !report.is_idle() {
            trace!(?report, "drain cycle complete");
        }
        Ok(report)
    }

    /// Cycle until the session shuts down, or until input has closed and a
    /// poll started after that finds nothing with no download pending. Any
    /// error shuts the session down and is returned.
    pub fn run(&mut self) -> Result<()> {
        let backoff = self.session.config().idle_backoff;
        while self.session.wait_for_turn() {
            let closed = self.session.input_closed();
            match self.poll_once() {
                Ok(report) if report.is_idle() => {
                    if closed && !self.session.download_pending() {
                        debug!("output drained after end of input");
                        return Ok(());
                    }
                    self.session.idle(backoff);
                }
                Ok(_) => thread::yield_now(),
                Err(err) => {
                    error!(%err, "output pump stopped");
                    self.session.shutdown();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn into_console(self) -> W {
        self.console
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use dbglink_frame::{header_bytes, Command, CommandHeader};
    use dbglink_transport::Pipe;

    use super::*;
    use crate::sim::{self, Rig};

    fn header(command: Command, len: u32) -> Vec<u8> {
        header_bytes(&CommandHeader::new(command, len)).to_vec()
    }

    #[test]
    fn seventeen_bytes_take_one_go_ahead_and_one_repoll() {
        let rig = Rig::attach(0x0900_0000, 256);
        rig.capture.append(b"U-Boot 2024.01\r\n\n");

        let mut pump = OutputPump::new(&*rig.session, Vec::new());
        let report = pump.poll_once().unwrap();

        assert_eq!(
            report,
            DrainReport {
                polls: 2,
                go_aheads: 1,
                bytes: 17
            }
        );
        assert_eq!(
            rig.log.on(Pipe::Control),
            vec![
                header(Command::DumpBuffer, 0),
                header(Command::DumpBufferGoAhead, 17),
                header(Command::DumpBuffer, 0),
            ]
        );
        assert_eq!(pump.console().as_slice(), b"U-Boot 2024.01\r\n\n");
        rig.stop();
    }

    #[test]
    fn empty_poll_issues_no_go_ahead() {
        let rig = Rig::attach(0x0900_0000, 256);
        let mut pump = OutputPump::new(&*rig.session, Vec::new());

        let report = pump.poll_once().unwrap();
        assert!(report.is_idle());
        assert_eq!(report.polls, 1);
        assert_eq!(rig.log.on(Pipe::Control), vec![header(Command::DumpBuffer, 0)]);
        assert!(rig.log.on(Pipe::Bulk).is_empty());
        rig.stop();
    }

    #[test]
    fn large_output_arrives_intact() {
        let rig = Rig::attach(0x0900_0000, 256);
        let output: Vec<u8> = (0..3000u32).map(|i| b'a' + (i % 26) as u8).collect();
        rig.capture.append(&output);

        let mut pump = OutputPump::new(&*rig.session, Vec::new());
        let report = pump.poll_once().unwrap();
        assert_eq!(report.bytes, 3000);
        assert_eq!(pump.into_console(), output);
        rig.stop();
    }

    #[test]
    fn run_holds_off_while_yield_is_requested() {
        let rig = Rig::attach(0x0900_0000, 256);
        let session = Arc::clone(&rig.session);
        rig.capture.append(b"ready\n");

        let guard = session.request_yield();
        let pump = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                let mut pump = OutputPump::new(&*session, Vec::new());
                pump.run().map(|()| pump.into_console())
            })
        };

        std::thread::sleep(Duration::from_millis(40));
        assert!(rig.log.is_empty(), "pump touched the link during a yield");

        drop(guard);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !rig.capture.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        session.shutdown();

        let console = pump.join().unwrap().unwrap();
        assert_eq!(console, b"ready\n");
        rig.stop();
    }

    #[test]
    fn closed_input_ends_run_once_drained() {
        let rig = Rig::attach(0x0900_0000, 256);
        rig.capture.append(b"bye\n");
        rig.session.close_input();

        let mut pump = OutputPump::new(&*rig.session, Vec::new());
        pump.run().unwrap();

        assert_eq!(pump.console().as_slice(), b"bye\n");
        assert!(rig.capture.is_empty());
        assert!(!rig.session.is_shut_down());
        rig.stop();
    }

    #[test]
    fn closed_input_waits_for_pending_download() {
        let rig = Rig::attach(0x0900_0000, 256);
        let path = sim::temp_path("late-download");
        rig.session
            .begin()
            .arm_redirect(crate::redirect::Redirect::create(&path, 4).unwrap());
        rig.session.close_input();

        let pump = {
            let session = Arc::clone(&rig.session);
            std::thread::spawn(move || {
                let mut pump = OutputPump::new(&*session, Vec::new());
                pump.run().map(|()| pump.into_console())
            })
        };
        std::thread::sleep(Duration::from_millis(30));
        assert!(!pump.is_finished(), "pump stopped with a download pending");

        rig.capture.append(b"data tail");
        let console = pump.join().unwrap().unwrap();
        assert_eq!(console, b" tail");
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
        let _ = std::fs::remove_file(&path);
        rig.stop();
    }

    #[test]
    fn transport_fault_shuts_the_session_down() {
        let (session, device) = sim::detached();
        drop(device);

        let mut pump = OutputPump::new(&session, Vec::new());
        let err = pump.run().unwrap_err();
        assert!(matches!(err, HostError::Frame(_)));
        assert!(err.is_fatal());
        assert!(session.is_shut_down());
    }

    #[test]
    fn console_write_failure_is_fatal() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let rig = Rig::attach(0x0900_0000, 256);
        rig.capture.append(b"lost");
        let mut pump = OutputPump::new(&*rig.session, Closed);

        let err = pump.run().unwrap_err();
        assert!(matches!(err, HostError::Console(_)));
        assert!(rig.session.is_shut_down());
        rig.stop();
    }
}
