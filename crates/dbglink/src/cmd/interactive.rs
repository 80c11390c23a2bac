use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dbglink_host::{History, HostSession, Pumps, ReadLines};
use dbglink_transport::UsbEndpoints;
use tracing::warn;

use crate::cmd::{open_session, DeviceArgs};
use crate::exit::{host_error, io_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};

const HISTORY_FILE: &str = ".dbglink_history";

/// Console session: stdin lines go to the device, device output to stdout.
pub fn run(args: &DeviceArgs, history: Option<PathBuf>) -> CliResult<i32> {
    let session = Arc::new(open_session(args)?);
    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&session), Arc::clone(&interrupted))?;

    let history = history.or_else(default_history).and_then(|path| {
        History::open(&path)
            .map_err(|err| warn!(path = %path.display(), %err, "history disabled"))
            .ok()
    });

    let lines = ReadLines::new(BufReader::new(std::io::stdin()));
    let pumps = Pumps::spawn(session, lines, history, std::io::stdout())
        .map_err(|err| io_error("failed to start pumps", err))?;
    let exit = pumps.wait();

    if interrupted.load(Ordering::SeqCst) {
        return Ok(INTERRUPTED);
    }
    exit.result
        .map(|()| SUCCESS)
        .map_err(|err| host_error(&format!("{} pump failed", exit.pump.as_str()), err))
}

fn default_history() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HISTORY_FILE))
}

fn install_ctrlc_handler(
    session: Arc<HostSession<UsbEndpoints>>,
    interrupted: Arc<AtomicBool>,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        session.shutdown();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
