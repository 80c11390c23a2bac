//! Simulated device attached over the in-memory endpoint pair.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dbglink_device::{
    CommandQueue, Console, Dispatcher, DispatcherConfig, MemoryAccess, OutputCapture, RamWindow,
    RunningDispatcher,
};
use dbglink_frame::LinkConfig;
use dbglink_transport::{pair, MemoryEndpoints, TransferLog};

use crate::config::SessionConfig;
use crate::session::HostSession;

pub(crate) type SimDevice = Dispatcher<MemoryEndpoints, Console<RamWindow>>;

pub(crate) fn config() -> SessionConfig {
    SessionConfig {
        link: LinkConfig {
            timeout: Duration::from_millis(500),
            ..LinkConfig::default()
        },
        idle_backoff: Duration::from_millis(1),
        drain_timeout: Duration::from_millis(500),
        ..SessionConfig::default()
    }
}

/// A session whose device end is handed back raw.
pub(crate) fn detached() -> (HostSession<MemoryEndpoints>, MemoryEndpoints) {
    let (host, device) = pair();
    (HostSession::with_config(host, config()), device)
}

pub(crate) fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "dbglink-host-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

/// Host session wired to a dispatcher thread serving a RAM window.
pub(crate) struct Rig {
    pub session: Arc<HostSession<MemoryEndpoints>>,
    /// Transfers written by the host.
    pub log: TransferLog,
    pub capture: OutputCapture,
    pub queue: CommandQueue,
    device: RunningDispatcher<MemoryEndpoints, Console<RamWindow>>,
}

impl Rig {
    pub fn attach(base: u32, size: usize) -> Self {
        Self::with_ram(RamWindow::new(base, size))
    }

    /// RAM window whose first bytes are `contents`.
    pub fn with_contents(base: u32, contents: &[u8], size: usize) -> Self {
        let mut ram = RamWindow::new(base, size);
        ram.write(base, contents).expect("contents fit the window");
        Self::with_ram(ram)
    }

    fn with_ram(ram: RamWindow) -> Self {
        let (host, device) = pair();
        let log = host.log();
        let capture = OutputCapture::new();
        let queue = CommandQueue::new();
        let dispatcher = Dispatcher::with_config(
            device,
            Console::new(ram, queue.clone()),
            capture.clone(),
            DispatcherConfig {
                link: LinkConfig {
                    timeout: Duration::from_millis(20),
                    ..LinkConfig::default()
                },
                ..DispatcherConfig::default()
            },
        );
        Self {
            session: Arc::new(HostSession::with_config(host, config())),
            log,
            capture,
            queue,
            device: dispatcher.spawn(),
        }
    }

    /// Stop the device thread and hand back its final state.
    pub fn stop(self) -> SimDevice {
        let (device, result) = self.device.stop().expect("dispatcher thread panicked");
        result.expect("dispatcher ended with an error");
        device
    }
}
