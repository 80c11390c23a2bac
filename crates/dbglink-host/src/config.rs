use std::time::Duration;

use dbglink_frame::LinkConfig;

/// Load address used by `sendfile`/`getfile` when a line names none.
pub const DEFAULT_ADDRESS: &str = "0x09000000";

/// Configuration for a host session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chunk size and per-transfer timeout.
    pub link: LinkConfig,
    /// Address substituted when an upload/download line has no `@addr`.
    pub default_address: String,
    /// How many unexpected headers a transaction discards before giving up
    /// with a desync error.
    pub max_stray_headers: usize,
    /// How long the output pump waits after a poll that found nothing.
    pub idle_backoff: Duration,
    /// How long output keeps draining after input ends before the session
    /// is shut down regardless.
    pub drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            default_address: DEFAULT_ADDRESS.to_string(),
            max_stray_headers: 64,
            idle_backoff: Duration::from_millis(5),
            drain_timeout: Duration::from_secs(10),
        }
    }
}
