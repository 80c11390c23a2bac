use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use dbglink_frame::LinkConfig;
use dbglink_host::{HostSession, SessionConfig};
use dbglink_transport::{DeviceFilter, UsbEndpoints};
use tracing::info;

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod interactive;
pub mod list;
pub mod upload;

/// What the invocation asks for.
#[derive(Debug)]
pub enum Mode {
    List,
    Interactive { history: Option<PathBuf> },
    Upload { path: PathBuf },
}

pub fn run(mode: Mode, device: DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match mode {
        Mode::List => list::run(&device, format),
        Mode::Interactive { history } => interactive::run(&device, history),
        Mode::Upload { path } => upload::run(&device, &path),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Only match this USB vendor id (hex with 0x, or decimal).
    #[arg(long, value_name = "ID", value_parser = parse_id)]
    pub vendor_id: Option<u16>,
    /// Only match this USB product id (hex with 0x, or decimal).
    #[arg(long, value_name = "ID", value_parser = parse_id)]
    pub product_id: Option<u16>,
    /// Per-transfer timeout (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Load address used by uploads and downloads that name none.
    #[arg(long, value_name = "ADDR", default_value = dbglink_host::DEFAULT_ADDRESS)]
    pub address: String,
}

impl DeviceArgs {
    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            ..DeviceFilter::default()
        }
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig {
            link: LinkConfig {
                timeout: parse_duration(&self.timeout)?,
                ..LinkConfig::default()
            },
            default_address: self.address.clone(),
            ..SessionConfig::default()
        })
    }
}

/// Find and claim the debug interface, then wrap it in a session.
pub fn open_session(args: &DeviceArgs) -> CliResult<HostSession<UsbEndpoints>> {
    let config = args.session_config()?;
    let endpoints = UsbEndpoints::open(&args.filter())
        .map_err(|err| transport_error("device open failed", err))?;
    let device = endpoints.info();
    info!(
        bus = device.bus,
        address = device.address,
        id = format_args!("{:04x}:{:04x}", device.vendor_id, device.product_id),
        interface = device.interface,
        "debug interface claimed"
    );
    Ok(HostSession::with_config(endpoints, config))
}

pub fn parse_id(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid USB id: {input}"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
