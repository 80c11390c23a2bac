use dbglink_transport::UsbEndpoints;

use crate::cmd::DeviceArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_devices, OutputFormat};

pub fn run(args: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let devices = UsbEndpoints::list(&args.filter())
        .map_err(|err| transport_error("device scan failed", err))?;
    print_devices(&devices, format);
    Ok(SUCCESS)
}
