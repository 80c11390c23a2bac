use std::path::Path;

use dbglink_host::{execute, InputAction};
use tracing::info;

use crate::cmd::{open_session, DeviceArgs};
use crate::exit::{host_error, io_error, CliResult, SUCCESS};

/// Load `path` at the configured address and start it with `go`.
pub fn run(args: &DeviceArgs, path: &Path) -> CliResult<i32> {
    std::fs::metadata(path)
        .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))?;

    let session = open_session(args)?;
    execute(
        &session,
        InputAction::Upload {
            path: path.to_path_buf(),
            address: None,
        },
    )
    .map_err(|err| host_error("upload failed", err))?;

    execute(&session, InputAction::Console("go".to_string()))
        .map_err(|err| host_error("go failed", err))?;
    info!(address = %args.address, "image started");
    Ok(SUCCESS)
}
