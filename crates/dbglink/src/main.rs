mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{DeviceArgs, Mode};
use crate::exit::{CliError, CliResult, USAGE};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "dbglink",
    version,
    about = "USB debug console and image loader",
    after_help = "Interactive lines: '!file[@addr]' uploads, '~file[@addr]:len' downloads, \
                  anything else is sent to the device console."
)]
struct Cli {
    /// Run the interactive console.
    #[arg(short = 'i', long, conflicts_with_all = ["list", "file"])]
    interactive: bool,

    /// List attached debug interfaces and exit.
    #[arg(long, conflicts_with = "file")]
    list: bool,

    /// Image to upload to --address before sending `go`.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    #[command(flatten)]
    device: DeviceArgs,

    /// History file for interactive mode [default: $HOME/.dbglink_history].
    #[arg(long, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Output format for --list.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    fn mode(&self) -> CliResult<Mode> {
        if self.list {
            return Ok(Mode::List);
        }
        if self.interactive {
            return Ok(Mode::Interactive {
                history: self.history.clone(),
            });
        }
        match &self.file {
            Some(path) => Ok(Mode::Upload { path: path.clone() }),
            None => Err(CliError::new(
                USAGE,
                "nothing to do: pass -i, --list, or a file to upload",
            )),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .mode()
        .and_then(|mode| cmd::run(mode, cli.device, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interactive_flag() {
        let cli = Cli::try_parse_from(["dbglink", "-i", "--history", "/tmp/h"])
            .expect("interactive args should parse");
        assert!(matches!(
            cli.mode().unwrap(),
            Mode::Interactive { history: Some(_) }
        ));
    }

    #[test]
    fn parses_upload_path_with_device_filters() {
        let cli = Cli::try_parse_from([
            "dbglink",
            "u-boot.bin",
            "--vendor-id",
            "0x1d6b",
            "--product-id",
            "0x0104",
            "--address",
            "0x80000000",
        ])
        .expect("upload args should parse");

        assert_eq!(cli.device.vendor_id, Some(0x1d6b));
        assert_eq!(cli.device.product_id, Some(0x0104));
        assert_eq!(cli.device.address, "0x80000000");
        match cli.mode().unwrap() {
            Mode::Upload { path } => assert_eq!(path, PathBuf::from("u-boot.bin")),
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_the_bootloader_layout() {
        let cli = Cli::try_parse_from(["dbglink", "--list"]).expect("list should parse");
        assert!(matches!(cli.mode().unwrap(), Mode::List));
        assert_eq!(cli.device.address, "0x09000000");
        assert_eq!(cli.device.timeout, "1s");
    }

    #[test]
    fn rejects_interactive_with_file() {
        let err = Cli::try_parse_from(["dbglink", "-i", "image.bin"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_bad_vendor_id() {
        let err = Cli::try_parse_from(["dbglink", "--list", "--vendor-id", "usb"])
            .expect_err("bad id should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_mode_is_a_usage_error() {
        let cli = Cli::try_parse_from(["dbglink"]).expect("bare invocation parses");
        assert_eq!(cli.mode().unwrap_err().code, USAGE);
    }
}
