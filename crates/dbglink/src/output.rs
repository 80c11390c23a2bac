use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dbglink_transport::DeviceInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DeviceListOutput<'a> {
    count: usize,
    devices: &'a [DeviceInfo],
}

pub fn print_devices(devices: &[DeviceInfo], format: OutputFormat) {
    println!("{}", render_devices(devices, format));
}

fn render_devices(devices: &[DeviceInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let out = DeviceListOutput {
                count: devices.len(),
                devices,
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BUS", "ADDRESS", "ID", "INTERFACE", "PRODUCT"]);
            for device in devices {
                table.add_row(vec![
                    format!("{:03}", device.bus),
                    format!("{:03}", device.address),
                    usb_id(device),
                    device.interface.to_string(),
                    device.product.clone().unwrap_or_default(),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => {
            if devices.is_empty() {
                return "no debug interfaces found".to_string();
            }
            devices
                .iter()
                .map(|device| {
                    format!(
                        "bus={:03} address={:03} id={} interface={} product={}",
                        device.bus,
                        device.address,
                        usb_id(device),
                        device.interface,
                        device.product.as_deref().unwrap_or("-")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn usb_id(device: &DeviceInfo) -> String {
    format!("{:04x}:{:04x}", device.vendor_id, device.product_id)
}
