use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::filter::{DeviceFilter, DeviceInfo};
use crate::traits::{Endpoints, Pipe, BULK_IN, BULK_OUT, INTERRUPT_IN, INTERRUPT_OUT};

const DESCRIPTOR_TIMEOUT: Duration = Duration::from_millis(100);

/// Endpoint pair backed by a claimed libusb interface.
pub struct UsbEndpoints {
    handle: DeviceHandle<Context>,
    info: DeviceInfo,
}

impl UsbEndpoints {
    /// Enumerate attached devices exposing the debug interface.
    pub fn list(filter: &DeviceFilter) -> Result<Vec<DeviceInfo>> {
        let context = Context::new().map_err(enumeration_error)?;
        let devices = context.devices().map_err(enumeration_error)?;

        let mut found = Vec::new();
        for device in devices.iter() {
            if let Some(info) = describe(&device, filter) {
                found.push(info);
            }
        }
        Ok(found)
    }

    /// Open the first matching device and claim its debug interface.
    pub fn open(filter: &DeviceFilter) -> Result<Self> {
        let context = Context::new().map_err(enumeration_error)?;
        let devices = context.devices().map_err(enumeration_error)?;

        for device in devices.iter() {
            let Some(info) = describe(&device, filter) else {
                continue;
            };

            let handle = device.open().map_err(|err| claim_error(&info, err))?;
            if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
                debug!(%err, "kernel driver auto-detach unavailable");
            }
            handle
                .claim_interface(info.interface)
                .map_err(|err| claim_error(&info, err))?;

            info!(
                bus = info.bus,
                address = info.address,
                vendor_id = format_args!("{:04x}", info.vendor_id),
                product_id = format_args!("{:04x}", info.product_id),
                interface = info.interface,
                "claimed debug interface"
            );
            return Ok(Self { handle, info });
        }

        Err(TransportError::NotFound {
            class: filter.class,
            subclass: filter.subclass,
            protocol: filter.protocol,
        })
    }

    /// The device this handle is attached to.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

fn describe<T: UsbContext>(device: &Device<T>, filter: &DeviceFilter) -> Option<DeviceInfo> {
    let descriptor = device.device_descriptor().ok()?;
    if !filter.matches_ids(descriptor.vendor_id(), descriptor.product_id()) {
        return None;
    }

    let interface = (0..descriptor.num_configurations()).find_map(|index| {
        let config = device.config_descriptor(index).ok()?;
        config
            .interfaces()
            .flat_map(|interface| interface.descriptors())
            .find(|alt| {
                filter.matches_interface(
                    alt.class_code(),
                    alt.sub_class_code(),
                    alt.protocol_code(),
                )
            })
            .map(|alt| alt.interface_number())
    })?;

    let product = device.open().ok().and_then(|handle| {
        let language = handle
            .read_languages(DESCRIPTOR_TIMEOUT)
            .ok()?
            .into_iter()
            .next()?;
        handle
            .read_product_string(language, &descriptor, DESCRIPTOR_TIMEOUT)
            .ok()
    });

    Some(DeviceInfo {
        bus: device.bus_number(),
        address: device.address(),
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        interface,
        product,
    })
}

fn enumeration_error(err: rusb::Error) -> TransportError {
    TransportError::Io(std::io::Error::other(err))
}

fn claim_error(info: &DeviceInfo, err: rusb::Error) -> TransportError {
    TransportError::Claim {
        bus: info.bus,
        address: info.address,
        interface: info.interface,
        reason: err.to_string(),
    }
}

fn transfer_error(
    pipe: Pipe,
    timeout: Duration,
    capacity: usize,
    err: rusb::Error,
) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout { pipe, timeout },
        rusb::Error::NoDevice => TransportError::Disconnected { pipe },
        rusb::Error::Overflow => TransportError::Overflow {
            pipe,
            size: capacity + 1,
            capacity,
        },
        source => TransportError::Usb { pipe, source },
    }
}

impl Endpoints for UsbEndpoints {
    fn write_control(&mut self, packet: &[u8], timeout: Duration) -> Result<usize> {
        self.handle
            .write_interrupt(INTERRUPT_OUT, packet, timeout)
            .map_err(|err| transfer_error(Pipe::Control, timeout, packet.len(), err))
    }

    fn read_control(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let capacity = buf.len();
        self.handle
            .read_interrupt(INTERRUPT_IN, buf, timeout)
            .map_err(|err| transfer_error(Pipe::Control, timeout, capacity, err))
    }

    fn write_bulk(&mut self, chunk: &[u8], timeout: Duration) -> Result<usize> {
        self.handle
            .write_bulk(BULK_OUT, chunk, timeout)
            .map_err(|err| transfer_error(Pipe::Bulk, timeout, chunk.len(), err))
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let capacity = buf.len();
        self.handle
            .read_bulk(BULK_IN, buf, timeout)
            .map_err(|err| transfer_error(Pipe::Bulk, timeout, capacity, err))
    }

    fn transport_name(&self) -> &'static str {
        "usb"
    }
}

impl Drop for UsbEndpoints {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.info.interface) {
            warn!(%err, interface = self.info.interface, "failed to release interface");
        }
    }
}

impl std::fmt::Debug for UsbEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbEndpoints").field("info", &self.info).finish()
    }
}
