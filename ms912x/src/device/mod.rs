pub mod hid;

use log::{debug, info};
use rusb::{Device, DeviceDescriptor, DeviceHandle, UsbContext};

use crate::error::{Error, Result};

pub use hid::{ControlTransport, HidControl};

pub const VENDOR_ID: u16 = 0x534d;
pub const PRODUCT_ID: u16 = 0x6021;

/// HID interface carrying the register protocol.
pub const CONTROL_INTERFACE: u8 = 0;
/// Bulk interface used for frame data.
pub const BULK_INTERFACE: u8 = 3;

pub fn open_device<T: UsbContext>(
    context: &mut T,
    vid: u16,
    pid: u16,
) -> Result<Option<(Device<T>, DeviceDescriptor, DeviceHandle<T>)>> {
    let devices = context.devices()?;

    for device in devices.iter() {
        let device_desc = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };

        if device_desc.vendor_id() == vid && device_desc.product_id() == pid {
            let handle = device.open()?;
            return Ok(Some((device, device_desc, handle)));
        }
    }

    Ok(None)
}

/// Opens the chip and frees both interfaces from the kernel.
///
/// usbhid binds to the control interface on plug-in and control transfers
/// fail until it is detached.
pub fn connect<T: UsbContext>(context: &mut T) -> Result<DeviceHandle<T>> {
    match open_device(context, VENDOR_ID, PRODUCT_ID)? {
        Some((device, _, mut handle)) => {
            info!(
                "Opened {:04x}:{:04x} on bus {} address {}",
                VENDOR_ID,
                PRODUCT_ID,
                device.bus_number(),
                device.address()
            );

            for interface in [CONTROL_INTERFACE, BULK_INTERFACE] {
                detach_kernel_driver(&mut handle, interface)?;
            }

            Ok(handle)
        }
        None => Err(Error::DeviceNotFound {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
        }),
    }
}

fn detach_kernel_driver<T: UsbContext>(handle: &mut DeviceHandle<T>, interface: u8) -> Result<()> {
    let binding = |source: rusb::Error| Error::DriverBinding { interface, source };

    match handle.kernel_driver_active(interface) {
        Ok(true) => {
            debug!("detaching kernel driver from interface {}", interface);
            handle.detach_kernel_driver(interface).map_err(binding)
        }
        Ok(false) => Ok(()),
        // Platforms without kernel drivers have nothing to detach.
        Err(rusb::Error::NotSupported) => Ok(()),
        Err(err) => Err(binding(err)),
    }
}
