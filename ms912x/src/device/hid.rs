use std::time::Duration;

use log::trace;
use rusb::{DeviceHandle, UsbContext};

use crate::error::TransportError;

// USB_DIR_OUT | USB_TYPE_CLASS | USB_RECIP_INTERFACE
pub const REQUEST_TYPE_OUT: u8 = 0x21;
// USB_DIR_IN | USB_TYPE_CLASS | USB_RECIP_INTERFACE
pub const REQUEST_TYPE_IN: u8 = 0xa1;

pub const HID_REQ_GET_REPORT: u8 = 0x01;
pub const HID_REQ_SET_REPORT: u8 = 0x09;

/// Feature report, report id 0.
pub const REPORT_VALUE: u16 = 0x0300;
pub const REPORT_INDEX: u16 = 0;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// The two control transfers the register protocol is built on.
pub trait ControlTransport {
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError>;

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Control transfers on an opened rusb handle.
pub struct HidControl<T: UsbContext> {
    handle: DeviceHandle<T>,
    timeout: Duration,
}

impl<T: UsbContext> HidControl<T> {
    pub fn new(handle: DeviceHandle<T>) -> Self {
        Self::with_timeout(handle, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(handle: DeviceHandle<T>, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    pub fn handle(&self) -> &DeviceHandle<T> {
        &self.handle
    }

    pub fn into_inner(self) -> DeviceHandle<T> {
        self.handle
    }
}

impl<T: UsbContext> ControlTransport for HidControl<T> {
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        trace!("ctrl out {:02x} {:02x?}", request, data);

        let written = self
            .handle
            .write_control(request_type, request, value, index, data, self.timeout)?;

        if written < data.len() {
            return Err(TransportError::Truncated {
                expected: data.len(),
                actual: written,
            });
        }

        Ok(())
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0; usize::from(length)];

        let read = self
            .handle
            .read_control(request_type, request, value, index, &mut buf, self.timeout)?;
        buf.truncate(read);

        trace!("ctrl in {:02x} {:02x?}", request, buf);

        Ok(buf)
    }
}
