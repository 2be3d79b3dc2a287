use log::trace;

use crate::device::hid::{
    ControlTransport, HID_REQ_GET_REPORT, HID_REQ_SET_REPORT, REPORT_INDEX, REPORT_VALUE,
    REQUEST_TYPE_IN, REQUEST_TYPE_OUT,
};
use crate::error::TransportError;

pub const REPORT_LEN: usize = 8;

const CMD_READ: u8 = 0xb5;
const CMD_WRITE: u8 = 0xa6;

// Write registers. Only one address byte fits in a write report.
pub const REG_RESOLUTION: u8 = 0x01;
pub const REG_MODE: u8 = 0x02;
pub const REG_MODE_SWITCH: u8 = 0x03;
pub const REG_OUTPUT: u8 = 0x04;
pub const REG_COMMIT: u8 = 0x05;
pub const REG_POWER: u8 = 0x07;

// Read registers
pub const REG_STATUS_30: u16 = 0x0030;
pub const REG_CABLE: u16 = 0x0032;
pub const REG_STATUS_33: u16 = 0x0033;
pub const REG_EDID: u16 = 0xc000;
pub const REG_STATUS_C620: u16 = 0xc620;

// Computed timing of the active mode, 16-bit values stored low byte first.
pub const REG_HZ: u16 = 0xf182;
pub const REG_HACTIVE: u16 = 0xf384;
pub const REG_VACTIVE: u16 = 0xf388;
pub const REG_HTOTAL: u16 = 0xf398;
pub const REG_VTOTAL: u16 = 0xf39a;
pub const REG_HSYNC: u16 = 0xf39c;
pub const REG_VSYNC: u16 = 0xf39e;
pub const REG_HSYNC_BACK_PORCH: u16 = 0xf3a0;
pub const REG_HTOTAL_FRONT_PORCH: u16 = 0xf3a2;
pub const REG_VSYNC_BACK_PORCH: u16 = 0xf3a4;
pub const REG_VTOTAL_FRONT_PORCH: u16 = 0xf3a6;

/// Big-endian byte pair, the layout of every 16-bit field in a write report.
pub fn encode16(v: u16) -> [u8; 2] {
    [(v >> 8) as u8, (v & 0xff) as u8]
}

pub fn decode16(bytes: [u8; 2]) -> u16 {
    (bytes[0] as u16) << 8 | bytes[1] as u16
}

/// Byte-addressed access to the chip's register space over HID feature
/// reports.
///
/// Reads take a 16-bit address, writes only an 8-bit one and always carry six
/// payload bytes. Every call maps to one or two control transfers and errors
/// are returned as-is; nothing is retried here.
pub struct RegisterBus<C> {
    transport: C,
}

impl<C: ControlTransport> RegisterBus<C> {
    pub fn new(transport: C) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &C {
        &self.transport
    }

    pub fn into_inner(self) -> C {
        self.transport
    }

    pub fn read_byte(&mut self, address: u16) -> Result<u8, TransportError> {
        // idx |  0 | 1 | 2 | 3 | 4..7
        // val | b5 | H | L | x | follow-up bytes
        let mut request = [0u8; REPORT_LEN];
        request[0] = CMD_READ;
        request[1..3].copy_from_slice(&encode16(address));

        self.transport.write_control(
            REQUEST_TYPE_OUT,
            HID_REQ_SET_REPORT,
            REPORT_VALUE,
            REPORT_INDEX,
            &request,
        )?;

        let response = self.transport.read_control(
            REQUEST_TYPE_IN,
            HID_REQ_GET_REPORT,
            REPORT_VALUE,
            REPORT_INDEX,
            REPORT_LEN as u16,
        )?;

        if response.len() < REPORT_LEN {
            return Err(TransportError::Truncated {
                expected: REPORT_LEN,
                actual: response.len(),
            });
        }

        trace!("read {:04x} = {:02x}", address, response[3]);

        Ok(response[3])
    }

    pub fn write_six(&mut self, address: u8, payload: [u8; 6]) -> Result<(), TransportError> {
        let mut request = [0u8; REPORT_LEN];
        request[0] = CMD_WRITE;
        request[1] = address;
        request[2..].copy_from_slice(&payload);

        trace!("write {:02x} = {:02x?}", address, payload);

        self.transport.write_control(
            REQUEST_TYPE_OUT,
            HID_REQ_SET_REPORT,
            REPORT_VALUE,
            REPORT_INDEX,
            &request,
        )
    }

    /// Two consecutive byte reads, low byte at `address`.
    pub fn read16(&mut self, address: u16) -> Result<u16, TransportError> {
        let low = self.read_byte(address)?;
        let high = self.read_byte(address.wrapping_add(1))?;
        Ok(low as u16 + (high as u16) * 256)
    }
}
