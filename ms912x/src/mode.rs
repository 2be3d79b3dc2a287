use std::fmt;
use std::str::FromStr;

use log::debug;
use simple_error::SimpleError;

use crate::device::ControlTransport;
use crate::error::TransportError;
use crate::registers::{self, encode16, RegisterBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Uyvy,
    Rgb,
    Other(u16),
}

impl PixelFormat {
    pub const fn code(self) -> u16 {
        match self {
            PixelFormat::Uyvy => 0x2200,
            PixelFormat::Rgb => 0x1100,
            PixelFormat::Other(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Self {
        match code {
            0x2200 => PixelFormat::Uyvy,
            0x1100 => PixelFormat::Rgb,
            code => PixelFormat::Other(code),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Uyvy => write!(f, "MS912X_PIXFMT_UYVY"),
            PixelFormat::Rgb => write!(f, "MS912X_PIXFMT_RGB"),
            PixelFormat::Other(code) => write!(f, "0x{:04x}", code),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uyvy" => Ok(PixelFormat::Uyvy),
            "rgb" => Ok(PixelFormat::Rgb),
            other => {
                let digits = other.trim_start_matches("0x");
                u16::from_str_radix(digits, 16)
                    .map(PixelFormat::from_code)
                    .map_err(|_| SimpleError::new(format!("unknown pixel format `{}`", s)))
            }
        }
    }
}

/// Everything the chip needs to switch to one output mode.
///
/// `refresh_hz` is only used to pick a preset; the chip derives the refresh
/// rate from `mode_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConfig {
    pub width: u16,
    pub height: u16,
    pub refresh_hz: u16,
    pub mode_code: u16,
    pub pixel_format: PixelFormat,
}

impl ModeConfig {
    pub const fn new(
        width: u16,
        height: u16,
        refresh_hz: u16,
        mode_code: u16,
        pixel_format: PixelFormat,
    ) -> Self {
        Self {
            width,
            height,
            refresh_hz,
            mode_code,
            pixel_format,
        }
    }
}

const fn uyvy(width: u16, height: u16, refresh_hz: u16, mode_code: u16) -> ModeConfig {
    ModeConfig::new(width, height, refresh_hz, mode_code, PixelFormat::Uyvy)
}

pub const MODES: [ModeConfig; 21] = [
    // Seen in USB captures of the vendor driver
    uyvy(800, 600, 60, 0x4200),
    uyvy(1024, 768, 60, 0x4700),
    uyvy(1152, 864, 60, 0x4c00),
    uyvy(1280, 720, 60, 0x4f00),
    uyvy(1280, 800, 60, 0x5700),
    uyvy(1280, 960, 60, 0x5b00),
    uyvy(1280, 1024, 60, 0x6000),
    uyvy(1366, 768, 60, 0x6600),
    uyvy(1400, 1050, 60, 0x6700),
    uyvy(1440, 900, 60, 0x6b00),
    uyvy(1680, 1050, 60, 0x7800),
    uyvy(1920, 1080, 60, 0x8100),
    // Recovered with a mode sweep
    uyvy(720, 480, 60, 0x0200),
    uyvy(720, 576, 60, 0x1100),
    uyvy(640, 480, 60, 0x4000),
    uyvy(1024, 768, 60, 0x4900),
    uyvy(1280, 600, 60, 0x4e00),
    uyvy(1280, 768, 60, 0x5400),
    uyvy(1280, 1024, 60, 0x6100),
    uyvy(1360, 768, 60, 0x6400),
    uyvy(1600, 1200, 60, 0x7300),
];

/// A requested display size, written `<width>x<height>[@<hz>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u16,
    pub height: u16,
    pub refresh_hz: u16,
}

impl FromStr for Resolution {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SimpleError::new(format!("expected <width>x<height>[@<hz>], got `{}`", s));

        let (size, hz) = match s.split_once('@') {
            Some((size, hz)) => (size, Some(hz)),
            None => (s, None),
        };
        let (width, height) = size.split_once(['x', 'X']).ok_or_else(bad)?;

        Ok(Resolution {
            width: width.trim().parse().map_err(|_| bad())?,
            height: height.trim().parse().map_err(|_| bad())?,
            refresh_hz: match hz {
                Some(hz) => hz.trim().parse().map_err(|_| bad())?,
                None => 60,
            },
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.refresh_hz)
    }
}

/// First preset matching the resolution. Some sizes have several mode codes;
/// the one seen in vendor driver captures wins.
pub fn find_mode(resolution: &Resolution) -> Option<ModeConfig> {
    MODES.iter().copied().find(|mode| {
        mode.width == resolution.width
            && mode.height == resolution.height
            && mode.refresh_hz == resolution.refresh_hz
    })
}

pub fn power_on<C: ControlTransport>(bus: &mut RegisterBus<C>) -> Result<(), TransportError> {
    debug!("power on");
    bus.write_six(registers::REG_POWER, [1, 2, 0, 0, 0, 0])
}

/// The chip forgets its mode while off; re-apply it after the next power on.
pub fn power_off<C: ControlTransport>(bus: &mut RegisterBus<C>) -> Result<(), TransportError> {
    debug!("power off");
    bus.write_six(registers::REG_POWER, [0; 6])
}

pub fn read_cable_status<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
) -> Result<u8, TransportError> {
    bus.read_byte(registers::REG_CABLE)
}

pub fn detect_cable_connected<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
) -> Result<bool, TransportError> {
    Ok(read_cable_status(bus)? != 0)
}

/// Programs `cfg` into the chip.
///
/// The order is fixed: the chip only moves on if it sees exactly this
/// sequence, including the status reads whose values are ignored. A failure
/// part way through leaves the chip half configured; power cycle it and
/// start over.
pub fn apply_mode<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
    cfg: ModeConfig,
) -> Result<(), TransportError> {
    debug!(
        "applying mode {}x{} code {:04x} format {:04x}",
        cfg.width,
        cfg.height,
        cfg.mode_code,
        cfg.pixel_format.code()
    );

    bus.write_six(registers::REG_OUTPUT, [0; 6])?;

    bus.read_byte(registers::REG_STATUS_30)?;
    bus.read_byte(registers::REG_STATUS_33)?;
    bus.read_byte(registers::REG_STATUS_C620)?;

    bus.write_six(registers::REG_MODE_SWITCH, [3, 0, 0, 0, 0, 0])?;

    let [w_hi, w_lo] = encode16(cfg.width);
    let [h_hi, h_lo] = encode16(cfg.height);
    let [f_hi, f_lo] = encode16(cfg.pixel_format.code());
    let [m_hi, m_lo] = encode16(cfg.mode_code);

    bus.write_six(registers::REG_RESOLUTION, [w_hi, w_lo, h_hi, h_lo, f_hi, f_lo])?;
    bus.write_six(registers::REG_MODE, [m_hi, m_lo, w_hi, w_lo, h_hi, h_lo])?;

    bus.write_six(registers::REG_OUTPUT, [1, 0, 0, 0, 0, 0])?;
    bus.write_six(registers::REG_COMMIT, [1, 0, 0, 0, 0, 0])?;

    Ok(())
}

/// Power on and program a mode, as when output gets enabled.
pub fn set_mode<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
    cfg: ModeConfig,
) -> Result<(), TransportError> {
    power_on(bus)?;
    apply_mode(bus, cfg)
}
