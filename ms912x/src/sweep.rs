//! Recovers the chip's built-in timing presets.
//!
//! Each of the 256 mode codes `index << 8` is programmed on a freshly power
//! cycled chip and the timing the chip computed for it is read back. Runs of
//! identical timings are collapsed to their first mode code.

use std::fmt;
use std::thread;
use std::time::Duration;

use itertools::Itertools;
use log::{debug, info};

use crate::device::ControlTransport;
use crate::error::TransportError;
use crate::mode::{self, ModeConfig, PixelFormat};
use crate::registers::{self, RegisterBus};

/// Horizontal and vertical timing of one mode, as computed by the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimingTuple {
    pub hactive: u16,
    pub vactive: u16,
    pub hz: u16,
    pub htotal: u16,
    pub vtotal: u16,
    pub hsync: u16,
    pub vsync: u16,
    pub hsync_back_porch: u16,
    pub htotal_minus_front_porch: u16,
    pub vsync_back_porch: u16,
    pub vtotal_minus_front_porch: u16,
}

impl TimingTuple {
    pub fn read<C: ControlTransport>(bus: &mut RegisterBus<C>) -> Result<Self, TransportError> {
        Ok(Self {
            hactive: bus.read16(registers::REG_HACTIVE)?,
            vactive: bus.read16(registers::REG_VACTIVE)?,
            hz: bus.read_byte(registers::REG_HZ)? as u16,
            htotal: bus.read16(registers::REG_HTOTAL)?,
            vtotal: bus.read16(registers::REG_VTOTAL)?,
            hsync: bus.read16(registers::REG_HSYNC)?,
            vsync: bus.read16(registers::REG_VSYNC)?,
            hsync_back_porch: bus.read16(registers::REG_HSYNC_BACK_PORCH)?,
            htotal_minus_front_porch: bus.read16(registers::REG_HTOTAL_FRONT_PORCH)?,
            vsync_back_porch: bus.read16(registers::REG_VSYNC_BACK_PORCH)?,
            vtotal_minus_front_porch: bus.read16(registers::REG_VTOTAL_FRONT_PORCH)?,
        })
    }

    pub fn as_array(&self) -> [u16; 11] {
        [
            self.hactive,
            self.vactive,
            self.hz,
            self.htotal,
            self.vtotal,
            self.hsync,
            self.vsync,
            self.hsync_back_porch,
            self.htotal_minus_front_porch,
            self.vsync_back_porch,
            self.vtotal_minus_front_porch,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEntry {
    pub mode_index: u8,
    pub pixel_format: PixelFormat,
    pub timing: TimingTuple,
}

impl ModeEntry {
    pub fn mode_code(&self) -> u16 {
        (self.mode_index as u16) << 8
    }
}

impl fmt::Display for ModeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MS912X_MODE({:4}, {:4}, {:2}, 0x{:04x}, {}),",
            self.timing.hactive,
            self.timing.vactive,
            self.timing.hz,
            self.mode_code(),
            self.pixel_format
        )
    }
}

/// Sweep results, no two neighbours with the same timing.
pub type ModeTable = Vec<ModeEntry>;

#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Placeholder size written with every mode code. The readback does not
    /// depend on it.
    pub probe_width: u16,
    pub probe_height: u16,
    pub refresh_hz: u16,
    pub pixel_format: PixelFormat,
    /// Pause after each power transition. Nothing documents how long the chip
    /// needs; raise this if results look inconsistent between runs.
    pub settle_delay: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            probe_width: 1000,
            probe_height: 1000,
            refresh_hz: 60,
            pixel_format: PixelFormat::Uyvy,
            settle_delay: Duration::ZERO,
        }
    }
}

impl SweepSettings {
    fn probe(&self, mode_index: u8) -> ModeConfig {
        ModeConfig::new(
            self.probe_width,
            self.probe_height,
            self.refresh_hz,
            (mode_index as u16) << 8,
            self.pixel_format,
        )
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
    }
}

/// Keeps the first entry of every run of equal timings.
pub fn dedup_consecutive(entries: Vec<ModeEntry>) -> ModeTable {
    entries
        .into_iter()
        .dedup_by(|a, b| a.timing == b.timing)
        .collect()
}

/// Runs the full sweep. `progress` sees each mode index before it is
/// programmed.
///
/// The first failed transfer aborts the sweep: the chip state is unknown from
/// then on, so no partial table is returned.
pub fn sweep<C, F>(
    bus: &mut RegisterBus<C>,
    settings: &SweepSettings,
    mut progress: F,
) -> Result<ModeTable, TransportError>
where
    C: ControlTransport,
    F: FnMut(u8),
{
    info!("sweeping 256 mode codes");

    let mut entries = Vec::with_capacity(256);

    for mode_index in 0..=u8::MAX {
        progress(mode_index);

        mode::power_off(bus)?;
        settings.settle();
        mode::power_on(bus)?;
        settings.settle();

        mode::apply_mode(bus, settings.probe(mode_index))?;

        let timing = TimingTuple::read(bus)?;
        debug!("mode {:02x}: {:?}", mode_index, timing.as_array());

        entries.push(ModeEntry {
            mode_index,
            pixel_format: settings.pixel_format,
            timing,
        });
    }

    let table = dedup_consecutive(entries);
    info!("sweep found {} distinct timings", table.len());

    Ok(table)
}
