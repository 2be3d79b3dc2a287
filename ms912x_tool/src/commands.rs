use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use log::info;
use simple_error::SimpleError;

use ms912x::mode::{self, ModeConfig};
use ms912x::snapshot::{self, RegisterSnapshot};
use ms912x::sweep::{self, SweepSettings};
use ms912x::{edid, PixelFormat, Resolution, UsbRegisterBus};

use crate::{Command, PowerState};

pub fn run(command: Command, timeout: Duration) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Detect => detect(&mut ms912x::open(timeout)?),
        Command::Power { state } => {
            let mut bus = ms912x::open(timeout)?;
            match state {
                PowerState::On => mode::power_on(&mut bus)?,
                PowerState::Off => mode::power_off(&mut bus)?,
            }
            Ok(())
        }
        Command::SetMode {
            resolution,
            mode_code,
            pixel_format,
        } => {
            let cfg = resolve_mode(&resolution, mode_code, pixel_format)?;
            let mut bus = ms912x::open(timeout)?;
            mode::set_mode(&mut bus, cfg)?;
            info!("{} set with mode code {:04x}", resolution, cfg.mode_code);
            Ok(())
        }
        Command::Dump {
            output,
            hexdump,
            mode,
        } => {
            let cfg = match mode {
                Some(resolution) => Some(resolve_mode(&resolution, None, PixelFormat::Uyvy)?),
                None => None,
            };
            let mut bus = ms912x::open(timeout)?;
            dump(&mut bus, cfg, &output, hexdump.as_deref())
        }
        Command::Diff { before, after } => diff(&before, &after),
        Command::Sweep {
            settle_ms,
            pixel_format,
            output,
        } => {
            let settings = SweepSettings {
                pixel_format,
                settle_delay: Duration::from_millis(settle_ms),
                ..Default::default()
            };
            let mut bus = ms912x::open(timeout)?;
            run_sweep(&mut bus, &settings, output.as_deref())
        }
        Command::Edid {
            output,
            no_validate,
        } => {
            let mut bus = ms912x::open(timeout)?;
            let data = edid::read_edid(&mut bus, !no_validate)?;
            match output {
                Some(path) => fs::write(path, &data)?,
                None => println!("{}", hex::encode(&data)),
            }
            Ok(())
        }
    }
}

fn resolve_mode(
    resolution: &Resolution,
    mode_code: Option<u16>,
    pixel_format: PixelFormat,
) -> Result<ModeConfig, SimpleError> {
    if let Some(mode_code) = mode_code {
        return Ok(ModeConfig::new(
            resolution.width,
            resolution.height,
            resolution.refresh_hz,
            mode_code,
            pixel_format,
        ));
    }

    let preset = mode::find_mode(resolution)
        .ok_or_else(|| SimpleError::new(format!("no preset for {}, pass --mode-code", resolution)))?;

    Ok(ModeConfig {
        pixel_format,
        ..preset
    })
}

fn detect(bus: &mut UsbRegisterBus) -> Result<(), Box<dyn Error>> {
    let status = mode::read_cable_status(bus)?;
    let connected = status != 0;
    println!(
        "{} (status {:#04x})",
        if connected { "connected" } else { "disconnected" },
        status
    );
    Ok(())
}

fn dump(
    bus: &mut UsbRegisterBus,
    cfg: Option<ModeConfig>,
    output: &Path,
    hexdump: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if let Some(cfg) = cfg {
        mode::apply_mode(bus, cfg)?;
    }

    info!("dumping registers to {}", output.display());
    let snapshot = snapshot::dump_range(bus, 0..=u16::MAX, |address| {
        if address % 0x1000 == 0 {
            info!("{:04x} / ffff", address);
        }
    })?;

    snapshot.write_to(output)?;
    if let Some(path) = hexdump {
        fs::write(path, snapshot.hexdump())?;
    }

    Ok(())
}

fn diff(before: &Path, after: &Path) -> Result<(), Box<dyn Error>> {
    let a = RegisterSnapshot::load(before)?;
    let b = RegisterSnapshot::load(after)?;

    let changes = a.diff(&b);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for change in &changes {
        writeln!(
            out,
            "{:04x}: {:02x} -> {:02x}",
            change.address, change.before, change.after
        )?;
    }
    info!("{} registers differ", changes.len());

    Ok(())
}

fn run_sweep(
    bus: &mut UsbRegisterBus,
    settings: &SweepSettings,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let table = sweep::sweep(bus, settings, |index| {
        if index % 16 == 0 {
            info!("mode {:02x} / ff", index);
        }
    })?;

    let rows: String = table.iter().map(|entry| format!("{}\n", entry)).collect();

    match output {
        Some(path) => fs::write(path, rows)?,
        None => print!("{}", rows),
    }

    Ok(())
}
