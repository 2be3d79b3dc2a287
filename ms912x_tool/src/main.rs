use std::error::Error as _;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use simple_error::SimpleError;

use ms912x::{PixelFormat, Resolution};

mod commands;

#[derive(Parser, Debug)]
#[command(version, about = "Register tool for MS912x USB HDMI adapters")]
struct Args {
    /// Timeout of a single control transfer in milliseconds
    #[arg(long, env = "MS912X_TIMEOUT_MS", default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a monitor cable is plugged in
    Detect,

    /// Switch the video output on or off
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },

    /// Power on and program an output mode
    SetMode {
        /// <width>x<height>[@<hz>]
        resolution: Resolution,

        /// Mode code to program instead of the preset for the resolution
        #[arg(long, value_parser = parse_hex_u16)]
        mode_code: Option<u16>,

        #[arg(long, default_value = "uyvy")]
        pixel_format: PixelFormat,
    },

    /// Save all 65536 registers to a raw file
    Dump {
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a `hexdump -C` style listing
        #[arg(long)]
        hexdump: Option<PathBuf>,

        /// Program this mode before dumping
        #[arg(long)]
        mode: Option<Resolution>,
    },

    /// Compare two raw register dumps
    Diff { before: PathBuf, after: PathBuf },

    /// Program every mode code and print the distinct timings
    Sweep {
        /// Pause after each power transition in milliseconds
        #[arg(long, env = "MS912X_SETTLE_MS", default_value_t = 0)]
        settle_ms: u64,

        #[arg(long, default_value = "uyvy")]
        pixel_format: PixelFormat,

        /// Write the table here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read the monitor's EDID
    Edid {
        /// Write the raw EDID here instead of printing hex
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Return the EDID even if header or checksum are wrong
        #[arg(long)]
        no_validate: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PowerState {
    On,
    Off,
}

fn parse_hex_u16(s: &str) -> Result<u16, SimpleError> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16)
        .map_err(|e| SimpleError::new(format!("bad mode code `{}`: {}", s, e)))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout_ms);

    if let Err(err) = commands::run(args.command, timeout) {
        error!("{}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_mode_codes() {
        assert_eq!(parse_hex_u16("0x4200").unwrap(), 0x4200);
        assert_eq!(parse_hex_u16("8100").unwrap(), 0x8100);
        assert!(parse_hex_u16("0x1ffff").is_err());
    }

    #[test]
    fn parses_set_mode() {
        let args = Args::parse_from(["ms912x-tool", "set-mode", "800x600@60", "--mode-code", "0x4200"]);
        match args.command {
            Command::SetMode {
                resolution,
                mode_code,
                pixel_format,
            } => {
                assert_eq!(resolution.width, 800);
                assert_eq!(mode_code, Some(0x4200));
                assert_eq!(pixel_format, PixelFormat::Uyvy);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
