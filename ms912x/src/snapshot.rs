use std::fmt::Write as _;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use log::info;

use crate::device::ControlTransport;
use crate::error::{Error, Result, TransportError};
use crate::registers::RegisterBus;

pub const REGISTER_SPACE: usize = 0x10000;

/// Register values captured by a linear scan, one byte per address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSnapshot {
    start: u16,
    data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    pub address: u16,
    pub before: u8,
    pub after: u8,
}

impl RegisterSnapshot {
    pub fn new(start: u16, data: impl Into<Bytes>) -> Self {
        Self {
            start,
            data: data.into(),
        }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, address: u16) -> Option<u8> {
        let offset = (address as usize).checked_sub(self.start as usize)?;
        self.data.get(offset).copied()
    }

    fn end(&self) -> usize {
        self.start as usize + self.data.len()
    }

    /// Raw dump, the byte for address `start + n` at file offset `n`.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Reads a raw dump taken from address 0.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        if data.len() > REGISTER_SPACE {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} bytes is larger than the register space", data.len()),
            )));
        }
        Ok(Self::new(0, data))
    }

    /// Addresses present in both snapshots whose values differ.
    pub fn diff(&self, other: &RegisterSnapshot) -> Vec<RegisterChange> {
        let from = self.start.max(other.start) as usize;
        let to = self.end().min(other.end());

        (from..to)
            .filter_map(|address| {
                let address = address as u16;
                let before = self.get(address)?;
                let after = other.get(address)?;
                (before != after).then_some(RegisterChange {
                    address,
                    before,
                    after,
                })
            })
            .collect()
    }

    /// Canonical `hexdump -C` layout, addresses as offsets. Repeated lines
    /// collapse to `*`.
    pub fn hexdump(&self) -> String {
        let mut out = String::with_capacity(self.data.len() * 5);
        let mut previous: Option<&[u8]> = None;
        let mut starred = false;

        for (i, line) in self.data.chunks(16).enumerate() {
            if previous == Some(line) {
                if !starred {
                    out.push_str("*\n");
                    starred = true;
                }
                continue;
            }
            previous = Some(line);
            starred = false;

            let _ = write!(out, "{:08x} ", self.start as usize + i * 16);
            for j in 0..16 {
                if j == 8 {
                    out.push(' ');
                }
                match line.get(j) {
                    Some(b) => {
                        let _ = write!(out, " {:02x}", b);
                    }
                    None => out.push_str("   "),
                }
            }

            out.push_str("  |");
            out.extend(line.iter().map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            }));
            out.push_str("|\n");
        }

        let _ = writeln!(out, "{:08x}", self.end());
        out
    }
}

/// Reads every address in `range`, lowest first. Any failed read aborts the
/// scan.
pub fn dump_range<C, F>(
    bus: &mut RegisterBus<C>,
    range: RangeInclusive<u16>,
    mut progress: F,
) -> std::result::Result<RegisterSnapshot, TransportError>
where
    C: ControlTransport,
    F: FnMut(u16),
{
    let start = *range.start();
    let mut data = BytesMut::with_capacity(range.len());

    for address in range {
        progress(address);
        data.put_u8(bus.read_byte(address)?);
    }

    Ok(RegisterSnapshot::new(start, data.freeze()))
}

/// The whole 64 KiB register space.
pub fn dump<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
) -> std::result::Result<RegisterSnapshot, TransportError> {
    info!("dumping {} registers", REGISTER_SPACE);
    dump_range(bus, 0..=u16::MAX, |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexdump_collapses_repeated_lines() {
        let snapshot = RegisterSnapshot::new(0, vec![0x41; 48]);
        assert_eq!(
            snapshot.hexdump(),
            "00000000  41 41 41 41 41 41 41 41  41 41 41 41 41 41 41 41  |AAAAAAAAAAAAAAAA|\n\
             *\n\
             00000030\n"
        );
    }

    #[test]
    fn hexdump_pads_short_last_line() {
        let snapshot = RegisterSnapshot::new(0x10, vec![0x48, 0x69, 0x00]);
        assert_eq!(
            snapshot.hexdump(),
            "00000010  48 69 00                                          |Hi.|\n\
             00000013\n"
        );
    }

    #[test]
    fn diff_reports_changed_addresses_in_overlap() {
        let a = RegisterSnapshot::new(0, vec![1, 2, 3, 4]);
        let b = RegisterSnapshot::new(2, vec![3, 9, 7]);

        assert_eq!(
            a.diff(&b),
            vec![RegisterChange {
                address: 3,
                before: 4,
                after: 9
            }]
        );
    }

    #[test]
    fn get_outside_snapshot_is_none() {
        let s = RegisterSnapshot::new(0x100, vec![7, 8]);
        assert_eq!(s.get(0xff), None);
        assert_eq!(s.get(0x101), Some(8));
        assert_eq!(s.get(0x102), None);
    }
}
