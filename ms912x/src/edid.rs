//! EDID of the attached monitor, which the chip mirrors into its register
//! space at 0xc000.

use log::{debug, warn};

use crate::device::ControlTransport;
use crate::error::{Error, Result};
use crate::registers::{self, RegisterBus};

pub const EDID_BLOCK_LEN: usize = 128;

const EDID_HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];
const EXTENSION_COUNT: usize = 126;

pub fn read_edid_block<C: ControlTransport>(
    bus: &mut RegisterBus<C>,
    block: u8,
) -> Result<[u8; EDID_BLOCK_LEN]> {
    let base = registers::REG_EDID.wrapping_add(block as u16 * EDID_BLOCK_LEN as u16);
    let mut data = [0u8; EDID_BLOCK_LEN];

    for (i, byte) in data.iter_mut().enumerate() {
        *byte = bus.read_byte(base.wrapping_add(i as u16))?;
    }

    Ok(data)
}

pub fn validate_block(block: u8, data: &[u8; EDID_BLOCK_LEN]) -> Result<()> {
    if block == 0 && data[..8] != EDID_HEADER {
        return Err(Error::InvalidEdid(format!(
            "bad header {:02x?}",
            &data[..8]
        )));
    }

    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(Error::InvalidEdid(format!(
            "block {} checksum off by {:#04x}",
            block, sum
        )));
    }

    Ok(())
}

/// Base block followed by its extension blocks. With `validate` unset, bad
/// blocks are logged and returned anyway.
pub fn read_edid<C: ControlTransport>(bus: &mut RegisterBus<C>, validate: bool) -> Result<Vec<u8>> {
    let base = read_edid_block(bus, 0)?;
    check(0, &base, validate)?;

    // The mirror is 512 bytes: the base block and at most three extensions.
    let extensions = base[EXTENSION_COUNT].min(3);
    debug!("EDID has {} extension blocks", extensions);

    let mut edid = base.to_vec();
    for block in 1..=extensions {
        let data = read_edid_block(bus, block)?;
        check(block, &data, validate)?;
        edid.extend_from_slice(&data);
    }

    Ok(edid)
}

fn check(block: u8, data: &[u8; EDID_BLOCK_LEN], validate: bool) -> Result<()> {
    match validate_block(block, data) {
        Err(err) if !validate => {
            warn!("{}", err);
            Ok(())
        }
        other => other,
    }
}
