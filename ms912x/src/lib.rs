pub mod device;
pub mod edid;
pub mod error;
pub mod mode;
pub mod registers;
pub mod snapshot;
pub mod sweep;

use std::time::Duration;

use rusb::Context;

pub use device::{ControlTransport, HidControl};
pub use error::{Error, Result, TransportError};
pub use mode::{ModeConfig, PixelFormat, Resolution};
pub use registers::RegisterBus;
pub use snapshot::RegisterSnapshot;
pub use sweep::{ModeEntry, ModeTable, SweepSettings, TimingTuple};

pub type UsbRegisterBus = RegisterBus<HidControl<Context>>;

/// Finds the chip, takes it away from the kernel and wraps it in a register
/// bus. The bus is the only handle to the device; drop it to release it.
pub fn open(timeout: Duration) -> Result<UsbRegisterBus> {
    let mut context = Context::new()?;
    let handle = device::connect(&mut context)?;

    Ok(RegisterBus::new(HidControl::with_timeout(handle, timeout)))
}
