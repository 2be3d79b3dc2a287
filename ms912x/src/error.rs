/// A single control transfer that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("control transfer failed: {0}")]
    Usb(#[from] rusb::Error),

    /// The device accepted or returned fewer bytes than the report size.
    #[error("control transfer truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no device {vendor_id:04x}:{product_id:04x} found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("could not detach kernel driver from interface {interface}: {source}")]
    DriverBinding {
        interface: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("usb error: {0}")]
    Usb(#[from] rusb::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid EDID: {0}")]
    InvalidEdid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
