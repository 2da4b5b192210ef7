//! FreeStyle protocol error types.

use thiserror::Error;

/// Errors that can occur while talking to a FreeStyle device.
#[derive(Error, Debug)]
pub enum FreestyleError {
    /// Command payload cannot be represented in a frame.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error on the underlying packet channel.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Reply frame carried a message type other than the expected reply tag.
    #[error("Message type {actual:#04x} does not match expected {expected:#04x}: {content:02X?}")]
    UnexpectedMessageType { expected: u8, actual: u8, content: Vec<u8> },

    /// Reply text does not follow the expected structure, or the device reported failure.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Computed checksum disagrees with the transmitted one.
    #[error("Invalid checksum: expected {expected:#010X}, calculated {actual:#010X}")]
    InvalidChecksum { expected: u64, actual: u64 },

    /// Strict ASCII decoding met a non-ASCII byte.
    #[error("Non-ASCII byte {byte:#04x} at position {position}")]
    Decoding { position: usize, byte: u8 },

    /// A multi-record line could not be split into fields.
    #[error("Malformed record: {0}")]
    Record(#[from] csv::Error),

    /// Device clock reported a value that is not a valid date/time.
    #[error("Device returned an invalid date/time")]
    InvalidDateTime,

    /// Operation is not available on this device family.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

/// Result type for FreeStyle protocol operations.
pub type Result<T> = std::result::Result<T, FreestyleError>;
