//! Error types for the smfxml library

use std::io;

/// Library error type for smfxml operations
#[derive(Debug, thiserror::Error)]
pub enum SmfError {
    /// Parsing error when reading MIDI or XML files
    #[error("parsing error: {0}")]
    ParsingError(String),

    /// Channel message with a status nibble the codec does not handle
    #[error("unsupported MIDI message with status 0x{status:02X} at offset {offset}")]
    UnsupportedMessage { status: u8, offset: usize },

    /// Variable length quantity too large for the writer
    #[error("quantity {0:#X} does not fit in 3 bytes")]
    QuantityOverflow(u32),

    /// Song that cannot be represented in a MIDI file
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<io::Error> for SmfError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}
