//! Protocol errors

use thiserror::Error;

/// Link-level failures of the serial channel
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open serial port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Device does not respond (timed out)")]
    Timeout,

    #[error("Device disconnected")]
    Disconnected,

    #[error("Only {written} of {expected} request bytes were transmitted")]
    WriteIncomplete { written: usize, expected: usize },

    #[error("I/O executor unavailable: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection of a reply frame, one variant per validation step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Device does not respond")]
    NoResponse,

    #[error("Response packet is NAK (15h), device cannot fulfill request")]
    DeviceRejected,

    #[error("Received packet has wrong size ({len} bytes)")]
    InvalidLength { len: usize },

    #[error("First byte of received packet is not STX (02h): {found:#04x}")]
    MissingStx { found: u8 },

    #[error("Last byte of received packet is not ETX (03h): {found:#04x}")]
    MissingEtx { found: u8 },

    #[error("Received packet has wrong type: {found:#04x}")]
    WrongPacketType { found: u8 },

    #[error("Received packet has wrong record type: {found:#04x}")]
    WrongRecordType { found: u8 },

    #[error("Received packet has wrong page counter value: {found:#04x}")]
    WrongPageCounter { found: u8 },

    #[error("Declared length {declared} does not fit the {received} received bytes")]
    LengthMismatch { declared: u8, received: usize },

    #[error("Checksum mismatch: computed {computed}, expected {expected}")]
    ChecksumMismatch { computed: u8, expected: u8 },
}

/// Failures while turning validated bytes into numbers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Field at offset {offset} needs {width} bytes but only {available} are present")]
    OutOfBounds {
        offset: usize,
        width: usize,
        available: usize,
    },

    #[error("Expected {expected} bytes for a {expected}-byte field, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("Record lists {count} satellites but only {available} bytes remain")]
    SatelliteOverrun { count: u8, available: usize },
}

/// Any failed position query
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
