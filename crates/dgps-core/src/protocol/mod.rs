//! Serial Protocol Communication
//!
//! Implements the Trimble data-collector protocol spoken by the BD982 GNSS
//! receiver module over its serial port.
//!
//! Only two exchanges are supported: the `ENQ` liveness handshake and the
//! `GETRAW` (56h) request for a concise position record, answered by a
//! `RAWDATA` (57h) reply.

pub mod bitfield;
pub mod channel;
mod connection;
mod error;
pub mod packet;
pub mod serial;

pub use bitfield::{BitOrderPolicy, BitSequence, FieldWidth};
pub use channel::{Channel, Transport};
pub use connection::{ProbeOutcome, QueryStage, Receiver};
pub use error::{DecodeError, FrameError, QueryError, TransportError};
pub use packet::{checksum, position_request, GetRawRequest, PacketHeader, ParsedPacket};
pub use serial::{list_ports, PortInfo};

/// Start of frame marker
pub const STX: u8 = 0x02;

/// End of frame marker
pub const ETX: u8 = 0x03;

/// Handshake request ("enquiry")
pub const ENQ: u8 = 0x05;

/// Positive handshake reply
pub const ACK: u8 = 0x06;

/// Negative handshake reply, also sent instead of a frame when a request is refused
pub const NAK: u8 = 0x15;

/// Packet type of the raw-data request
pub const GETRAW: u8 = 0x56;

/// Packet type of the raw-data reply
pub const RAWDATA: u8 = 0x57;

/// Record type selecting a position record
pub const POSITION_RECORD: u8 = 0x01;

/// Raw-data format flag selecting the concise record layout
pub const CONCISE_FORMAT: u8 = 0x01;

/// Page counter of a single-page reply (page 1 of 1)
pub const SINGLE_PAGE: u8 = 0x11;

/// Smallest valid position-record reply (no tracked satellites)
pub const MIN_REPLY_LEN: usize = 88;

/// Largest valid position-record reply (12 tracked satellites)
pub const MAX_REPLY_LEN: usize = 112;

/// Size of the receive buffer handed to a single bounded read.
///
/// Larger than [`MAX_REPLY_LEN`] so that a receiver prepending extra bytes to
/// a reply produces a length rejection instead of a silently cut frame.
pub const RECEIVE_BUFFER_SIZE: usize = MAX_REPLY_LEN + 16;

/// Default baud rate of the receiver's serial port
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Documented maximum response latency of the receiver in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
