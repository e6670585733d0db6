//! Packet encoding/decoding
//!
//! Implements the framing of the receiver's data-collector protocol.
//!
//! Packet format:
//! - 1 byte: STX (02h)
//! - 1 byte: status
//! - 1 byte: packet type
//! - 1 byte: length of the data part
//! - N bytes: data part
//! - 1 byte: checksum (sum of status, type, length and data, modulo 256)
//! - 1 byte: ETX (03h)
//!
//! The data part of a `RAWDATA` (57h) reply starts with four header bytes
//! (record type, page counter, reply number, record interpretation flags)
//! followed by the record itself.

use super::{
    FrameError, CONCISE_FORMAT, ETX, GETRAW, MAX_REPLY_LEN, MIN_REPLY_LEN, NAK, POSITION_RECORD,
    RAWDATA, SINGLE_PAGE, STX,
};

/// Size of an encoded `GETRAW` request
pub const REQUEST_LEN: usize = 9;

/// Bytes of the data part that precede the record in a `RAWDATA` reply
const RECORD_HEADER_LEN: usize = 4;

/// Offset of the record inside a reply frame
const RECORD_OFFSET: usize = 8;

/// Modulo-256 sum used as the packet checksum
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Request for raw receiver data (`GETRAW`, 56h)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRawRequest {
    /// Packet status byte
    pub status: u8,
    /// Requested record type
    pub data_type: u8,
    /// Record format flags
    pub flags: u8,
    /// Reserved, always zero
    pub reserved: u8,
}

impl GetRawRequest {
    /// Request a concise position record
    pub const fn position() -> Self {
        Self {
            status: 0x00,
            data_type: POSITION_RECORD,
            flags: CONCISE_FORMAT,
            reserved: 0x00,
        }
    }

    /// Encode the request frame
    pub fn to_bytes(&self) -> [u8; REQUEST_LEN] {
        let length = 0x03;
        let sum = checksum(&[
            self.status,
            GETRAW,
            length,
            self.data_type,
            self.flags,
            self.reserved,
        ]);
        [
            STX,
            self.status,
            GETRAW,
            length,
            self.data_type,
            self.flags,
            self.reserved,
            sum,
            ETX,
        ]
    }
}

impl Default for GetRawRequest {
    fn default() -> Self {
        Self::position()
    }
}

/// Encoded position-record request
pub fn position_request() -> [u8; REQUEST_LEN] {
    GetRawRequest::position().to_bytes()
}

/// Packet header following STX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Receiver status byte
    pub status: u8,
    /// Packet type
    pub packet_type: u8,
    /// Length of the data part, record header included
    pub length: u8,
}

/// A validated `RAWDATA` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    /// Packet header
    pub header: PacketHeader,
    /// Record type
    pub record_type: u8,
    /// Page counter (high nibble: page, low nibble: page count)
    pub page_counter: u8,
    /// Reply number
    pub reply_number: u8,
    /// Record interpretation flags
    pub interpretation_flags: u8,
    /// Record bytes (`length - 4` of them)
    pub data: Vec<u8>,
    /// Checksum as received
    pub checksum: u8,
    /// Trailing byte as received
    pub tail: u8,
}

impl ParsedPacket {
    /// Build a single-page position record around `data`, computing length and checksum.
    ///
    /// Fails with [`FrameError::InvalidLength`] when the data part does not
    /// fit the one-byte length field.
    pub fn position_record(
        reply_number: u8,
        interpretation_flags: u8,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let length = u8::try_from(data.len() + RECORD_HEADER_LEN).map_err(|_| {
            FrameError::InvalidLength {
                len: data.len() + RECORD_OFFSET + 2,
            }
        })?;

        let mut packet = Self {
            header: PacketHeader {
                status: 0x00,
                packet_type: RAWDATA,
                length,
            },
            record_type: POSITION_RECORD,
            page_counter: SINGLE_PAGE,
            reply_number,
            interpretation_flags,
            data,
            checksum: 0,
            tail: ETX,
        };
        packet.checksum = packet.computed_checksum();
        Ok(packet)
    }

    /// Validate a received reply and split it into its fields.
    ///
    /// Checks run in a fixed order and the first failing one decides the
    /// error: empty input, NAK, overall length, STX, ETX, packet type, record
    /// type, page counter, declared length, tail, checksum.
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        // Empty read
        let first = *raw.first().ok_or(FrameError::NoResponse)?;

        // Device refused the request
        if first == NAK {
            return Err(FrameError::DeviceRejected);
        }

        // Validate overall length
        if !(MIN_REPLY_LEN..=MAX_REPLY_LEN).contains(&raw.len()) {
            return Err(FrameError::InvalidLength { len: raw.len() });
        }

        // Framing bytes
        if first != STX {
            return Err(FrameError::MissingStx { found: first });
        }

        let last = raw[raw.len() - 1];
        if last != ETX {
            return Err(FrameError::MissingEtx { found: last });
        }

        // Header fields
        if raw[2] != RAWDATA {
            return Err(FrameError::WrongPacketType { found: raw[2] });
        }

        if raw[4] != POSITION_RECORD {
            return Err(FrameError::WrongRecordType { found: raw[4] });
        }

        if raw[5] != SINGLE_PAGE {
            return Err(FrameError::WrongPageCounter { found: raw[5] });
        }

        // Read declared length
        let length = raw[3];
        let declared = usize::from(length);
        if declared < RECORD_HEADER_LEN || declared + 6 > raw.len() {
            return Err(FrameError::LengthMismatch {
                declared: length,
                received: raw.len(),
            });
        }

        // Recover checksum and tail
        let received_checksum = raw[declared + 4];
        let tail = raw[declared + 5];
        if tail != ETX {
            return Err(FrameError::MissingEtx { found: tail });
        }

        // Verify checksum
        let computed = checksum(&raw[1..declared + 4]);
        if computed != received_checksum {
            return Err(FrameError::ChecksumMismatch {
                computed,
                expected: received_checksum,
            });
        }

        Ok(Self {
            header: PacketHeader {
                status: raw[1],
                packet_type: raw[2],
                length,
            },
            record_type: raw[4],
            page_counter: raw[5],
            reply_number: raw[6],
            interpretation_flags: raw[7],
            data: raw[RECORD_OFFSET..declared + 4].to_vec(),
            checksum: received_checksum,
            tail,
        })
    }

    /// Checksum over the header and data part as currently held
    pub fn computed_checksum(&self) -> u8 {
        checksum(&[
            self.header.status,
            self.header.packet_type,
            self.header.length,
            self.record_type,
            self.page_counter,
            self.reply_number,
            self.interpretation_flags,
        ])
        .wrapping_add(checksum(&self.data))
    }

    /// Encode the packet back into a frame, using the stored checksum and tail
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.extend_from_slice(&[
            STX,
            self.header.status,
            self.header.packet_type,
            self.header.length,
            self.record_type,
            self.page_counter,
            self.reply_number,
            self.interpretation_flags,
        ]);
        bytes.extend_from_slice(&self.data);
        bytes.push(self.checksum);
        bytes.push(self.tail);
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        RECORD_OFFSET + self.data.len() + 2
    }
}
