//! Position records
//!
//! Decodes the concise position record carried in a `RAWDATA` reply into a
//! [`GpsFix`].
//!
//! Record layout (offsets within the record):
//!
//! | offset | type   | field                |
//! |--------|--------|----------------------|
//! | 0      | DOUBLE | latitude (semicircles) |
//! | 8      | DOUBLE | longitude (semicircles) |
//! | 16     | DOUBLE | altitude             |
//! | 24     | DOUBLE | clock offset         |
//! | 32     | DOUBLE | frequency offset     |
//! | 40     | DOUBLE | PDOP                 |
//! | 48     | DOUBLE | latitude rate        |
//! | 56     | DOUBLE | longitude rate       |
//! | 64     | DOUBLE | altitude rate        |
//! | 72     | LONG   | GPS msec of week     |
//! | 76     | CHAR   | position flags       |
//! | 77     | CHAR   | number of SVs        |
//! | 78     | CHAR×2 | per SV: channel, PRN |

use serde::{Deserialize, Serialize};

use crate::protocol::bitfield::FieldReader;
use crate::protocol::{DecodeError, ParsedPacket};

/// Degrees per semicircle
pub const SEMICIRCLE_TO_DEGREES: f64 = 180.0;

/// Size of the record before the satellite list
pub const FIXED_RECORD_LEN: usize = 78;

mod offsets {
    pub const LATITUDE: usize = 0;
    pub const LONGITUDE: usize = 8;
    pub const ALTITUDE: usize = 16;
    pub const CLOCK_OFFSET: usize = 24;
    pub const FREQUENCY_OFFSET: usize = 32;
    pub const PDOP: usize = 40;
    pub const LATITUDE_RATE: usize = 48;
    pub const LONGITUDE_RATE: usize = 56;
    pub const ALTITUDE_RATE: usize = 64;
    pub const GPS_MSEC_OF_WEEK: usize = 72;
    pub const POSITION_FLAGS: usize = 76;
    pub const NUMBER_OF_SVS: usize = 77;
    pub const SATELLITES: usize = 78;
}

/// A tracked satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satellite {
    /// Receiver channel tracking the satellite
    pub channel_number: u8,
    /// Satellite PRN
    pub prn: u8,
}

/// A decoded position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude
    pub altitude: f64,
    /// Receiver clock offset
    pub clock_offset: f64,
    /// Receiver frequency offset
    pub frequency_offset: f64,
    /// Position dilution of precision
    pub pdop: f64,
    /// Latitude rate
    pub latitude_rate: f64,
    /// Longitude rate
    pub longitude_rate: f64,
    /// Altitude rate
    pub altitude_rate: f64,
    /// Milliseconds into the GPS week
    pub gps_msec_of_week: i32,
    /// Position flags
    pub position_flags: u8,
    /// Satellites used, in record order
    pub satellites: Vec<Satellite>,
}

impl GpsFix {
    /// Decode a concise position record.
    ///
    /// Latitude and longitude are converted from semicircles to degrees; all
    /// other fields are returned as transmitted.
    pub fn decode(record: &[u8]) -> Result<Self, DecodeError> {
        let fields = FieldReader::new(record);

        let count = fields.u8_at(offsets::NUMBER_OF_SVS)?;
        let needed = offsets::SATELLITES + usize::from(count) * 2;
        if needed > fields.len() {
            return Err(DecodeError::SatelliteOverrun {
                count,
                available: fields.len().saturating_sub(offsets::SATELLITES),
            });
        }

        let satellites = (0..usize::from(count))
            .map(|i| {
                let at = offsets::SATELLITES + i * 2;
                Ok(Satellite {
                    channel_number: fields.u8_at(at)?,
                    prn: fields.u8_at(at + 1)?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(Self {
            latitude: fields.f64_at(offsets::LATITUDE)? * SEMICIRCLE_TO_DEGREES,
            longitude: fields.f64_at(offsets::LONGITUDE)? * SEMICIRCLE_TO_DEGREES,
            altitude: fields.f64_at(offsets::ALTITUDE)?,
            clock_offset: fields.f64_at(offsets::CLOCK_OFFSET)?,
            frequency_offset: fields.f64_at(offsets::FREQUENCY_OFFSET)?,
            pdop: fields.f64_at(offsets::PDOP)?,
            latitude_rate: fields.f64_at(offsets::LATITUDE_RATE)?,
            longitude_rate: fields.f64_at(offsets::LONGITUDE_RATE)?,
            altitude_rate: fields.f64_at(offsets::ALTITUDE_RATE)?,
            gps_msec_of_week: fields.i32_at(offsets::GPS_MSEC_OF_WEEK)?,
            position_flags: fields.u8_at(offsets::POSITION_FLAGS)?,
            satellites,
        })
    }

    /// Decode the record carried by a validated reply
    pub fn from_packet(packet: &ParsedPacket) -> Result<Self, DecodeError> {
        Self::decode(&packet.data)
    }

    /// Number of satellites used for the fix
    pub fn number_of_svs(&self) -> usize {
        self.satellites.len()
    }
}
