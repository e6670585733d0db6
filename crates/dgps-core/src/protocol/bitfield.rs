//! Bit-level field decoding
//!
//! The receiver documents its numeric fields in "Motorola format", which does
//! not match the host's layout in either byte order or bit order. Fields are
//! therefore rebuilt bit by bit: the raw bytes are expanded into an explicit
//! bit sequence in line order, reordered according to a [`BitOrderPolicy`],
//! and the result is read most-significant-bit first.
//!
//! Doubles are reconstructed from sign, exponent and fraction by hand instead
//! of being transmuted, so the result does not depend on the host's own
//! floating-point layout.

use super::DecodeError;

/// Exponent bias of an IEEE-754 double
pub const DEFAULT_EXPONENT_BIAS: i32 = 1023;

/// Width of a numeric field on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// 8-bit CHAR
    Byte,
    /// 16-bit SHORT
    Short,
    /// 32-bit LONG
    Long,
    /// 64-bit DOUBLE
    Double,
}

impl FieldWidth {
    /// Number of bytes occupied by the field
    pub const fn bytes(self) -> usize {
        match self {
            FieldWidth::Byte => 1,
            FieldWidth::Short => 2,
            FieldWidth::Long => 4,
            FieldWidth::Double => 8,
        }
    }

    /// Number of bits occupied by the field
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }

    /// Width matching a byte count, if it is one of the supported widths
    pub fn from_bytes(len: usize) -> Option<Self> {
        match len {
            1 => Some(FieldWidth::Byte),
            2 => Some(FieldWidth::Short),
            4 => Some(FieldWidth::Long),
            8 => Some(FieldWidth::Double),
            _ => None,
        }
    }
}

/// How delivered bits are rearranged into host order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitOrderPolicy {
    /// Mirror the bits inside every byte
    pub invert_bits_per_byte: bool,
    /// Take the bytes of the field last to first
    pub invert_byte_order: bool,
}

impl BitOrderPolicy {
    /// Keep the delivered order
    pub const AS_DELIVERED: Self = Self {
        invert_bits_per_byte: false,
        invert_byte_order: false,
    };

    /// Mirror bits per byte only. Reads the bytes as a big-endian value.
    pub const BITS_INVERTED: Self = Self {
        invert_bits_per_byte: true,
        invert_byte_order: false,
    };

    /// Mirror bits per byte and reverse the bytes. Reads the bytes as a
    /// little-endian value.
    pub const FULLY_INVERTED: Self = Self {
        invert_bits_per_byte: true,
        invert_byte_order: true,
    };

    /// Fixed policy of the receiver's wire format for a field width.
    ///
    /// Single bytes only need their bits mirrored; wider fields also have
    /// their byte order reversed.
    pub const fn receiver(width: FieldWidth) -> Self {
        match width {
            FieldWidth::Byte => Self::BITS_INVERTED,
            FieldWidth::Short | FieldWidth::Long | FieldWidth::Double => Self::FULLY_INVERTED,
        }
    }
}

/// An explicit sequence of bits, index 0 first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSequence {
    bits: Vec<bool>,
}

impl BitSequence {
    /// Expand bytes into bits in line order.
    ///
    /// A UART shifts the least significant bit of each byte out first, so bit
    /// `i` of byte `k` lands at index `k * 8 + i`.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|&byte| (0..8).map(move |i| byte & (1 << i) != 0))
            .collect();
        Self { bits }
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True if the sequence holds no bits
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bits, index 0 first
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Rearrange whole bytes and the bits inside them according to `policy`.
    ///
    /// Output bit `k * 8 + i` is taken from source byte `width - 1 - k` when
    /// the byte order is inverted (else `k`), at bit `7 - i` when bits are
    /// inverted (else `i`). Trailing bits that do not form a whole byte are
    /// dropped.
    pub fn reorder(&self, policy: BitOrderPolicy) -> Self {
        let width = self.bits.len() / 8;
        let mut bits = Vec::with_capacity(width * 8);

        for k in 0..width {
            let source_byte = if policy.invert_byte_order {
                width - 1 - k
            } else {
                k
            };
            for i in 0..8 {
                let source_bit = if policy.invert_bits_per_byte { 7 - i } else { i };
                bits.push(self.bits[source_byte * 8 + source_bit]);
            }
        }

        Self { bits }
    }

    /// Read the sequence as an unsigned integer, bit 0 most significant.
    ///
    /// Sequences longer than 64 bits keep only their last 64 bits.
    pub fn to_unsigned(&self) -> u64 {
        self.bits
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit))
    }

    /// Read a 64-bit sequence as an IEEE-754 double with the given exponent bias.
    ///
    /// Bit 0 is the sign, bits 1..12 the exponent and bits 12..64 the fraction.
    /// A zero exponent field encodes zero and subnormals (no implicit leading
    /// one); an all-ones exponent field encodes infinity and NaN.
    pub fn to_ieee754(&self, bias: i32) -> Result<f64, DecodeError> {
        if self.bits.len() != FieldWidth::Double.bits() {
            return Err(DecodeError::WidthMismatch {
                expected: FieldWidth::Double.bytes(),
                actual: self.bits.len() / 8,
            });
        }

        let negative = self.bits[0];
        let exponent = self.bits[1..12]
            .iter()
            .fold(0i32, |acc, &bit| (acc << 1) | i32::from(bit));

        let mut fraction = 0.0f64;
        let mut weight = 0.5f64;
        for &bit in &self.bits[12..] {
            if bit {
                fraction += weight;
            }
            weight *= 0.5;
        }

        let bias = i64::from(bias);
        let magnitude = match exponent {
            0 if fraction == 0.0 => 0.0,
            0 => fraction * pow2(1 - bias),
            0x7ff if fraction == 0.0 => f64::INFINITY,
            0x7ff => f64::NAN,
            _ => (1.0 + fraction) * pow2(i64::from(exponent) - bias),
        };

        Ok(if negative { -magnitude } else { magnitude })
    }
}

/// Exact power of two, also below the smallest normal exponent
fn pow2(exp: i64) -> f64 {
    match exp {
        e if e > 1023 => f64::INFINITY,
        e if e < -1200 => 0.0,
        // powi goes through a reciprocal that overflows below 2^-1022
        e if e < -1022 => 2f64.powi(-1022) * 2f64.powi(e as i32 + 1022),
        e => 2f64.powi(e as i32),
    }
}

fn reordered(
    bytes: &[u8],
    width: FieldWidth,
    policy: BitOrderPolicy,
) -> Result<BitSequence, DecodeError> {
    if bytes.len() != width.bytes() {
        return Err(DecodeError::WidthMismatch {
            expected: width.bytes(),
            actual: bytes.len(),
        });
    }
    Ok(BitSequence::from_wire(bytes).reorder(policy))
}

/// Decode a single byte
pub fn decode_u8(byte: u8, policy: BitOrderPolicy) -> u8 {
    // One byte never exceeds eight bits
    BitSequence::from_wire(&[byte]).reorder(policy).to_unsigned() as u8
}

/// Decode a 2-byte unsigned integer
pub fn decode_u16(bytes: &[u8], policy: BitOrderPolicy) -> Result<u16, DecodeError> {
    Ok(reordered(bytes, FieldWidth::Short, policy)?.to_unsigned() as u16)
}

/// Decode a 4-byte unsigned integer
pub fn decode_u32(bytes: &[u8], policy: BitOrderPolicy) -> Result<u32, DecodeError> {
    Ok(reordered(bytes, FieldWidth::Long, policy)?.to_unsigned() as u32)
}

/// Decode a 4-byte two's complement integer
pub fn decode_i32(bytes: &[u8], policy: BitOrderPolicy) -> Result<i32, DecodeError> {
    decode_u32(bytes, policy).map(|raw| raw as i32)
}

/// Decode an 8-byte IEEE-754 double
pub fn decode_f64(bytes: &[u8], policy: BitOrderPolicy, bias: i32) -> Result<f64, DecodeError> {
    reordered(bytes, FieldWidth::Double, policy)?.to_ieee754(bias)
}

/// Bounds-checked typed reads from a record's data section, using the
/// receiver's fixed per-width policies
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Read from `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of bytes available
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if there is nothing to read
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn field(&self, offset: usize, width: FieldWidth) -> Result<&'a [u8], DecodeError> {
        self.data
            .get(offset..offset + width.bytes())
            .ok_or(DecodeError::OutOfBounds {
                offset,
                width: width.bytes(),
                available: self.data.len(),
            })
    }

    /// CHAR at `offset`
    pub fn u8_at(&self, offset: usize) -> Result<u8, DecodeError> {
        let bytes = self.field(offset, FieldWidth::Byte)?;
        Ok(decode_u8(bytes[0], BitOrderPolicy::receiver(FieldWidth::Byte)))
    }

    /// SHORT at `offset`
    pub fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        decode_u16(
            self.field(offset, FieldWidth::Short)?,
            BitOrderPolicy::receiver(FieldWidth::Short),
        )
    }

    /// LONG at `offset`
    pub fn i32_at(&self, offset: usize) -> Result<i32, DecodeError> {
        decode_i32(
            self.field(offset, FieldWidth::Long)?,
            BitOrderPolicy::receiver(FieldWidth::Long),
        )
    }

    /// DOUBLE at `offset` with the standard exponent bias
    pub fn f64_at(&self, offset: usize) -> Result<f64, DecodeError> {
        self.f64_at_with_bias(offset, DEFAULT_EXPONENT_BIAS)
    }

    /// DOUBLE at `offset` with a field-specific exponent bias
    pub fn f64_at_with_bias(&self, offset: usize, bias: i32) -> Result<f64, DecodeError> {
        decode_f64(
            self.field(offset, FieldWidth::Double)?,
            BitOrderPolicy::receiver(FieldWidth::Double),
            bias,
        )
    }
}
