//! # Serialization Streams
//!
//! One field-traversal description, three behaviors.
//!
//! Every message type writes its serialization once, as a sequence of calls
//! against the object-safe [`Stream`] trait. The trait has exactly three
//! implementations — [`ReadStream`] (decode), [`WriteStream`] (encode) and
//! [`MeasureStream`] (exact bit count, no allocation, no byte emission) —
//! so the three modes are guaranteed to visit identical fields in identical
//! order. That equivalence is the central correctness property of every
//! message type: `Measure` returns exactly the bit length `Write` produces,
//! and `Read` consumes exactly what `Write` produced.
//!
//! ## Usage
//! ```
//! use message_core::core::stream::{Stream, WriteStream, ReadStream, MeasureStream};
//!
//! fn serialize(stream: &mut dyn Stream, sequence: &mut u16) -> message_core::error::Result<()> {
//!     stream.serialize_u16(sequence)
//! }
//!
//! let mut sequence = 42u16;
//! let mut measure = MeasureStream::new();
//! serialize(&mut measure, &mut sequence).unwrap();
//!
//! let mut writer = WriteStream::new();
//! serialize(&mut writer, &mut sequence).unwrap();
//! assert_eq!(writer.bits_processed(), measure.bits_processed());
//!
//! let encoded = writer.finish();
//! let mut decoded = 0u16;
//! let mut reader = ReadStream::new(&encoded);
//! serialize(&mut reader, &mut decoded).unwrap();
//! assert_eq!(decoded, 42);
//! ```

use crate::core::bitio::{BitReader, BitWriter};
use crate::error::{MessageError, Result};
use bytes::Bytes;

/// Which of the three behaviors a stream performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Decode: populate fields from the buffer
    Read,
    /// Encode: emit current field values to the buffer
    Write,
    /// Count the bits encode would emit, touching nothing
    Measure,
}

/// Number of bits needed to encode any value in `[min, max]`.
pub fn bits_required(min: i32, max: i32) -> u32 {
    debug_assert!(min < max, "range must be non-degenerate");
    let span = (max as i64 - min as i64) as u32;
    32 - span.leading_zeros()
}

/// Object-safe serialization stream.
///
/// The primitive operations (`serialize_bits`, `serialize_bytes`,
/// `serialize_align`) are implemented per mode; every combinator below is
/// provided once in terms of the primitives, so no combinator can behave
/// differently between decode, encode and measure.
pub trait Stream {
    fn kind(&self) -> StreamKind;

    /// Process the low `bits` bits of `*value`. Decode overwrites `*value`.
    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> Result<()>;

    /// Process a run of whole bytes, aligning to a byte boundary first.
    fn serialize_bytes(&mut self, bytes: &mut [u8]) -> Result<()>;

    /// Align to the next byte boundary (zero padding, verified on decode).
    fn serialize_align(&mut self) -> Result<()>;

    /// Bits consumed, emitted, or counted so far.
    fn bits_processed(&self) -> u64;

    fn is_reading(&self) -> bool {
        self.kind() == StreamKind::Read
    }

    fn is_writing(&self) -> bool {
        self.kind() == StreamKind::Write
    }

    fn is_measuring(&self) -> bool {
        self.kind() == StreamKind::Measure
    }

    fn serialize_bool(&mut self, value: &mut bool) -> Result<()> {
        let mut bit = u32::from(*value);
        self.serialize_bits(&mut bit, 1)?;
        *value = bit != 0;
        Ok(())
    }

    fn serialize_u8(&mut self, value: &mut u8) -> Result<()> {
        let mut bits = u32::from(*value);
        self.serialize_bits(&mut bits, 8)?;
        *value = bits as u8;
        Ok(())
    }

    fn serialize_u16(&mut self, value: &mut u16) -> Result<()> {
        let mut bits = u32::from(*value);
        self.serialize_bits(&mut bits, 16)?;
        *value = bits as u16;
        Ok(())
    }

    fn serialize_u32(&mut self, value: &mut u32) -> Result<()> {
        self.serialize_bits(value, 32)
    }

    fn serialize_u64(&mut self, value: &mut u64) -> Result<()> {
        let mut low = *value as u32;
        let mut high = (*value >> 32) as u32;
        self.serialize_bits(&mut low, 32)?;
        self.serialize_bits(&mut high, 32)?;
        *value = u64::from(low) | (u64::from(high) << 32);
        Ok(())
    }

    /// Range-compressed signed integer: encodes `value - min` in
    /// `bits_required(min, max)` bits. Decoding a value above `max` is a
    /// recoverable stream error.
    fn serialize_int_range(&mut self, value: &mut i32, min: i32, max: i32) -> Result<()> {
        debug_assert!(min < max, "range must be non-degenerate");
        if !self.is_reading() {
            debug_assert!(
                *value >= min && *value <= max,
                "value outside serialized range"
            );
        }

        let bits = bits_required(min, max);
        let mut offset = (*value as i64 - min as i64) as u32;
        self.serialize_bits(&mut offset, bits)?;

        if self.is_reading() {
            let decoded = min as i64 + i64::from(offset);
            if decoded > max as i64 {
                return Err(MessageError::ValueOutOfRange {
                    value: decoded,
                    min: min as i64,
                    max: max as i64,
                });
            }
            *value = decoded as i32;
        }
        Ok(())
    }
}

/// Decode stream backed by a [`BitReader`].
pub struct ReadStream<'a> {
    reader: BitReader<'a>,
}

impl<'a> ReadStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(data),
        }
    }

    pub fn bits_remaining(&self) -> u64 {
        self.reader.bits_remaining()
    }
}

impl Stream for ReadStream<'_> {
    fn kind(&self) -> StreamKind {
        StreamKind::Read
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> Result<()> {
        *value = self.reader.read_bits(bits)?;
        Ok(())
    }

    fn serialize_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.reader.align()?;
        self.reader.read_bytes(bytes)
    }

    fn serialize_align(&mut self) -> Result<()> {
        self.reader.align()
    }

    fn bits_processed(&self) -> u64 {
        self.reader.bits_read()
    }
}

/// Encode stream backed by a [`BitWriter`].
pub struct WriteStream {
    writer: BitWriter,
}

impl WriteStream {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(),
        }
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(bytes),
        }
    }

    /// Flush and return the encoded buffer.
    pub fn finish(self) -> Bytes {
        self.writer.finish()
    }
}

impl Default for WriteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for WriteStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Write
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> Result<()> {
        self.writer.write_bits(*value, bits);
        Ok(())
    }

    fn serialize_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.writer.align();
        self.writer.write_bytes(bytes);
        Ok(())
    }

    fn serialize_align(&mut self) -> Result<()> {
        self.writer.align();
        Ok(())
    }

    fn bits_processed(&self) -> u64 {
        self.writer.bits_written()
    }
}

/// Bit-counting stream. Mutates no fields, emits no bytes, allocates nothing.
pub struct MeasureStream {
    bits: u64,
}

impl MeasureStream {
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    fn align_cost(&self) -> u64 {
        (8 - self.bits % 8) % 8
    }
}

impl Default for MeasureStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for MeasureStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Measure
    }

    fn serialize_bits(&mut self, _value: &mut u32, bits: u32) -> Result<()> {
        self.bits += u64::from(bits);
        Ok(())
    }

    fn serialize_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.bits += self.align_cost();
        self.bits += bytes.len() as u64 * 8;
        Ok(())
    }

    fn serialize_align(&mut self) -> Result<()> {
        self.bits += self.align_cost();
        Ok(())
    }

    fn bits_processed(&self) -> u64 {
        self.bits
    }
}
