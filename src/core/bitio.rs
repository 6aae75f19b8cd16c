//! # Bit-Level I/O
//!
//! Word-based bit packing primitives used by the serialization streams.
//!
//! Values of 1..=32 bits are packed little-endian-first into a 64-bit scratch
//! word and flushed to the byte buffer as whole bytes become available. Byte
//! runs (block headers, raw payload fields) require byte alignment so they
//! land on natural boundaries.
//!
//! ## Components
//! - **BitWriter**: packs bits into a growable buffer, `finish()` yields `Bytes`
//! - **BitReader**: mirror of the writer; reading past the end is a recoverable error
//!
//! ## Invariants
//! - `bits_read + scratch_bits == 8 * byte_index` holds for the reader at all times
//! - alignment padding is written as zero bits and verified as zero on read

use crate::error::{MessageError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Packs values of 1..=32 bits into a byte buffer.
pub struct BitWriter {
    buffer: BytesMut,
    scratch: u64,
    scratch_bits: u32,
    bits_written: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a writer with a pre-sized buffer (bytes).
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(bytes),
            scratch: 0,
            scratch_bits: 0,
            bits_written: 0,
        }
    }

    /// Write the low `bits` bits of `value`.
    pub fn write_bits(&mut self, value: u32, bits: u32) {
        debug_assert!(bits >= 1 && bits <= 32, "bit width must be in 1..=32");

        let mask = if bits == 32 {
            u64::from(u32::MAX)
        } else {
            (1u64 << bits) - 1
        };

        self.scratch |= (u64::from(value) & mask) << self.scratch_bits;
        self.scratch_bits += bits;
        self.bits_written += u64::from(bits);

        while self.scratch_bits >= 8 {
            self.buffer.put_u8((self.scratch & 0xFF) as u8);
            self.scratch >>= 8;
            self.scratch_bits -= 8;
        }
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) {
        let remainder = (self.bits_written % 8) as u32;
        if remainder != 0 {
            self.write_bits(0, 8 - remainder);
        }
    }

    /// Write a run of whole bytes. Requires byte alignment.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert!(
            self.bits_written % 8 == 0,
            "write_bytes requires byte alignment"
        );
        self.buffer.extend_from_slice(bytes);
        self.bits_written += bytes.len() as u64 * 8;
    }

    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Flush any partial byte and return the encoded buffer.
    pub fn finish(mut self) -> Bytes {
        if self.scratch_bits > 0 {
            self.buffer.put_u8((self.scratch & 0xFF) as u8);
        }
        self.buffer.freeze()
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads values of 1..=32 bits from a byte slice.
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_index: usize,
    scratch: u64,
    scratch_bits: u32,
    bits_read: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_index: 0,
            scratch: 0,
            scratch_bits: 0,
            bits_read: 0,
        }
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    pub fn bits_remaining(&self) -> u64 {
        self.data.len() as u64 * 8 - self.bits_read
    }

    /// Read `bits` bits. Errors if the buffer does not hold that many.
    pub fn read_bits(&mut self, bits: u32) -> Result<u32> {
        debug_assert!(bits >= 1 && bits <= 32, "bit width must be in 1..=32");

        if u64::from(bits) > self.bits_remaining() {
            return Err(MessageError::StreamOverflow {
                wanted: u64::from(bits),
                available: self.bits_remaining(),
            });
        }

        while self.scratch_bits < bits {
            self.scratch |= u64::from(self.data[self.byte_index]) << self.scratch_bits;
            self.byte_index += 1;
            self.scratch_bits += 8;
        }

        let mask = if bits == 32 {
            u64::from(u32::MAX)
        } else {
            (1u64 << bits) - 1
        };

        let value = (self.scratch & mask) as u32;
        self.scratch >>= bits;
        self.scratch_bits -= bits;
        self.bits_read += u64::from(bits);

        Ok(value)
    }

    /// Skip to the next byte boundary, verifying the padding is zero.
    pub fn align(&mut self) -> Result<()> {
        let remainder = (self.bits_read % 8) as u32;
        if remainder != 0 {
            let padding = self.read_bits(8 - remainder)?;
            if padding != 0 {
                return Err(MessageError::ValueOutOfRange {
                    value: i64::from(padding),
                    min: 0,
                    max: 0,
                });
            }
        }
        Ok(())
    }

    /// Read a run of whole bytes into `dest`. Requires byte alignment.
    pub fn read_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        debug_assert!(self.bits_read % 8 == 0, "read_bytes requires byte alignment");

        let wanted = dest.len() as u64 * 8;
        if wanted > self.bits_remaining() {
            return Err(MessageError::StreamOverflow {
                wanted,
                available: self.bits_remaining(),
            });
        }

        dest.copy_from_slice(&self.data[self.byte_index..self.byte_index + dest.len()]);
        self.byte_index += dest.len();
        self.bits_read += wanted;
        Ok(())
    }
}
