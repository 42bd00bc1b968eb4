//! Bit-level I/O for DEFLATE streams.
//!
//! [`BitReader`] walks a borrowed byte slice with a copyable [`BitCursor`],
//! so a decoder can checkpoint before a multi-field read and rewind when
//! the input turns out to be incomplete. [`BitWriter`] accumulates bits and
//! writes complete bytes to any `Write` sink.
//!
//! # Bit Ordering
//!
//! DEFLATE packs data LSB-first: the first bit of a field occupies the least
//! significant free bit of the current byte. Huffman codes are the exception
//! (they are sent most significant bit first), which callers handle by
//! bit-reversing codes before writing them.
//!
//! # Example
//!
//! ```
//! use zflate_core::bitstream::{BitReader, BitWriter};
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output);
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.write_bits(0b1100, 4).unwrap();
//!     writer.flush().unwrap();
//! }
//!
//! let mut reader = BitReader::new(&output);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(4).unwrap(), 0b1100);
//! ```

use crate::error::{Result, ZflateError};
use std::io::Write;

/// Position within a byte buffer: byte index plus bit offset (0-7).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BitCursor {
    byte: usize,
    bit: u8,
}

impl BitCursor {
    /// Create a cursor at the given byte index and bit offset.
    pub const fn new(byte: usize, bit: u8) -> Self {
        debug_assert!(bit < 8);
        Self { byte, bit }
    }

    /// Byte index.
    pub fn byte(&self) -> usize {
        self.byte
    }

    /// Bit offset within the current byte.
    pub fn bit(&self) -> u8 {
        self.bit
    }

    /// Absolute bit position.
    pub fn bit_position(&self) -> u64 {
        self.byte as u64 * 8 + self.bit as u64
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit == 0
    }

    /// Cursor moved forward by `bits`.
    #[inline]
    pub fn advance(self, bits: usize) -> Self {
        let total = self.bit as usize + bits;
        Self {
            byte: self.byte + total / 8,
            bit: (total % 8) as u8,
        }
    }

    /// Cursor rounded up to the next byte boundary.
    pub fn aligned(self) -> Self {
        if self.bit == 0 {
            self
        } else {
            Self {
                byte: self.byte + 1,
                bit: 0,
            }
        }
    }

    /// Cursor shifted back by `bytes` after the buffer front was discarded.
    pub fn rebase(self, bytes: usize) -> Self {
        debug_assert!(bytes <= self.byte);
        Self {
            byte: self.byte - bytes,
            bit: self.bit,
        }
    }
}

/// A bit-level reader over a byte slice.
///
/// Reads never consume anything on failure: when fewer bits remain than
/// requested, the cursor is left untouched and
/// [`ZflateError::InputTooShort`] is returned.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Underlying data.
    data: &'a [u8],
    /// Current read position.
    cursor: BitCursor,
    /// Bits that preceded `data` in the logical stream (for error reporting).
    origin: u64,
}

impl<'a> BitReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_cursor(data, BitCursor::default(), 0)
    }

    /// Create a reader resuming at `cursor`, where `origin` counts the bits
    /// of the logical stream that precede `data`.
    pub fn with_cursor(data: &'a [u8], cursor: BitCursor, origin: u64) -> Self {
        debug_assert!(cursor.byte <= data.len());
        Self {
            data,
            cursor,
            origin,
        }
    }

    /// Current cursor.
    pub fn cursor(&self) -> BitCursor {
        self.cursor
    }

    /// Rewind (or advance) to a previously saved cursor.
    pub fn set_cursor(&mut self, cursor: BitCursor) {
        debug_assert!(cursor.byte <= self.data.len());
        self.cursor = cursor;
    }

    /// Absolute bit position in the logical stream (for error reporting).
    pub fn bit_position(&self) -> u64 {
        self.origin + self.cursor.bit_position()
    }

    /// Number of unread bits.
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() - self.cursor.byte) * 8 - self.cursor.bit as usize
    }

    /// Gather up to `count` bits without consuming them.
    ///
    /// Returns the bits (first bit in the LSB) and how many were actually
    /// available; missing high bits read as zero.
    #[inline]
    pub fn peek_bits(&self, count: u8) -> (u32, u8) {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");

        let available = self.bits_remaining().min(count as usize) as u8;
        let mut value = 0u64;
        let mut got = 0u8;
        let mut index = self.cursor.byte;
        let mut shift = self.cursor.bit;

        while got < available {
            let byte = (self.data[index] >> shift) as u64;
            let take = (8 - shift).min(available - got);
            value |= (byte & ((1u64 << take) - 1)) << got;
            got += take;
            shift = 0;
            index += 1;
        }

        (value as u32, available)
    }

    /// Read up to 32 bits, first bit in the LSB position.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        if count == 0 {
            return Ok(0);
        }

        let (value, available) = self.peek_bits(count);
        if available < count {
            return Err(ZflateError::input_too_short(
                self.bit_position(),
                (count - available) as usize,
            ));
        }

        self.cursor = self.cursor.advance(count as usize);
        Ok(value)
    }

    /// Skip `count` bits.
    pub fn skip_bits(&mut self, count: usize) -> Result<()> {
        let remaining = self.bits_remaining();
        if remaining < count {
            return Err(ZflateError::input_too_short(
                self.bit_position(),
                count - remaining,
            ));
        }
        self.cursor = self.cursor.advance(count);
        Ok(())
    }

    /// Discard the partial bits of the current byte.
    pub fn align_to_byte(&mut self) {
        self.cursor = self.cursor.aligned();
    }

    /// Read exactly `len` bytes. The reader must be byte-aligned.
    pub fn read_aligned_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        debug_assert!(self.cursor.is_aligned(), "Reader must be byte-aligned");

        let start = self.cursor.byte;
        let available = self.data.len() - start;
        if available < len {
            return Err(ZflateError::input_too_short(
                self.bit_position(),
                (len - available) * 8,
            ));
        }
        self.cursor = BitCursor::new(start + len, 0);
        Ok(&self.data[start..start + len])
    }

    /// Read at most `max` bytes, as many as are available. The reader must
    /// be byte-aligned.
    pub fn take_aligned_bytes(&mut self, max: usize) -> &'a [u8] {
        debug_assert!(self.cursor.is_aligned(), "Reader must be byte-aligned");

        let start = self.cursor.byte;
        let len = max.min(self.data.len() - start);
        self.cursor = BitCursor::new(start + len, 0);
        &self.data[start..start + len]
    }
}

/// A bit-level writer that wraps any `Write` implementation.
///
/// `BitWriter` accumulates bits in an internal buffer and writes complete
/// bytes to the underlying writer as soon as they fill up. Call
/// [`BitWriter::flush`] when done to pad and write the last partial byte;
/// dropping the writer discards pending bits.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of bits in buffer.
    bits_in_buffer: u8,
    /// Total bits written.
    total_bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    ///
    /// Bits still pending in the buffer have not reached it yet.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Flush remaining bits and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Bits buffered but not yet handed to the writer (always < 8 between
    /// calls).
    pub fn pending_bits(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Write complete bytes from the buffer to the writer.
    #[inline]
    fn flush_bytes(&mut self) -> Result<()> {
        if self.bits_in_buffer >= 32 {
            let bytes = (self.buffer as u32).to_le_bytes();
            self.writer.write_all(&bytes)?;
            self.buffer >>= 32;
            self.bits_in_buffer -= 32;
        }

        while self.bits_in_buffer >= 8 {
            self.writer.write_all(&[self.buffer as u8])?;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
        Ok(())
    }

    /// Write up to 32 bits, LSB-first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return Ok(());
        }

        let mask = if count == 32 {
            u32::MAX
        } else {
            (1u32 << count) - 1
        };

        self.buffer |= ((value & mask) as u64) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += count as u64;

        self.flush_bytes()
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Pad to the next byte boundary with zero bits.
    pub fn align_to_byte(&mut self) -> Result<()> {
        if self.bits_in_buffer % 8 != 0 {
            let padding = 8 - (self.bits_in_buffer % 8);
            self.write_bits(0, padding)?;
        }
        Ok(())
    }

    /// Pad the final partial byte and flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.align_to_byte()?;
        self.flush_bytes()?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write raw bytes. Pads to a byte boundary first.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.align_to_byte()?;
        self.flush_bytes()?;
        self.writer.write_all(buf)?;
        self.total_bits_written += buf.len() as u64 * 8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitreader_basic() {
        // 0b10110101 = 0xB5
        let data = [0xB5];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(1).unwrap(), 1); // LSB first
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn test_bitreader_multi_byte() {
        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(4).unwrap(), 0xF);
        assert_eq!(reader.read_bits(8).unwrap(), 0x0F); // Crosses byte boundary
        assert_eq!(reader.read_bits(4).unwrap(), 0x0);
    }

    #[test]
    fn test_bitreader_peek() {
        let data = [0xAB];
        let reader = BitReader::new(&data);

        assert_eq!(reader.peek_bits(4), (0xB, 4));
        assert_eq!(reader.peek_bits(4), (0xB, 4));
        // Only 8 bits exist; the rest read as zero.
        assert_eq!(reader.peek_bits(12), (0xAB, 8));
    }

    #[test]
    fn test_short_read_leaves_cursor() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        reader.read_bits(5).unwrap();

        let before = reader.cursor();
        let err = reader.read_bits(4).unwrap_err();
        assert!(matches!(err, ZflateError::InputTooShort { needed: 1, .. }));
        assert_eq!(reader.cursor(), before);
        assert_eq!(reader.read_bits(3).unwrap(), 0b111);
    }

    #[test]
    fn test_checkpoint_rewind() {
        let data = [0x12, 0x34];
        let mut reader = BitReader::new(&data);
        let checkpoint = reader.cursor();
        assert_eq!(reader.read_bits(16).unwrap(), 0x3412);
        reader.set_cursor(checkpoint);
        assert_eq!(reader.read_bits(8).unwrap(), 0x12);
    }

    #[test]
    fn test_bitwriter_basic() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            for bit in [true, false, true, false, true, true, false, true] {
                writer.write_bit(bit).unwrap();
            }
            writer.flush().unwrap();
        }
        assert_eq!(output, vec![0xB5]);
    }

    #[test]
    fn test_bitwriter_multi_bits() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            writer.write_bits(0b101, 3).unwrap();
            writer.write_bits(0b11001, 5).unwrap();
            writer.flush().unwrap();
        }
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(output, vec![0xCD]);
    }

    #[test]
    fn test_pending_bits_stay_buffered() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0x3FF, 10).unwrap();
        assert_eq!(writer.get_ref().as_slice(), &[0xFF]);
        assert_eq!(writer.pending_bits(), 2);
        let output = writer.into_inner().unwrap();
        assert_eq!(output, vec![0xFF, 0x03]);
    }

    #[test]
    fn test_roundtrip() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b1111, 4).unwrap();
        writer.write_bits(0b10, 2).unwrap();
        writer.write_bits(0xDEADBEEF, 32).unwrap();
        writer.write_bits(0b110011, 6).unwrap();
        let output = writer.into_inner().unwrap();

        let mut reader = BitReader::new(&output);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1111);
        assert_eq!(reader.read_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_bits(6).unwrap(), 0b110011);
    }

    #[test]
    fn test_align_to_byte() {
        let data = [0xFF, 0xAA];
        let mut reader = BitReader::new(&data);

        reader.read_bits(3).unwrap();
        reader.align_to_byte();
        assert_eq!(reader.read_bits(8).unwrap(), 0xAA);
    }

    #[test]
    fn test_aligned_bytes() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_aligned_bytes(2).unwrap(), &[0x12, 0x34]);
        assert!(reader.read_aligned_bytes(3).is_err());
        assert_eq!(reader.take_aligned_bytes(10), &[0x56, 0x78]);
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn test_cursor_arithmetic() {
        let cursor = BitCursor::new(2, 5).advance(11);
        assert_eq!(cursor, BitCursor::new(4, 0));
        assert_eq!(BitCursor::new(3, 1).aligned(), BitCursor::new(4, 0));
        assert_eq!(BitCursor::new(3, 0).aligned(), BitCursor::new(3, 0));
        assert_eq!(BitCursor::new(7, 2).rebase(5), BitCursor::new(2, 2));
        assert_eq!(BitCursor::new(1, 3).bit_position(), 11);
    }

    #[test]
    fn test_origin_offsets_error_position() {
        let data = [0x00];
        let mut reader = BitReader::with_cursor(&data, BitCursor::new(1, 0), 800);
        match reader.read_bits(1) {
            Err(ZflateError::InputTooShort { bit_position, .. }) => {
                assert_eq!(bit_position, 808)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
