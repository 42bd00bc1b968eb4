//! DEFLATE compression.
//!
//! This module implements DEFLATE compression as specified in RFC 1951.
//! Input flows through the LZ77 encoder into a block encoder, which writes
//! stored, fixed or dynamic blocks, whichever is smallest.

use crate::block::{BlockEncoder, write_sync_marker};
use crate::lz77::Lz77Encoder;
use std::mem;
use zflate_core::BitWriter;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::{CompressionLevel, Compressor, FlushMode};

/// Smallest supported window, in bits.
pub const MIN_WINDOW_BITS: u8 = 9;

/// Largest supported window, in bits (32 KiB).
pub const MAX_WINDOW_BITS: u8 = 15;

/// Compressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateOptions {
    /// Compression level.
    pub level: CompressionLevel,
    /// Base-2 logarithm of the largest back-reference distance (9-15).
    pub window_bits: u8,
}

impl DeflateOptions {
    /// Options for `level` with the full 32 KiB window.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            level,
            window_bits: MAX_WINDOW_BITS,
        }
    }

    /// Set the window size.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check that the window size is in range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(ZflateError::InvalidWindowBits {
                bits: self.window_bits,
            });
        }
        Ok(())
    }
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

/// Streaming DEFLATE compressor.
///
/// Every call returns the bytes that became ready. Output produced before
/// [`Compressor::finish`] is a prefix of the final stream; after
/// [`Compressor::flush`] it is also byte-aligned and decodable on its own.
#[derive(Debug)]
pub struct Deflater {
    lz77: Lz77Encoder,
    block: BlockEncoder,
    writer: BitWriter<Vec<u8>>,
    options: DeflateOptions,
    finished: bool,
    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create a compressor for `level` with the default window.
    pub fn new(level: CompressionLevel) -> Self {
        Self::build(DeflateOptions::new(level))
    }

    /// Create a compressor with explicit options.
    pub fn with_options(options: DeflateOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: DeflateOptions) -> Self {
        Self {
            lz77: Lz77Encoder::new(options.level, options.window_bits),
            block: BlockEncoder::new(options.level == CompressionLevel::NONE),
            writer: BitWriter::new(Vec::new()),
            options,
            finished: false,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Options in use.
    pub fn options(&self) -> &DeflateOptions {
        &self.options
    }

    /// Uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes returned so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Compress `input` with the given flush behaviour.
    pub fn compress(&mut self, input: &[u8], flush: FlushMode) -> Result<Vec<u8>> {
        if self.finished {
            return Err(ZflateError::StreamFinished);
        }

        let mut rest = input;
        while !rest.is_empty() {
            let taken = self.lz77.fill(rest);
            rest = &rest[taken..];
            self.tokenize(false)?;
        }
        self.total_in += input.len() as u64;

        match flush {
            FlushMode::None => {}
            FlushMode::Sync => {
                self.tokenize(true)?;
                if !self.block.is_empty() {
                    self.block.write_block(&mut self.writer, false)?;
                }
                write_sync_marker(&mut self.writer)?;
                tracing::trace!(total_in = self.total_in, "sync flush");
            }
            FlushMode::Finish => {
                self.tokenize(true)?;
                self.block.write_block(&mut self.writer, true)?;
                self.writer.flush()?;
                self.finished = true;
            }
        }

        let output = mem::take(self.writer.get_mut());
        self.total_out += output.len() as u64;

        if self.finished {
            tracing::debug!(
                level = self.options.level.level(),
                bytes_in = self.total_in,
                bytes_out = self.total_out,
                "deflate stream finished"
            );
        }
        Ok(output)
    }

    /// Run the matcher, writing out blocks as they fill.
    fn tokenize(&mut self, flush: bool) -> Result<()> {
        while !self.lz77.tokenize(flush, &mut self.block) {
            self.block.write_block(&mut self.writer, false)?;
        }
        Ok(())
    }

    /// Compress data to a vector (convenience method).
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress(data, FlushMode::Finish)
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

impl Compressor for Deflater {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.compress(chunk, FlushMode::None)
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        self.compress(&[], FlushMode::Sync)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.compress(&[], FlushMode::Finish)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn reset(&mut self) {
        self.lz77.reset();
        self.block.clear();
        self.writer = BitWriter::new(Vec::new());
        self.finished = false;
        self.total_in = 0;
        self.total_out = 0;
    }
}

/// Compress data using DEFLATE.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let level = CompressionLevel::try_new(level)?;
    Deflater::new(level).compress_to_vec(data)
}

/// Compress data using DEFLATE with explicit options.
pub fn deflate_with_options(data: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    Deflater::with_options(options)?.compress_to_vec(data)
}
