//! Streaming codec traits.
//!
//! Both sides work on owned byte chunks: every call returns the bytes it
//! produced, and the caller decides how to buffer them. No call suspends
//! internally; each one processes its whole chunk before returning.

use crate::error::{Result, ZflateError};

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Sync flush - end the current block and byte-align the output so
    /// everything fed so far can be decoded.
    Sync,
    /// Finish - emit the final block and complete the stream.
    Finish,
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress a chunk, returning whatever output became ready.
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Emit all pending data as a complete, byte-aligned prefix.
    fn flush(&mut self) -> Result<Vec<u8>>;

    /// Complete the stream and return the remaining output.
    fn finish(&mut self) -> Result<Vec<u8>>;

    /// Whether [`Compressor::finish`] has been called.
    fn is_finished(&self) -> bool;

    /// Reset to the initial state for a new independent stream.
    fn reset(&mut self);

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = self.feed(input)?;
        output.extend_from_slice(&self.finish()?);
        Ok(output)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress a chunk, returning the bytes decoded so far.
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Signal end of input. Fails if the stream is incomplete.
    fn finish(&mut self) -> Result<Vec<u8>>;

    /// Whether the end of the compressed stream has been reached.
    fn is_finished(&self) -> bool;

    /// Reset to the initial state for a new independent stream.
    fn reset(&mut self);

    /// Decompress all data at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = self.feed(input)?;
        output.extend_from_slice(&self.finish()?);
        Ok(output)
    }
}

/// Compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a compression level, rejecting values above 9.
    pub fn try_new(level: u8) -> Result<Self> {
        if level > 9 {
            return Err(ZflateError::InvalidLevel { level });
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = ZflateError;

    fn try_from(level: u8) -> Result<Self> {
        Self::try_new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::FAST.level(), 1);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::BEST.level(), 9);
        assert_eq!(CompressionLevel::try_new(7).unwrap().level(), 7);
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(
            CompressionLevel::try_new(10),
            Err(ZflateError::InvalidLevel { level: 10 })
        ));
        assert!(CompressionLevel::try_from(255).is_err());
    }

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }
}
