//! Error types for zflate operations.
//!
//! Decoding failures are split by cause so callers can tell a truncated
//! stream from a corrupted one, and both from a failed integrity check.
//! Compression only fails on programmer errors such as an out-of-range level.

use std::io;
use thiserror::Error;

/// The main error type for zflate operations.
#[derive(Debug, Error)]
pub enum ZflateError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended while more bits were expected.
    #[error("Input too short: needed {needed} more bits at bit position {bit_position}")]
    InputTooShort {
        /// Bit position where reading stopped.
        bit_position: u64,
        /// Number of bits that were requested but not available.
        needed: usize,
    },

    /// Block header carries the reserved block type `11`.
    #[error("Malformed block type {block_type} at bit position {bit_position}")]
    MalformedBlockType {
        /// The offending block type.
        block_type: u8,
        /// Bit position of the block header.
        bit_position: u64,
    },

    /// A bit sequence matched no assigned Huffman code.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// A back-reference points before the start of the available history.
    #[error("Back-reference distance {distance} exceeds history size {available}")]
    DistanceTooFar {
        /// The invalid distance value.
        distance: usize,
        /// Number of bytes available in the window.
        available: usize,
    },

    /// Post-decode integrity check failed.
    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the stream.
        expected: u32,
        /// Checksum computed over the decoded data.
        computed: u32,
    },

    /// Decoded output would exceed the caller-supplied cap.
    #[error("Output limit of {limit} bytes exceeded")]
    OutputLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Structurally invalid DEFLATE data.
    #[error("Malformed stream at bit position {bit_position}: {message}")]
    MalformedStream {
        /// Bit position where the problem was detected.
        bit_position: u64,
        /// Description of the problem.
        message: String,
    },

    /// Invalid zlib container header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Compression level outside 0-9.
    #[error("Invalid compression level {level}: expected 0-9")]
    InvalidLevel {
        /// The rejected level.
        level: u8,
    },

    /// Window size outside the supported range.
    #[error("Invalid window bits {bits}: expected 9-15")]
    InvalidWindowBits {
        /// The rejected log2 window size.
        bits: u8,
    },

    /// Data was fed to a stream that has already been finished.
    #[error("Stream already finished")]
    StreamFinished,
}

/// Result type alias for zflate operations.
pub type Result<T> = std::result::Result<T, ZflateError>;

impl ZflateError {
    /// Create an input-too-short error.
    pub fn input_too_short(bit_position: u64, needed: usize) -> Self {
        Self::InputTooShort {
            bit_position,
            needed,
        }
    }

    /// Create a malformed block type error.
    pub fn malformed_block_type(block_type: u8, bit_position: u64) -> Self {
        Self::MalformedBlockType {
            block_type,
            bit_position,
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a distance-too-far error.
    pub fn distance_too_far(distance: usize, available: usize) -> Self {
        Self::DistanceTooFar {
            distance,
            available,
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create an output-limit error.
    pub fn output_limit(limit: usize) -> Self {
        Self::OutputLimitExceeded { limit }
    }

    /// Create a malformed stream error.
    pub fn malformed(bit_position: u64, message: impl Into<String>) -> Self {
        Self::MalformedStream {
            bit_position,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// True if the stream simply ran out of input.
    pub fn is_input_too_short(&self) -> bool {
        matches!(self, Self::InputTooShort { .. })
    }

    /// True for errors caused by corrupted or hostile compressed data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::MalformedBlockType { .. }
                | Self::InvalidHuffmanCode { .. }
                | Self::DistanceTooFar { .. }
                | Self::MalformedStream { .. }
                | Self::InvalidHeader { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}
