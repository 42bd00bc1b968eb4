//! # zflate Core
//!
//! Core components shared by the zflate codec crates.
//!
//! - [`bitstream`]: LSB-first bit reader/writer with rewindable cursors
//! - [`window`]: Sliding window for resolving back-references
//! - [`adler32`]: Adler-32 checksum
//! - [`traits`]: Streaming compressor/decompressor traits
//! - [`error`]: Error types
//!
//! ## Example
//!
//! ```rust
//! use zflate_core::adler32::Adler32;
//! use zflate_core::bitstream::BitReader;
//!
//! let data = [0xAB, 0xCD];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(12).unwrap(), 0xDAB);
//!
//! assert_eq!(Adler32::checksum(b"Hello"), 0x058C01F5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler32;
pub mod bitstream;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use adler32::{Adler32, adler32_update};
pub use bitstream::{BitCursor, BitReader, BitWriter};
pub use error::{Result, ZflateError};
pub use traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
pub use window::Window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler32::Adler32;
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{Result, ZflateError};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
    pub use crate::window::Window;
}
