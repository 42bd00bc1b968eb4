//! # zflate Deflate
//!
//! Pure Rust implementation of DEFLATE (RFC 1951) and the zlib container
//! (RFC 1950).
//!
//! ## Features
//!
//! - **Decompression**: all DEFLATE block types, fed in chunks of any size
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes
//! - **Compression**: hash-chain LZ77 + Huffman encoding
//!   - Compression levels 0-9 with lazy matching from level 4
//!   - Per-block choice of the smallest block type
//!   - Sync flush for byte-aligned, decodable prefixes
//! - **zlib**: header validation and Adler-32 verification
//!
//! ## Example
//!
//! ```rust
//! use zflate_deflate::{deflate, inflate};
//!
//! // Compress data
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//!
//! // Decompress data
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Greedy matching
//! - Level 4-6: Lazy matching (default is 6)
//! - Level 7-9: Lazy matching with long chain searches

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod zlib;

// Re-exports
pub use block::{BlockEncoder, BlockKind};
pub use deflate::{DeflateOptions, Deflater, deflate, deflate_with_options};
pub use huffman::HuffmanTree;
pub use inflate::{InflateOptions, InflateStats, Inflater, inflate, inflate_with_options};
pub use lz77::{Lz77Encoder, Lz77Token, MatchParams, TokenSink};
pub use zlib::{ZlibCompressor, ZlibDecompressor, ZlibHeader};
