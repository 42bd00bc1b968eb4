//! Static tables for DEFLATE (RFC 1951).
//!
//! Length and distance base/extra-bit tables, the code length permutation,
//! and the fixed Huffman codes of Section 3.2.6 in both encoding and
//! decoding form.

use crate::huffman::{EncodeTable, HuffmanTree};
use std::sync::OnceLock;
use zflate_core::error::{Result, ZflateError};

/// Smallest match length DEFLATE can express.
pub const MIN_MATCH: usize = 3;

/// Largest match length DEFLATE can express.
pub const MAX_MATCH: usize = 258;

/// Largest back-reference distance.
pub const MAX_DISTANCE: usize = 32768;

/// Length code base values for symbols 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264
    11, 13, 15, 17, // 265-268
    19, 23, 27, 31, // 269-272
    35, 43, 51, 59, // 273-276
    67, 83, 99, 115, // 277-280
    131, 163, 195, 227, // 281-284
    258, // 285
];

/// Extra bits for length symbols 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values for codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of code length code lengths (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths: all 30 codes (plus the two reserved ones)
/// use 5 bits.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

fn build_tree(lengths: &[u8]) -> Option<HuffmanTree> {
    HuffmanTree::from_code_lengths(lengths).ok()
}

/// Cached decoding tree for the fixed literal/length code.
pub fn fixed_litlen_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<Option<HuffmanTree>> = OnceLock::new();

    TREE.get_or_init(|| build_tree(&fixed_litlen_lengths()))
        .as_ref()
        .ok_or_else(|| ZflateError::malformed(0, "fixed literal/length table"))
}

/// Cached decoding tree for the fixed distance code.
pub fn fixed_distance_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<Option<HuffmanTree>> = OnceLock::new();

    TREE.get_or_init(|| build_tree(&fixed_distance_lengths()))
        .as_ref()
        .ok_or_else(|| ZflateError::malformed(0, "fixed distance table"))
}

/// Cached encoding table for the fixed literal/length code.
pub fn fixed_litlen_codes() -> &'static EncodeTable {
    static TABLE: OnceLock<EncodeTable> = OnceLock::new();
    TABLE.get_or_init(|| EncodeTable::from_lengths(&fixed_litlen_lengths()))
}

/// Cached encoding table for the fixed distance code.
pub fn fixed_distance_codes() -> &'static EncodeTable {
    static TABLE: OnceLock<EncodeTable> = OnceLock::new();
    TABLE.get_or_init(|| EncodeTable::from_lengths(&fixed_distance_lengths()))
}

/// Map a match length (3-258) to `(symbol, extra_bits, extra_value)`.
#[inline]
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (MIN_MATCH as u16..=MAX_MATCH as u16).contains(&length),
        "Length out of range: {}",
        length
    );

    let index = LENGTH_BASE.partition_point(|&base| base <= length) - 1;
    (
        257 + index as u16,
        LENGTH_EXTRA_BITS[index],
        length - LENGTH_BASE[index],
    )
}

/// Map a distance (1-32768) to `(code, extra_bits, extra_value)`.
#[inline]
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(distance >= 1, "Distance out of range: {}", distance);

    let index = DISTANCE_BASE.partition_point(|&base| base <= distance) - 1;
    (
        index as u16,
        DISTANCE_EXTRA_BITS[index],
        distance - DISTANCE_BASE[index],
    )
}

/// Rebuild a length from its symbol (257-285) and extra bits.
#[inline]
pub fn decode_length(symbol: u16, extra: u16) -> usize {
    debug_assert!((257..=285).contains(&symbol), "length symbol {}", symbol);
    (LENGTH_BASE[(symbol - 257) as usize] + extra) as usize
}

/// Rebuild a distance from its code (0-29) and extra bits.
#[inline]
pub fn decode_distance(code: u16, extra: u16) -> usize {
    debug_assert!(code < 30, "Invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] as usize + extra as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7); // End of block
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_tables() {
        assert_eq!(fixed_litlen_tree().unwrap().max_code_length(), 9);
        assert_eq!(fixed_distance_tree().unwrap().max_code_length(), 5);

        // End of block is seven zero bits.
        assert_eq!(fixed_litlen_codes().get(256), (0, 7));
        // Literal 0 is 00110000, sent MSB first.
        assert_eq!(fixed_litlen_codes().get(0), (0b0000_1100, 8));
        assert_eq!(fixed_distance_codes().get(0), (0, 5));
    }

    #[test]
    fn test_length_codes_cover_range() {
        for length in 3..=258u16 {
            let (symbol, extra_bits, extra_value) = length_to_code(length);
            assert!((257..=285).contains(&symbol));
            assert!(extra_value < 1u16 << extra_bits);
            assert_eq!(decode_length(symbol, extra_value), length as usize);
        }
    }

    #[test]
    fn test_distance_codes_cover_range() {
        for distance in 1..=32768u16 {
            let (code, extra_bits, extra_value) = distance_to_code(distance);
            assert!(code < 30);
            assert!((extra_value as u32) < 1u32 << extra_bits);
            assert_eq!(decode_distance(code, extra_value), distance as usize);
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(257), (284, 5, 30));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
