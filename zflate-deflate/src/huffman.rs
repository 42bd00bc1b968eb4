//! Huffman coding for DEFLATE.
//!
//! DEFLATE uses canonical Huffman codes: a code is fully described by the
//! bit length of each symbol, codes of equal length are consecutive integers
//! in symbol order, and shorter codes sort before longer ones. This module
//! builds length-limited code lengths from symbol frequencies, assigns
//! canonical codes, and decodes symbols from a bit stream.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use zflate_core::BitReader;
use zflate_core::error::{Result, ZflateError};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Maximum code length for the code length alphabet (7 bits).
pub const MAX_CODELEN_LENGTH: usize = 7;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Compute length-limited Huffman code lengths.
///
/// Builds an ordinary Huffman tree by repeatedly merging the two lightest
/// nodes (ties go to the lower symbol index; merged nodes rank after all
/// leaves of equal weight), then reads each leaf's depth. If the deepest
/// leaf exceeds `max_length`, the over-long leaves are folded into level
/// `max_length` and the Kraft sum is repaired one code at a time by
/// splitting the deepest shorter leaf, after which the lengths are handed
/// out again in frequency order.
///
/// Symbols with zero frequency get length 0. A lone used symbol gets
/// length 1 so that it still has a transmittable code.
pub fn build_lengths(frequencies: &[u32], max_length: u8) -> Vec<u8> {
    let mut lengths = vec![0u8; frequencies.len()];
    let max_length = max_length.clamp(1, MAX_CODE_LENGTH as u8) as usize;

    // (frequency, symbol), in symbol order
    let leaves: Vec<(u32, usize)> = frequencies
        .iter()
        .enumerate()
        .filter(|&(_, f)| *f > 0)
        .map(|(i, f)| (*f, i))
        .collect();

    match leaves.len() {
        0 => return lengths,
        1 => {
            lengths[leaves[0].1] = 1;
            return lengths;
        }
        _ => {}
    }

    let n = leaves.len();
    debug_assert!(n <= 1 << max_length, "Alphabet too large for length limit");

    // Node arena: leaves occupy 0..n, merged nodes follow in creation order,
    // so every parent index is greater than its children's.
    let mut parent = vec![0usize; 2 * n - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = leaves
        .iter()
        .enumerate()
        .map(|(node, &(freq, _))| Reverse((freq as u64, node)))
        .collect();

    let mut next = n;
    while let (Some(Reverse((wa, a))), Some(Reverse((wb, b)))) = (heap.pop(), heap.pop()) {
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((wa + wb, next)));
        next += 1;
    }

    let root = 2 * n - 2;
    let mut depth = vec![0usize; 2 * n - 1];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }

    let deepest = depth[..n].iter().copied().max().unwrap_or(0);
    if deepest <= max_length {
        for (node, &(_, symbol)) in leaves.iter().enumerate() {
            lengths[symbol] = depth[node] as u8;
        }
        return lengths;
    }

    let mut bl_count = vec![0u32; max_length + 1];
    for &d in &depth[..n] {
        bl_count[d.min(max_length)] += 1;
    }

    let limit = 1u64 << max_length;
    let mut total: u64 = (1..=max_length)
        .map(|len| (bl_count[len] as u64) << (max_length - len))
        .sum();

    while total > limit {
        bl_count[max_length] -= 1;
        for len in (1..max_length).rev() {
            if bl_count[len] != 0 {
                bl_count[len] -= 1;
                bl_count[len + 1] += 2;
                break;
            }
        }
        total -= 1;
    }

    // Most frequent symbols get the shortest codes.
    let mut by_weight = leaves;
    by_weight.sort_by_key(|&(freq, symbol)| (Reverse(freq), symbol));

    let mut symbols = by_weight.iter();
    for (len, &count) in bl_count.iter().enumerate().skip(1) {
        for _ in 0..count {
            if let Some(&(_, symbol)) = symbols.next() {
                lengths[symbol] = len as u8;
            }
        }
    }

    lengths
}

/// Assign canonical Huffman codes (RFC 1951 Section 3.2.2).
///
/// Codes are returned most significant bit first, as integers; symbols with
/// length 0 get code 0.
pub fn assign_canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }

    let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_CODE_LENGTH {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                0
            } else {
                let code = next_code[len as usize];
                next_code[len as usize] += 1;
                code as u16
            }
        })
        .collect()
}

/// Reverse the low `length` bits of `code`.
#[inline]
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length as u32)
}

/// Check that `lengths` describe a valid prefix code (Kraft sum ≤ 1).
pub fn satisfies_kraft(lengths: &[u8], max_length: u8) -> bool {
    let max_length = max_length as u32;
    let total: u64 = lengths
        .iter()
        .filter(|&&len| len > 0)
        .map(|&len| {
            if len as u32 > max_length {
                u64::MAX / 2
            } else {
                1u64 << (max_length - len as u32)
            }
        })
        .sum();
    total <= 1u64 << max_length
}

/// Codes ready for LSB-first emission.
///
/// Each entry holds the bit-reversed canonical code and its length, so the
/// code can be handed straight to a `BitWriter`.
#[derive(Debug, Clone)]
pub struct EncodeTable {
    codes: Vec<(u16, u8)>,
}

impl EncodeTable {
    /// Build an encoding table from code lengths.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let codes = assign_canonical_codes(lengths)
            .into_iter()
            .zip(lengths)
            .map(|(code, &len)| (reverse_bits(code, len), len))
            .collect();
        Self { codes }
    }

    /// The (reversed code, length) pair for `symbol`.
    #[inline]
    pub fn get(&self, symbol: u16) -> (u32, u8) {
        let (code, len) = self.codes[symbol as usize];
        (code as u32, len)
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the table has no symbols.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A Huffman tree for decoding.
///
/// Codes up to `FAST_BITS` long resolve with one table lookup; longer codes
/// fall back to a canonical bit-by-bit walk.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    /// Direct lookup table indexed by the next `fast_bits` stream bits.
    /// Entry: (symbol, code_length); length 0 means "not resolvable here".
    fast_table: Vec<(u16, u8)>,
    /// Number of bits for fast lookup.
    fast_bits: u8,
    /// Maximum code length in this tree.
    max_code_length: u8,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Symbols ordered by (code length, symbol).
    symbols: Vec<u16>,
}

impl HuffmanTree {
    /// Number of bits for fast lookup table.
    const FAST_BITS: u8 = 9;

    /// Build a decoding tree from code lengths.
    ///
    /// `code_lengths[i]` is the bit length of symbol `i`; zero means unused.
    /// Over-subscribed sets are rejected. Incomplete sets are accepted, and
    /// their unassigned codes fail at decode time.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        if code_lengths.is_empty() {
            return Err(ZflateError::malformed(0, "empty code length set"));
        }

        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        let mut max_length = 0u8;
        for &len in code_lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(ZflateError::malformed(
                    0,
                    format!("code length {} exceeds maximum {}", len, MAX_CODE_LENGTH),
                ));
            }
            if len > 0 {
                counts[len as usize] += 1;
                max_length = max_length.max(len);
            }
        }

        let mut left = 1i32;
        for &count in &counts[1..] {
            left = (left << 1) - count as i32;
            if left < 0 {
                return Err(ZflateError::malformed(0, "over-subscribed Huffman code"));
            }
        }

        let mut offsets = [0usize; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len] as usize;
        }
        let mut symbols = vec![0u16; offsets[MAX_CODE_LENGTH + 1]];
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                symbols[offsets[len as usize]] = symbol as u16;
                offsets[len as usize] += 1;
            }
        }

        let fast_bits = Self::FAST_BITS.min(max_length.max(1));
        let mut fast_table = vec![(0u16, 0u8); 1 << fast_bits];
        let codes = assign_canonical_codes(code_lengths);
        for (symbol, (&len, &code)) in code_lengths.iter().zip(&codes).enumerate() {
            if len == 0 || len > fast_bits {
                continue;
            }
            let reversed = reverse_bits(code, len) as usize;
            for fill in 0..1usize << (fast_bits - len) {
                fast_table[reversed | (fill << len)] = (symbol as u16, len);
            }
        }

        Ok(Self {
            fast_table,
            fast_bits,
            max_code_length: max_length,
            counts,
            symbols,
        })
    }

    /// Longest code length in the tree (0 for an empty tree).
    pub fn max_code_length(&self) -> u8 {
        self.max_code_length
    }

    /// Decode one symbol.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        if self.max_code_length == 0 {
            return Err(ZflateError::invalid_huffman(reader.bit_position()));
        }

        let (bits, available) = reader.peek_bits(self.fast_bits);
        let (symbol, len) = self.fast_table[bits as usize];
        if len > 0 && len <= available {
            reader.skip_bits(len as usize)?;
            return Ok(symbol);
        }

        self.decode_slow(reader)
    }

    /// Canonical bit-by-bit decode for codes the fast table cannot resolve.
    fn decode_slow(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let start = reader.bit_position();
        let mut code = 0i32;
        let mut first = 0i32;
        let mut index = 0i32;

        for len in 1..=self.max_code_length as usize {
            code |= reader.read_bits(1)? as i32;
            let count = self.counts[len] as i32;
            if code - first < count {
                return Ok(self.symbols[(index + code - first) as usize]);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }

        Err(ZflateError::invalid_huffman(start))
    }
}
