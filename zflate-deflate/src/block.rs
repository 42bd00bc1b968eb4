//! DEFLATE block encoding.
//!
//! A [`BlockEncoder`] collects LZ77 tokens until it is full, then picks the
//! cheapest of the three block types by exact bit count and writes it.

use crate::huffman::{
    CODELEN_ALPHABET_SIZE, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, EncodeTable, LITLEN_ALPHABET_SIZE,
    MAX_CODE_LENGTH, MAX_CODELEN_LENGTH, build_lengths,
};
use crate::lz77::{Lz77Token, TokenSink};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, distance_to_code,
    fixed_distance_codes, fixed_litlen_codes, fixed_litlen_lengths, length_to_code,
};
use std::io::Write;
use zflate_core::BitWriter;
use zflate_core::error::Result;

/// Tokens per block before it is emitted.
pub const MAX_BLOCK_TOKENS: usize = 16384;

/// Raw input bytes per block before it is emitted.
pub const MAX_BLOCK_BYTES: usize = 65536;

/// Largest payload of one stored block.
const MAX_STORED_LEN: usize = 65535;

/// DEFLATE block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Uncompressed (BTYPE 00).
    Stored,
    /// Fixed Huffman codes (BTYPE 01).
    Fixed,
    /// Dynamic Huffman codes (BTYPE 10).
    Dynamic,
}

impl BlockKind {
    fn btype(self) -> u32 {
        match self {
            Self::Stored => 0,
            Self::Fixed => 1,
            Self::Dynamic => 2,
        }
    }
}

/// Exact encoded size of the pending block for each block type, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCosts {
    /// Stored, including alignment padding and LEN/NLEN fields.
    pub stored: u64,
    /// Fixed Huffman.
    pub fixed: u64,
    /// Dynamic Huffman, including the code description header.
    pub dynamic: u64,
}

impl BlockCosts {
    /// Cheapest block type; ties prefer fixed, then dynamic, then stored.
    pub fn cheapest(&self) -> BlockKind {
        let mut best = (self.fixed, BlockKind::Fixed);
        if self.dynamic < best.0 {
            best = (self.dynamic, BlockKind::Dynamic);
        }
        if self.stored < best.0 {
            best = (self.stored, BlockKind::Stored);
        }
        best.1
    }
}

/// Accumulates one block's worth of tokens.
#[derive(Debug)]
pub struct BlockEncoder {
    tokens: Vec<Lz77Token>,
    raw: Vec<u8>,
    litlen_freq: [u32; LITLEN_ALPHABET_SIZE],
    dist_freq: [u32; DISTANCE_ALPHABET_SIZE],
    store_only: bool,
}

impl BlockEncoder {
    /// Create an empty block. With `store_only`, every block is stored.
    pub fn new(store_only: bool) -> Self {
        Self {
            tokens: Vec::with_capacity(MAX_BLOCK_TOKENS),
            raw: Vec::with_capacity(MAX_BLOCK_BYTES),
            litlen_freq: [0; LITLEN_ALPHABET_SIZE],
            dist_freq: [0; DISTANCE_ALPHABET_SIZE],
            store_only,
        }
    }

    /// Whether no tokens are pending.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of pending tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Number of input bytes the pending tokens cover.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// Discard pending tokens.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.raw.clear();
        self.litlen_freq.fill(0);
        self.dist_freq.fill(0);
    }

    /// Bit costs of the pending block when written after `pending_bits`
    /// bits of a partial byte.
    pub fn costs(&self, pending_bits: u8) -> BlockCosts {
        let litlen = self.litlen_with_eob();
        let plan = DynamicPlan::new(&litlen, &self.dist_freq);
        BlockCosts {
            stored: stored_cost(self.raw.len(), pending_bits),
            fixed: 3 + body_cost(
                &litlen,
                &self.dist_freq,
                &fixed_litlen_lengths(),
                &[5; DISTANCE_ALPHABET_SIZE],
            ),
            dynamic: plan.total_cost(&litlen, &self.dist_freq),
        }
    }

    fn litlen_with_eob(&self) -> [u32; LITLEN_ALPHABET_SIZE] {
        let mut freq = self.litlen_freq;
        freq[END_OF_BLOCK as usize] += 1;
        freq
    }

    /// Write the pending tokens as one block and clear them.
    ///
    /// An empty final block is written as a fixed block holding only the
    /// end-of-block code (bytes `03 00` at the start of a stream).
    pub fn write_block<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        final_block: bool,
    ) -> Result<BlockKind> {
        let kind = if self.tokens.is_empty() {
            BlockKind::Fixed
        } else if self.store_only {
            BlockKind::Stored
        } else {
            let costs = self.costs(writer.pending_bits());
            let kind = costs.cheapest();
            tracing::debug!(
                tokens = self.tokens.len(),
                raw = self.raw.len(),
                stored = costs.stored,
                fixed = costs.fixed,
                dynamic = costs.dynamic,
                ?kind,
                "block type chosen"
            );
            kind
        };

        match kind {
            BlockKind::Stored => write_stored(writer, &self.raw, final_block)?,
            BlockKind::Fixed => {
                write_header(writer, kind, final_block)?;
                self.write_tokens(writer, fixed_litlen_codes(), fixed_distance_codes())?;
            }
            BlockKind::Dynamic => {
                let litlen = self.litlen_with_eob();
                let plan = DynamicPlan::new(&litlen, &self.dist_freq);
                write_header(writer, kind, final_block)?;
                plan.write_header(writer)?;
                let litlen_codes = EncodeTable::from_lengths(&plan.litlen_lengths);
                let dist_codes = EncodeTable::from_lengths(&plan.dist_lengths);
                self.write_tokens(writer, &litlen_codes, &dist_codes)?;
            }
        }

        self.clear();
        Ok(kind)
    }

    fn write_tokens<W: Write>(
        &self,
        writer: &mut BitWriter<W>,
        litlen: &EncodeTable,
        dist: &EncodeTable,
    ) -> Result<()> {
        for token in &self.tokens {
            match *token {
                Lz77Token::Literal(byte) => {
                    let (code, len) = litlen.get(byte as u16);
                    writer.write_bits(code, len)?;
                }
                Lz77Token::Match { length, distance } => {
                    let (symbol, extra_bits, extra) = length_to_code(length);
                    let (code, len) = litlen.get(symbol);
                    writer.write_bits(code, len)?;
                    writer.write_bits(extra as u32, extra_bits)?;

                    let (symbol, extra_bits, extra) = distance_to_code(distance);
                    let (code, len) = dist.get(symbol);
                    writer.write_bits(code, len)?;
                    writer.write_bits(extra as u32, extra_bits)?;
                }
            }
        }

        let (code, len) = litlen.get(END_OF_BLOCK);
        writer.write_bits(code, len)
    }
}

impl TokenSink for BlockEncoder {
    fn push(&mut self, token: Lz77Token, raw: &[u8]) {
        match token {
            Lz77Token::Literal(byte) => self.litlen_freq[byte as usize] += 1,
            Lz77Token::Match { length, distance } => {
                self.litlen_freq[length_to_code(length).0 as usize] += 1;
                self.dist_freq[distance_to_code(distance).0 as usize] += 1;
            }
        }
        self.tokens.push(token);
        self.raw.extend_from_slice(raw);
    }

    fn is_full(&self) -> bool {
        self.tokens.len() >= MAX_BLOCK_TOKENS || self.raw.len() + 258 > MAX_BLOCK_BYTES
    }
}

fn write_header<W: Write>(
    writer: &mut BitWriter<W>,
    kind: BlockKind,
    final_block: bool,
) -> Result<()> {
    writer.write_bits(final_block as u32, 1)?;
    writer.write_bits(kind.btype(), 2)
}

/// Write `data` as one or more stored blocks; only the last may be final.
pub fn write_stored<W: Write>(
    writer: &mut BitWriter<W>,
    data: &[u8],
    final_block: bool,
) -> Result<()> {
    let mut chunks = data.chunks(MAX_STORED_LEN).peekable();
    if chunks.peek().is_none() {
        return write_stored_chunk(writer, &[], final_block);
    }
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        write_stored_chunk(writer, chunk, final_block && last)?;
    }
    Ok(())
}

fn write_stored_chunk<W: Write>(
    writer: &mut BitWriter<W>,
    chunk: &[u8],
    final_block: bool,
) -> Result<()> {
    write_header(writer, BlockKind::Stored, final_block)?;
    writer.align_to_byte()?;
    let len = chunk.len() as u16;
    writer.write_bits(len as u32, 16)?;
    writer.write_bits(!len as u32, 16)?;
    writer.write_bytes(chunk)
}

/// Write the empty non-final stored block that ends a sync flush.
pub fn write_sync_marker<W: Write>(writer: &mut BitWriter<W>) -> Result<()> {
    write_stored_chunk(writer, &[], false)
}

fn stored_cost(raw_len: usize, pending_bits: u8) -> u64 {
    let chunks = raw_len.div_ceil(MAX_STORED_LEN).max(1) as u64;
    let first_pad = (8 - (pending_bits as u64 + 3) % 8) % 8;
    // Later chunks start aligned: 3 header bits plus 5 padding bits.
    3 + first_pad + (chunks - 1) * 8 + chunks * 32 + raw_len as u64 * 8
}

fn length_extra(symbol: usize) -> u64 {
    if symbol > END_OF_BLOCK as usize {
        LENGTH_EXTRA_BITS[symbol - 257] as u64
    } else {
        0
    }
}

fn body_cost(
    litlen_freq: &[u32],
    dist_freq: &[u32],
    litlen_lengths: &[u8],
    dist_lengths: &[u8],
) -> u64 {
    let litlen: u64 = litlen_freq
        .iter()
        .zip(litlen_lengths)
        .enumerate()
        .map(|(i, (&f, &len))| f as u64 * (len as u64 + length_extra(i)))
        .sum();
    let dist: u64 = dist_freq
        .iter()
        .zip(dist_lengths)
        .zip(DISTANCE_EXTRA_BITS)
        .map(|((&f, &len), extra)| f as u64 * (len as u64 + extra as u64))
        .sum();
    litlen + dist
}

/// Give unused symbols a count until at least two symbols are used.
fn with_two_codes<const N: usize>(freq: &[u32; N]) -> [u32; N] {
    let mut freq = *freq;
    let mut used = freq.iter().filter(|&&f| f > 0).count();
    for f in freq.iter_mut() {
        if used >= 2 {
            break;
        }
        if *f == 0 {
            *f = 1;
            used += 1;
        }
    }
    freq
}

/// Run-length encode code lengths with repeat codes 16, 17 and 18.
///
/// Returns `(symbol, extra_value)` pairs.
pub fn rle_code_lengths(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        let mut left = run;

        if len == 0 {
            while left >= 11 {
                let r = left.min(138);
                out.push((18, (r - 11) as u8));
                left -= r;
            }
            if left >= 3 {
                out.push((17, (left - 3) as u8));
                left = 0;
            }
        } else {
            out.push((len, 0));
            left -= 1;
            while left >= 3 {
                let r = left.min(6);
                out.push((16, (r - 3) as u8));
                left -= r;
            }
        }
        out.extend(std::iter::repeat_n((len, 0), left));

        i += run;
    }

    out
}

fn repeat_extra_bits(symbol: u8) -> u8 {
    match symbol {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0,
    }
}

/// Code description of a dynamic block.
#[derive(Debug)]
struct DynamicPlan {
    litlen_lengths: Vec<u8>,
    dist_lengths: Vec<u8>,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    rle: Vec<(u8, u8)>,
    codelen_lengths: Vec<u8>,
}

impl DynamicPlan {
    fn new(
        litlen_freq: &[u32; LITLEN_ALPHABET_SIZE],
        dist_freq: &[u32; DISTANCE_ALPHABET_SIZE],
    ) -> Self {
        let litlen_lengths = build_lengths(&with_two_codes(litlen_freq), MAX_CODE_LENGTH as u8);
        let dist_lengths = build_lengths(&with_two_codes(dist_freq), MAX_CODE_LENGTH as u8);

        let hlit = last_used(&litlen_lengths).max(257);
        let hdist = last_used(&dist_lengths).max(1);

        let mut all = litlen_lengths[..hlit].to_vec();
        all.extend_from_slice(&dist_lengths[..hdist]);
        let rle = rle_code_lengths(&all);

        let mut codelen_freq = [0u32; CODELEN_ALPHABET_SIZE];
        for &(symbol, _) in &rle {
            codelen_freq[symbol as usize] += 1;
        }
        let codelen_lengths =
            build_lengths(&with_two_codes(&codelen_freq), MAX_CODELEN_LENGTH as u8);

        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&symbol| codelen_lengths[symbol] != 0)
            .map_or(0, |i| i + 1)
            .max(4);

        Self {
            litlen_lengths,
            dist_lengths,
            hlit,
            hdist,
            hclen,
            rle,
            codelen_lengths,
        }
    }

    fn header_cost(&self) -> u64 {
        let rle: u64 = self
            .rle
            .iter()
            .map(|&(symbol, _)| {
                self.codelen_lengths[symbol as usize] as u64 + repeat_extra_bits(symbol) as u64
            })
            .sum();
        5 + 5 + 4 + 3 * self.hclen as u64 + rle
    }

    fn total_cost(&self, litlen_freq: &[u32], dist_freq: &[u32]) -> u64 {
        let body = body_cost(
            litlen_freq,
            dist_freq,
            &self.litlen_lengths,
            &self.dist_lengths,
        );
        3 + self.header_cost() + body
    }

    fn write_header<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bits((self.hlit - 257) as u32, 5)?;
        writer.write_bits((self.hdist - 1) as u32, 5)?;
        writer.write_bits((self.hclen - 4) as u32, 4)?;

        for &symbol in &CODE_LENGTH_ORDER[..self.hclen] {
            writer.write_bits(self.codelen_lengths[symbol] as u32, 3)?;
        }

        let codes = EncodeTable::from_lengths(&self.codelen_lengths);
        for &(symbol, extra) in &self.rle {
            let (code, len) = codes.get(symbol as u16);
            writer.write_bits(code, len)?;
            writer.write_bits(extra as u32, repeat_extra_bits(symbol))?;
        }
        Ok(())
    }
}

/// One past the last nonzero entry.
fn last_used(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lz77::Lz77Encoder;
    use zflate_core::CompressionLevel;

    fn encode(data: &[u8], level: u8) -> (BlockEncoder, Vec<Lz77Token>) {
        let level = CompressionLevel::try_new(level).unwrap();
        let mut encoder = Lz77Encoder::new(level, 15);
        let mut block = BlockEncoder::new(level == CompressionLevel::NONE);
        encoder.fill(data);
        encoder.tokenize(true, &mut block);
        let tokens = block.tokens.clone();
        (block, tokens)
    }

    #[test]
    fn test_empty_final_block() {
        let mut block = BlockEncoder::new(false);
        let mut writer = BitWriter::new(Vec::new());
        assert_eq!(
            block.write_block(&mut writer, true).unwrap(),
            BlockKind::Fixed
        );
        assert_eq!(writer.into_inner().unwrap(), vec![0x03, 0x00]);
    }

    #[test]
    fn test_store_only() {
        let (mut block, _) = encode(b"aaaaaaaaaaaaaaaaaaaaaaaa", 0);
        let mut writer = BitWriter::new(Vec::new());
        assert_eq!(
            block.write_block(&mut writer, true).unwrap(),
            BlockKind::Stored
        );

        let out = writer.into_inner().unwrap();
        assert_eq!(out[0], 0x01);
        assert_eq!(&out[1..5], &[24, 0, 0xE7, 0xFF]);
        assert_eq!(&out[5..], b"aaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn test_cheapest_wins() {
        let text = b"The quick brown fox jumps over the lazy dog. ".repeat(200);
        for data in [&b"hi"[..], &text[..]] {
            let (mut block, _) = encode(data, 6);
            let costs = block.costs(0);
            let expected = costs.cheapest();

            let mut writer = BitWriter::new(Vec::new());
            assert_eq!(block.write_block(&mut writer, true).unwrap(), expected);

            let chosen = match expected {
                BlockKind::Stored => costs.stored,
                BlockKind::Fixed => costs.fixed,
                BlockKind::Dynamic => costs.dynamic,
            };
            let cheapest = costs.stored.min(costs.fixed).min(costs.dynamic);
            assert_eq!(chosen, cheapest);
            // The estimate is exact.
            assert_eq!(writer.bits_written(), chosen);
        }
    }

    #[test]
    fn test_tie_prefers_fixed() {
        let costs = BlockCosts {
            stored: 10,
            fixed: 10,
            dynamic: 10,
        };
        assert_eq!(costs.cheapest(), BlockKind::Fixed);

        let costs = BlockCosts {
            stored: 9,
            fixed: 10,
            dynamic: 9,
        };
        assert_eq!(costs.cheapest(), BlockKind::Dynamic);
    }

    #[test]
    fn test_stored_cost_padding() {
        assert_eq!(stored_cost(0, 0), 3 + 5 + 32);
        assert_eq!(stored_cost(10, 5), 3 + 32 + 80);
        assert_eq!(stored_cost(65536, 0), 3 + 5 + 8 + 64 + 65536 * 8);
    }

    #[test]
    fn test_rle_code_lengths() {
        assert_eq!(rle_code_lengths(&[0; 20]), vec![(18, 9)]);
        assert_eq!(rle_code_lengths(&[0; 10]), vec![(17, 7)]);
        assert_eq!(rle_code_lengths(&[0; 140]), vec![(18, 127), (0, 0), (0, 0)]);
        assert_eq!(rle_code_lengths(&[0; 150]), vec![(18, 127), (18, 1)]);
        assert_eq!(rle_code_lengths(&[5; 8]), vec![(5, 0), (16, 3), (5, 0)]);
        assert_eq!(
            rle_code_lengths(&[3, 3, 0, 0, 7]),
            vec![(3, 0), (3, 0), (0, 0), (0, 0), (7, 0)]
        );
    }

    #[test]
    fn test_dynamic_plan_has_two_codes() {
        let mut litlen = [0u32; LITLEN_ALPHABET_SIZE];
        litlen[b'a' as usize] = 100;
        litlen[END_OF_BLOCK as usize] = 1;
        let dist = [0u32; DISTANCE_ALPHABET_SIZE];

        let plan = DynamicPlan::new(&litlen, &dist);
        assert_eq!(plan.hlit, 257);
        assert_eq!(plan.hdist, 2);
        assert_eq!(plan.dist_lengths.iter().filter(|&&l| l > 0).count(), 2);
        assert!(plan.codelen_lengths.iter().filter(|&&l| l > 0).count() >= 2);
        assert!(plan.codelen_lengths.iter().all(|&l| l <= 7));
        assert!(plan.hclen >= 4);
    }

    #[test]
    fn test_block_fills_up() {
        let mut block = BlockEncoder::new(false);
        for _ in 0..MAX_BLOCK_TOKENS {
            assert!(!block.is_full());
            block.push(Lz77Token::Literal(0), &[0]);
        }
        assert!(block.is_full());
        assert_eq!(block.token_count(), MAX_BLOCK_TOKENS);
        block.clear();
        assert!(block.is_empty());
    }
}
