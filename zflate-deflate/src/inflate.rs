//! DEFLATE decompression.
//!
//! The decoder is a resumable state machine. Each step (a block header, a
//! dynamic code description, one symbol with its extra bits, or a run of
//! stored bytes) either completes or leaves the decoder exactly where it
//! was, so input may arrive in pieces of any size, down to single bytes.

use crate::huffman::{CODELEN_ALPHABET_SIZE, END_OF_BLOCK, HuffmanTree};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance, decode_length,
    fixed_distance_tree, fixed_litlen_tree,
};
use std::mem;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::Decompressor;
use zflate_core::window::sizes;
use zflate_core::{BitCursor, BitReader, Window};

/// Default cap on decompressed output (1 GiB).
pub const DEFAULT_MAX_OUTPUT: usize = 1 << 30;

/// Decompressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateOptions {
    /// History window size; a power of two between 512 and 32768.
    pub window_size: usize,
    /// Decoding fails once output would exceed this many bytes.
    pub max_output: usize,
}

impl InflateOptions {
    /// Set the output cap.
    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }

    /// Set the window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    fn validate(&self) -> Result<()> {
        let size = self.window_size;
        if !size.is_power_of_two() || !(sizes::MIN..=sizes::DEFLATE).contains(&size) {
            return Err(ZflateError::InvalidWindowBits {
                bits: (usize::BITS - size.leading_zeros()).saturating_sub(1) as u8,
            });
        }
        Ok(())
    }
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self {
            window_size: sizes::DEFLATE,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

/// Counters describing a decoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InflateStats {
    /// Stored blocks seen.
    pub stored_blocks: u64,
    /// Fixed Huffman blocks seen.
    pub fixed_blocks: u64,
    /// Dynamic Huffman blocks seen.
    pub dynamic_blocks: u64,
    /// Compressed bytes consumed.
    pub bytes_in: u64,
    /// Decompressed bytes produced.
    pub bytes_out: u64,
}

/// Huffman codes of the current block.
#[derive(Debug)]
enum Codes {
    Fixed,
    Dynamic(Box<(HuffmanTree, HuffmanTree)>),
}

/// Decoder state.
#[derive(Debug)]
enum State {
    /// Expecting a 3-bit block header.
    BlockHeader,
    /// Inside a stored block.
    Stored { remaining: usize },
    /// Inside a Huffman-coded block.
    Codes(Codes),
    /// Final block complete.
    Done,
    /// A previous call failed; the stream cannot continue.
    Failed,
}

/// One decoded literal/length symbol.
enum Symbol {
    Literal(u8),
    Copy { length: usize, distance: usize },
    EndOfBlock,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    /// Input not yet consumed (plus the partially consumed front byte).
    input: Vec<u8>,
    /// Read position in `input`.
    cursor: BitCursor,
    /// Bits discarded from the front of `input` so far.
    discarded_bits: u64,
    window: Window,
    state: State,
    final_block: bool,
    options: InflateOptions,
    stats: InflateStats,
}

impl Inflater {
    /// Create a decompressor with default options.
    pub fn new() -> Self {
        Self::build(InflateOptions::default())
    }

    /// Create a decompressor with explicit options.
    pub fn with_options(options: InflateOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: InflateOptions) -> Self {
        Self {
            input: Vec::new(),
            cursor: BitCursor::default(),
            discarded_bits: 0,
            window: Window::new(options.window_size),
            state: State::BlockHeader,
            final_block: false,
            options,
            stats: InflateStats::default(),
        }
    }

    /// Block and byte counters so far.
    pub fn stats(&self) -> InflateStats {
        InflateStats {
            bytes_in: (self.discarded_bits + self.cursor.bit_position()).div_ceil(8),
            ..self.stats
        }
    }

    /// Bytes that followed the final block in the chunk that completed it.
    ///
    /// Empty until the stream is complete. Chunks fed after that are
    /// ignored and not retained.
    pub fn unconsumed(&self) -> &[u8] {
        match self.state {
            State::Done => &self.input[self.cursor.byte()..],
            _ => &[],
        }
    }

    /// Decompress `chunk`, returning the bytes decoded so far.
    ///
    /// Running out of input is not an error here; the decoder waits for
    /// the next chunk.
    pub fn decompress(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_into(chunk, &mut out)?;
        Ok(out)
    }

    /// Decompress `chunk`, appending the decoded bytes to `out`.
    pub fn decompress_into(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self.state {
            State::Failed => {
                return Err(ZflateError::malformed(
                    self.bit_position(),
                    "stream already failed",
                ));
            }
            State::Done => return Ok(()),
            _ => {}
        }

        self.compact();
        self.input.extend_from_slice(chunk);

        match self.run(out) {
            Err(err) if !err.is_input_too_short() => {
                self.state = State::Failed;
                tracing::debug!(error = %err, "inflate failed");
                Err(err)
            }
            _ => Ok(()),
        }
    }

    /// Signal end of input, appending any remaining output to `out`.
    pub fn finish_into(&mut self, out: &mut Vec<u8>) -> Result<()> {
        match self.state {
            State::Done => return Ok(()),
            State::Failed => {
                return Err(ZflateError::malformed(
                    self.bit_position(),
                    "stream already failed",
                ));
            }
            _ => {}
        }

        self.run(out).inspect_err(|_| self.state = State::Failed)
    }

    fn bit_position(&self) -> u64 {
        self.discarded_bits + self.cursor.bit_position()
    }

    /// Drop fully consumed input bytes.
    fn compact(&mut self) {
        let consumed = self.cursor.byte();
        if consumed > 0 {
            self.input.drain(..consumed);
            self.discarded_bits += consumed as u64 * 8;
            self.cursor = self.cursor.rebase(consumed);
        }
    }

    fn run(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let input = mem::take(&mut self.input);
        let result = self.run_steps(&input, out);
        self.input = input;
        result
    }

    fn run_steps(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut reader = BitReader::with_cursor(input, self.cursor, self.discarded_bits);

        while !matches!(self.state, State::Done) {
            let checkpoint = reader.cursor();
            if let Err(err) = self.step(&mut reader, out) {
                self.cursor = checkpoint;
                return Err(err);
            }
            self.cursor = reader.cursor();
        }

        Ok(())
    }

    fn step(&mut self, reader: &mut BitReader<'_>, out: &mut Vec<u8>) -> Result<()> {
        match self.state {
            State::BlockHeader => self.read_block_header(reader),
            State::Stored { remaining } => self.copy_stored(reader, remaining, out),
            State::Codes(_) => self.decode_symbol(reader, out),
            State::Done | State::Failed => Ok(()),
        }
    }

    fn read_block_header(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let position = reader.bit_position();
        let header = reader.read_bits(3)?;
        let final_block = header & 1 != 0;

        let state = match header >> 1 {
            0 => {
                reader.align_to_byte();
                let fields = reader.read_aligned_bytes(4)?;
                let len = u16::from_le_bytes([fields[0], fields[1]]);
                let nlen = u16::from_le_bytes([fields[2], fields[3]]);
                if len != !nlen {
                    return Err(ZflateError::malformed(
                        position,
                        format!(
                            "stored block LEN {:#06x} does not match NLEN {:#06x}",
                            len, nlen
                        ),
                    ));
                }
                self.stats.stored_blocks += 1;
                State::Stored {
                    remaining: len as usize,
                }
            }
            1 => {
                self.stats.fixed_blocks += 1;
                State::Codes(Codes::Fixed)
            }
            2 => {
                let trees = read_dynamic_header(reader)?;
                self.stats.dynamic_blocks += 1;
                State::Codes(Codes::Dynamic(Box::new(trees)))
            }
            block_type => {
                let block_type = block_type as u8;
                return Err(ZflateError::malformed_block_type(block_type, position));
            }
        };

        tracing::trace!(
            position,
            final_block,
            block_type = header >> 1,
            "block header"
        );
        self.final_block = final_block;
        self.state = state;
        Ok(())
    }

    fn copy_stored(
        &mut self,
        reader: &mut BitReader<'_>,
        remaining: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if remaining == 0 {
            self.end_block(reader);
            return Ok(());
        }

        let bytes = reader.take_aligned_bytes(remaining);
        if bytes.is_empty() {
            return Err(ZflateError::input_too_short(reader.bit_position(), 8));
        }
        self.reserve_output(bytes.len())?;

        self.window.append(bytes);
        out.extend_from_slice(bytes);
        self.stats.bytes_out += bytes.len() as u64;
        self.state = State::Stored {
            remaining: remaining - bytes.len(),
        };
        Ok(())
    }

    fn decode_symbol(&mut self, reader: &mut BitReader<'_>, out: &mut Vec<u8>) -> Result<()> {
        let symbol = match &self.state {
            State::Codes(Codes::Fixed) => {
                read_symbol(reader, fixed_litlen_tree()?, fixed_distance_tree()?)?
            }
            State::Codes(Codes::Dynamic(trees)) => read_symbol(reader, &trees.0, &trees.1)?,
            _ => return Ok(()),
        };

        match symbol {
            Symbol::Literal(byte) => {
                self.reserve_output(1)?;
                self.window.push(byte);
                out.push(byte);
                self.stats.bytes_out += 1;
            }
            Symbol::Copy { length, distance } => {
                self.reserve_output(length)?;
                self.window.copy(distance, length, out)?;
                self.stats.bytes_out += length as u64;
            }
            Symbol::EndOfBlock => self.end_block(reader),
        }
        Ok(())
    }

    fn end_block(&mut self, reader: &mut BitReader<'_>) {
        if self.final_block {
            reader.align_to_byte();
            self.state = State::Done;
            tracing::debug!(
                bytes_out = self.stats.bytes_out,
                stored = self.stats.stored_blocks,
                fixed = self.stats.fixed_blocks,
                dynamic = self.stats.dynamic_blocks,
                "inflate stream complete"
            );
        } else {
            self.state = State::BlockHeader;
        }
    }

    fn reserve_output(&self, count: usize) -> Result<()> {
        let limit = self.options.max_output as u64;
        if self.stats.bytes_out + count as u64 > limit {
            return Err(ZflateError::output_limit(self.options.max_output));
        }
        Ok(())
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.decompress(chunk)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.finish_into(&mut out)?;
        Ok(out)
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn reset(&mut self) {
        *self = Self::build(self.options);
    }
}

/// Decode one literal/length symbol and, for lengths, its distance.
fn read_symbol(
    reader: &mut BitReader<'_>,
    litlen: &HuffmanTree,
    dist: &HuffmanTree,
) -> Result<Symbol> {
    let position = reader.bit_position();
    let symbol = litlen.decode(reader)?;

    match symbol {
        0..=255 => Ok(Symbol::Literal(symbol as u8)),
        END_OF_BLOCK => Ok(Symbol::EndOfBlock),
        257..=285 => {
            let extra = reader.read_bits(LENGTH_EXTRA_BITS[(symbol - 257) as usize])?;
            let length = decode_length(symbol, extra as u16);

            let position = reader.bit_position();
            let code = dist.decode(reader)?;
            if code >= 30 {
                return Err(ZflateError::malformed(
                    position,
                    format!("invalid distance symbol {}", code),
                ));
            }
            let extra = reader.read_bits(DISTANCE_EXTRA_BITS[code as usize])?;
            let distance = decode_distance(code, extra as u16);

            Ok(Symbol::Copy { length, distance })
        }
        _ => Err(ZflateError::malformed(
            position,
            format!("invalid literal/length symbol {}", symbol),
        )),
    }
}

/// Attach a bit position to a table construction error.
fn at_position(err: ZflateError, bit_position: u64) -> ZflateError {
    match err {
        ZflateError::MalformedStream { message, .. } => ZflateError::MalformedStream {
            bit_position,
            message,
        },
        other => other,
    }
}

/// Read the code description of a dynamic block (RFC 1951 Section 3.2.7).
fn read_dynamic_header(reader: &mut BitReader<'_>) -> Result<(HuffmanTree, HuffmanTree)> {
    let start = reader.bit_position();
    let hlit = reader.read_bits(5)? as usize + 257;
    let hdist = reader.read_bits(5)? as usize + 1;
    let hclen = reader.read_bits(4)? as usize + 4;

    if hlit > 286 || hdist > 30 {
        return Err(ZflateError::malformed(
            start,
            format!("too many codes: HLIT {} HDIST {}", hlit, hdist),
        ));
    }

    let mut codelen_lengths = [0u8; CODELEN_ALPHABET_SIZE];
    for &symbol in &CODE_LENGTH_ORDER[..hclen] {
        codelen_lengths[symbol] = reader.read_bits(3)? as u8;
    }
    let codelen_tree =
        HuffmanTree::from_code_lengths(&codelen_lengths).map_err(|e| at_position(e, start))?;

    let mut lengths = vec![0u8; hlit + hdist];
    let mut filled = 0;
    while filled < lengths.len() {
        let position = reader.bit_position();
        let symbol = codelen_tree.decode(reader)?;

        let (value, count) = match symbol {
            0..=15 => (symbol as u8, 1),
            16 => {
                if filled == 0 {
                    return Err(ZflateError::malformed(
                        position,
                        "repeat code with no previous length",
                    ));
                }
                (lengths[filled - 1], 3 + reader.read_bits(2)? as usize)
            }
            17 => (0, 3 + reader.read_bits(3)? as usize),
            18 => (0, 11 + reader.read_bits(7)? as usize),
            _ => return Err(ZflateError::invalid_huffman(position)),
        };

        if filled + count > lengths.len() {
            return Err(ZflateError::malformed(
                position,
                "code length repeat overflows the table",
            ));
        }
        lengths[filled..filled + count].fill(value);
        filled += count;
    }

    if lengths[END_OF_BLOCK as usize] == 0 {
        return Err(ZflateError::malformed(start, "missing end-of-block code"));
    }

    let located = |e| at_position(e, start);
    let litlen = HuffmanTree::from_code_lengths(&lengths[..hlit]).map_err(located)?;
    let dist = HuffmanTree::from_code_lengths(&lengths[hlit..]).map_err(located)?;
    Ok((litlen, dist))
}

/// Decompress DEFLATE data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_all(data)
}

/// Decompress DEFLATE data with explicit options.
pub fn inflate_with_options(data: &[u8], options: InflateOptions) -> Result<Vec<u8>> {
    Inflater::with_options(options)?.decompress_all(data)
}
