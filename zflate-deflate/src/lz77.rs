//! LZ77 matching for DEFLATE.
//!
//! The encoder keeps a `2 * WINDOW_SIZE` history buffer and indexes every
//! position by the hash of its next three bytes. `head` maps a hash to the
//! most recent position with that hash; `prev` links each position to the
//! previous one with the same hash, so a chain walk visits candidates
//! newest first.
//!
//! # Algorithm
//!
//! For each position the encoder searches the chain for the longest match
//! (bounded by the level's chain effort) and either:
//! - Emits a literal byte if no match of 3+ bytes is found
//! - Emits a (length, distance) pair otherwise
//!
//! At lazy levels a match is held back for one position to see whether the
//! next position starts a strictly longer one.
//!
//! Unless flushing, `MAX_MATCH + 1` bytes of lookahead are left unprocessed
//! between calls, so the token stream is the same however the input was
//! split into chunks.

use crate::tables::{MAX_DISTANCE, MAX_MATCH, MIN_MATCH};
use zflate_core::CompressionLevel;

/// Maximum window size for DEFLATE (32KB).
pub const WINDOW_SIZE: usize = MAX_DISTANCE;

const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// History buffer size; the upper half slides down when it fills.
const BUFFER_SIZE: usize = 2 * WINDOW_SIZE;

/// Lookahead held back between calls unless flushing.
const MIN_LOOKAHEAD: usize = MAX_MATCH + 1;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const HASH_MASK: usize = HASH_SIZE - 1;
const HASH_SHIFT: u32 = 5;

/// Empty slot in `head` and `prev`.
const NIL: u32 = u32::MAX;

/// A token produced by LZ77 matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Receiver for tokens produced by [`Lz77Encoder::tokenize`].
pub trait TokenSink {
    /// Accept one token together with the input bytes it covers.
    fn push(&mut self, token: Lz77Token, raw: &[u8]);

    /// When true, tokenizing pauses before the next token.
    fn is_full(&self) -> bool {
        false
    }
}

impl TokenSink for Vec<Lz77Token> {
    fn push(&mut self, token: Lz77Token, _raw: &[u8]) {
        Vec::push(self, token);
    }
}

/// Search parameters for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchParams {
    /// Quarter the chain effort once the current match reaches this length.
    pub good_length: usize,
    /// Only look for a better match at the next position below this length.
    pub lazy_length: usize,
    /// Stop searching once a match reaches this length.
    pub nice_length: usize,
    /// Maximum number of chain candidates examined per search.
    pub max_chain: usize,
    /// Whether matches are deferred by one position when a longer one follows.
    pub lazy: bool,
}

impl MatchParams {
    /// Parameters for `level`. Level 0 disables matching entirely.
    pub fn for_level(level: CompressionLevel) -> Self {
        let (good_length, lazy_length, nice_length, max_chain, lazy) = match level.level() {
            0 => (0, 0, 0, 0, false),
            1 => (4, 4, 8, 4, false),
            2 => (4, 5, 16, 8, false),
            3 => (4, 6, 32, 32, false),
            4 => (4, 4, 16, 16, true),
            5 => (8, 16, 32, 32, true),
            6 => (8, 16, 128, 128, true),
            7 => (8, 32, 128, 256, true),
            8 => (32, 128, 258, 1024, true),
            _ => (32, 258, 258, 4096, true),
        };

        Self {
            good_length,
            lazy_length,
            nice_length,
            max_chain,
            lazy,
        }
    }
}

/// Streaming LZ77 encoder for DEFLATE compression.
#[derive(Debug)]
pub struct Lz77Encoder {
    /// History plus unprocessed lookahead.
    window: Vec<u8>,
    /// Valid bytes in `window`.
    window_len: usize,
    /// Next position to tokenize.
    pos: usize,
    /// Next position to enter into the hash chains.
    next_insert: usize,
    /// Hash -> most recent position.
    head: Vec<u32>,
    /// Position -> previous position with the same hash.
    prev: Vec<u32>,
    /// Match already found for `pos` while evaluating a lazy deferral.
    pending: Option<(usize, usize)>,
    params: MatchParams,
    max_distance: usize,
}

impl Lz77Encoder {
    /// Create an encoder for `level` with a `1 << window_bits` byte window.
    pub fn new(level: CompressionLevel, window_bits: u8) -> Self {
        Self {
            window: vec![0; BUFFER_SIZE],
            window_len: 0,
            pos: 0,
            next_insert: 0,
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; WINDOW_SIZE],
            pending: None,
            params: MatchParams::for_level(level),
            max_distance: (1usize << window_bits.min(15)).min(WINDOW_SIZE),
        }
    }

    /// Reset the encoder state, keeping level and window size.
    pub fn reset(&mut self) {
        self.window_len = 0;
        self.pos = 0;
        self.next_insert = 0;
        self.pending = None;
        self.head.fill(NIL);
        self.prev.fill(NIL);
    }

    /// Whether buffered input remains untokenized.
    pub fn has_pending_input(&self) -> bool {
        self.pos < self.window_len
    }

    /// Copy as much of `input` into the history buffer as fits.
    ///
    /// Returns the number of bytes taken. Slides the buffer first when it is
    /// full and at least a window's worth has been tokenized.
    pub fn fill(&mut self, input: &[u8]) -> usize {
        if self.window_len == BUFFER_SIZE && self.pos >= WINDOW_SIZE {
            self.slide();
        }

        let take = (BUFFER_SIZE - self.window_len).min(input.len());
        self.window[self.window_len..self.window_len + take].copy_from_slice(&input[..take]);
        self.window_len += take;
        take
    }

    /// Move the upper half of the buffer down and rebase chain entries.
    fn slide(&mut self) {
        self.window.copy_within(WINDOW_SIZE..BUFFER_SIZE, 0);
        self.window_len -= WINDOW_SIZE;
        self.pos -= WINDOW_SIZE;
        self.next_insert = self.next_insert.saturating_sub(WINDOW_SIZE);

        let rebase = |entry: &mut u32| {
            *entry = if *entry == NIL || (*entry as usize) < WINDOW_SIZE {
                NIL
            } else {
                *entry - WINDOW_SIZE as u32
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    #[inline(always)]
    fn hash(&self, pos: usize) -> usize {
        let w = &self.window;
        (((w[pos] as usize) << (2 * HASH_SHIFT))
            ^ ((w[pos + 1] as usize) << HASH_SHIFT)
            ^ w[pos + 2] as usize)
            & HASH_MASK
    }

    /// Enter every position below `target` that has three bytes available.
    fn insert_until(&mut self, target: usize) {
        while self.next_insert < target && self.next_insert + MIN_MATCH <= self.window_len {
            let pos = self.next_insert;
            let h = self.hash(pos);
            self.prev[pos & WINDOW_MASK] = self.head[h];
            self.head[h] = pos as u32;
            self.next_insert += 1;
        }
    }

    /// Longest match for `pos` among earlier positions, examining at most
    /// `effort` chain candidates.
    ///
    /// Returns `(length, distance)`. Only strictly longer candidates replace
    /// the best so far, so equal lengths keep the nearest.
    pub fn find_match(&self, pos: usize, effort: usize) -> Option<(usize, usize)> {
        let available = (self.window_len - pos).min(MAX_MATCH);
        if available < MIN_MATCH || effort == 0 {
            return None;
        }

        let nice = self.params.nice_length.clamp(MIN_MATCH, MAX_MATCH);
        let target = &self.window[pos..pos + available];
        let mut candidate = self.head[self.hash(pos)];
        let mut best_len = MIN_MATCH - 1;
        let mut best_dist = 0;

        for _ in 0..effort {
            if candidate == NIL {
                break;
            }
            let start = candidate as usize;
            if start >= pos || pos - start > self.max_distance {
                break;
            }

            let source = &self.window[start..start + available];
            if source[best_len] == target[best_len] {
                let len = source
                    .iter()
                    .zip(target)
                    .take_while(|(a, b)| a == b)
                    .count();
                if len > best_len {
                    best_len = len;
                    best_dist = pos - start;
                    if len >= nice || len == available {
                        break;
                    }
                }
            }

            candidate = self.prev[start & WINDOW_MASK];
        }

        (best_len >= MIN_MATCH).then_some((best_len, best_dist))
    }

    /// Tokenize buffered input into `sink`.
    ///
    /// Without `flush`, the last `MAX_MATCH + 1` buffered bytes are held back
    /// for later calls. Returns `true` when everything up to that limit was
    /// processed, `false` when the sink filled up first.
    pub fn tokenize<S: TokenSink>(&mut self, flush: bool, sink: &mut S) -> bool {
        let limit = if flush {
            self.window_len
        } else {
            self.window_len.saturating_sub(MIN_LOOKAHEAD)
        };

        while self.pos < limit {
            if sink.is_full() {
                return false;
            }

            let current = match self.pending.take() {
                Some(found) => Some(found),
                None => {
                    self.insert_until(self.pos);
                    self.find_match(self.pos, self.params.max_chain)
                }
            };

            let Some((length, distance)) = current else {
                self.emit_literal(sink);
                continue;
            };

            if self.params.lazy
                && length < self.params.lazy_length
                && self.pos + 1 < self.window_len
            {
                self.insert_until(self.pos + 1);
                let effort = if length >= self.params.good_length {
                    self.params.max_chain >> 2
                } else {
                    self.params.max_chain
                };
                let next = self.find_match(self.pos + 1, effort);
                if matches!(next, Some((next_len, _)) if next_len > length) {
                    self.emit_literal(sink);
                    self.pending = next;
                    continue;
                }
            }

            sink.push(
                Lz77Token::Match {
                    length: length as u16,
                    distance: distance as u16,
                },
                &self.window[self.pos..self.pos + length],
            );
            self.pos += length;
        }

        true
    }

    fn emit_literal<S: TokenSink>(&mut self, sink: &mut S) {
        let byte = self.window[self.pos];
        let bytes = &self.window[self.pos..self.pos + 1];
        sink.push(Lz77Token::Literal(byte), bytes);
        self.pos += 1;
    }

    /// Tokenize a complete input in one call.
    pub fn compress_all(input: &[u8], level: CompressionLevel) -> Vec<Lz77Token> {
        let mut encoder = Self::new(level, 15);
        let mut tokens = Vec::new();
        let mut rest = input;

        loop {
            let taken = encoder.fill(rest);
            rest = &rest[taken..];
            if rest.is_empty() {
                encoder.tokenize(true, &mut tokens);
                return tokens;
            }
            encoder.tokenize(false, &mut tokens);
        }
    }
}

impl Default for Lz77Encoder {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT, 15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(level: u8) -> CompressionLevel {
        CompressionLevel::try_new(level).unwrap()
    }

    fn expand(tokens: &[Lz77Token]) -> Vec<u8> {
        let mut out = Vec::new();
        for token in tokens {
            match *token {
                Lz77Token::Literal(b) => out.push(b),
                Lz77Token::Match { length, distance } => {
                    let start = out.len() - distance as usize;
                    for i in 0..length as usize {
                        out.push(out[start + i]);
                    }
                }
            }
        }
        out
    }

    fn sample(size: usize) -> Vec<u8> {
        let words = ["alpha ", "beta ", "gamma ", "delta ", "epsilon "];
        let mut seed = 7u32;
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            out.extend_from_slice(words[(seed >> 16) as usize % words.len()].as_bytes());
            if seed % 7 == 0 {
                out.push((seed >> 8) as u8);
            }
        }
        out.truncate(size);
        out
    }

    #[test]
    fn test_literals_only() {
        let tokens = Lz77Encoder::compress_all(b"abcdefgh", level(6));
        assert_eq!(tokens.len(), 8);
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
    }

    #[test]
    fn test_simple_match() {
        let tokens = Lz77Encoder::compress_all(b"abcabcabcabc", level(6));
        assert_eq!(
            tokens,
            vec![
                Lz77Token::Literal(b'a'),
                Lz77Token::Literal(b'b'),
                Lz77Token::Literal(b'c'),
                Lz77Token::Match {
                    length: 9,
                    distance: 3
                },
            ]
        );
    }

    #[test]
    fn test_ties_keep_nearest() {
        let tokens = Lz77Encoder::compress_all(b"abcXabcYabc", level(6));
        assert_eq!(
            tokens.last(),
            Some(&Lz77Token::Match {
                length: 3,
                distance: 4
            })
        );
    }

    #[test]
    fn test_repeated_char() {
        let data = vec![b'a'; 1000];
        let tokens = Lz77Encoder::compress_all(&data, level(9));
        assert!(tokens.len() < 10);
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_decode_matches_all_levels() {
        let data = sample(100_000);
        for lvl in 0..=9 {
            let tokens = Lz77Encoder::compress_all(&data, level(lvl));
            assert_eq!(expand(&tokens), data, "level {}", lvl);
        }
    }

    #[test]
    fn test_level_0_literals() {
        let tokens = Lz77Encoder::compress_all(b"abababababab", level(0));
        assert_eq!(tokens.len(), 12);
    }

    #[test]
    fn test_chunked_input_same_tokens() {
        let data = sample(150_000);
        let expected = Lz77Encoder::compress_all(&data, level(6));

        for chunk in [1usize, 7, 1000, 40_000] {
            let mut encoder = Lz77Encoder::new(level(6), 15);
            let mut tokens = Vec::new();
            for piece in data.chunks(chunk) {
                let mut rest = piece;
                while !rest.is_empty() {
                    let taken = encoder.fill(rest);
                    rest = &rest[taken..];
                    encoder.tokenize(false, &mut tokens);
                }
            }
            encoder.tokenize(true, &mut tokens);
            assert!(tokens == expected, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_window_bits_limit_distance() {
        let block: Vec<u8> = (0..600u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut data = block.clone();
        data.extend_from_slice(&block);

        let mut encoder = Lz77Encoder::new(level(9), 9);
        encoder.fill(&data);
        let mut tokens = Vec::new();
        encoder.tokenize(true, &mut tokens);

        for token in &tokens {
            if let Lz77Token::Match { distance, .. } = token {
                assert!(*distance <= 512);
            }
        }
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_match_at_max_distance() {
        let mut state = 0x2545_f491u32;
        let mut data: Vec<u8> = (0..MAX_DISTANCE)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        data.extend_from_within(..300);

        let mut encoder = Lz77Encoder::new(level(9), 15);
        encoder.fill(&data);
        let mut tokens = Vec::new();
        encoder.tokenize(true, &mut tokens);

        assert!(tokens.iter().any(|token| matches!(
            token,
            Lz77Token::Match { distance, .. } if *distance as usize == MAX_DISTANCE
        )));
        assert_eq!(expand(&tokens), data);
    }

    #[test]
    fn test_sink_full_pauses() {
        struct Limited(Vec<Lz77Token>);
        impl TokenSink for Limited {
            fn push(&mut self, token: Lz77Token, raw: &[u8]) {
                match token {
                    Lz77Token::Literal(b) => assert_eq!(raw, &[b]),
                    Lz77Token::Match { length, .. } => assert_eq!(raw.len(), length as usize),
                }
                self.0.push(token);
            }
            fn is_full(&self) -> bool {
                self.0.len() >= 4
            }
        }

        let mut encoder = Lz77Encoder::default();
        encoder.fill(b"abcdefghij");
        let mut sink = Limited(Vec::new());
        assert!(!encoder.tokenize(true, &mut sink));
        assert_eq!(sink.0.len(), 4);
        assert!(encoder.has_pending_input());
    }

    #[test]
    fn test_level_params() {
        assert_eq!(MatchParams::for_level(level(0)).max_chain, 0);
        assert!(!MatchParams::for_level(level(3)).lazy);
        let best = MatchParams::for_level(level(9));
        assert!(best.lazy);
        assert_eq!(best.max_chain, 4096);
        assert_eq!(best.nice_length, 258);
    }
}
