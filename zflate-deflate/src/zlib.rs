//! Zlib format wrapper for DEFLATE compression.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum.
//!
//! # Format
//!
//! ```text
//! +---+---+============+---+---+---+---+
//! |CMF|FLG| compressed |    ADLER32    |
//! +---+---+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present (rejected here)
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - Compressed data (DEFLATE format)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)

use crate::deflate::{DeflateOptions, Deflater};
use crate::inflate::{InflateOptions, InflateStats, Inflater};
use zflate_core::adler32::Adler32;
use zflate_core::error::{Result, ZflateError};
use zflate_core::traits::{CompressionLevel, Compressor, Decompressor};

/// Compression method 8 (DEFLATE).
const CM_DEFLATE: u8 = 8;

/// FDICT flag bit in FLG.
const FDICT: u8 = 0x20;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Convert from compression level (0-9) to zlib level indicator.
    pub fn from_level(level: CompressionLevel) -> Self {
        match level.level() {
            0..=1 => Self::Fastest,
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// The two-byte zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Base-2 logarithm of the window size (8-15).
    pub window_bits: u8,
    /// Advertised compression level.
    pub level: ZlibLevel,
}

impl ZlibHeader {
    /// Serialize to CMF and FLG bytes.
    pub fn to_bytes(&self) -> [u8; 2] {
        let cmf = ((self.window_bits - 8) << 4) | CM_DEFLATE;
        let flg = (self.level as u8) << 6;
        let remainder = (cmf as u16 * 256 + flg as u16) % 31;
        let fcheck = if remainder == 0 { 0 } else { 31 - remainder as u8 };
        [cmf, flg | fcheck]
    }

    /// Parse and validate CMF and FLG bytes.
    pub fn parse(bytes: [u8; 2]) -> Result<Self> {
        let [cmf, flg] = bytes;

        if cmf & 0x0F != CM_DEFLATE {
            return Err(ZflateError::invalid_header(format!(
                "unsupported compression method {}",
                cmf & 0x0F
            )));
        }
        let cinfo = cmf >> 4;
        if cinfo > 7 {
            return Err(ZflateError::invalid_header(format!(
                "window size 2^{} exceeds 32 KiB",
                cinfo + 8
            )));
        }
        if (cmf as u16 * 256 + flg as u16) % 31 != 0 {
            return Err(ZflateError::invalid_header("header check bits mismatch"));
        }
        if flg & FDICT != 0 {
            return Err(ZflateError::invalid_header(
                "preset dictionaries are not supported",
            ));
        }

        Ok(Self {
            window_bits: cinfo + 8,
            level: ZlibLevel::from_bits(flg >> 6),
        })
    }
}

/// Streaming zlib compressor.
#[derive(Debug)]
pub struct ZlibCompressor {
    deflater: Deflater,
    adler: Adler32,
    header_written: bool,
}

impl ZlibCompressor {
    /// Create a compressor for `level` with the default window.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            deflater: Deflater::new(level),
            adler: Adler32::new(),
            header_written: false,
        }
    }

    /// Create a compressor with explicit options.
    pub fn with_options(options: DeflateOptions) -> Result<Self> {
        Ok(Self {
            deflater: Deflater::with_options(options)?,
            adler: Adler32::new(),
            header_written: false,
        })
    }

    fn header(&mut self) -> Vec<u8> {
        if self.header_written {
            return Vec::new();
        }
        self.header_written = true;
        let options = self.deflater.options();
        ZlibHeader {
            window_bits: options.window_bits,
            level: ZlibLevel::from_level(options.level),
        }
        .to_bytes()
        .to_vec()
    }
}

impl Compressor for ZlibCompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let body = self.deflater.feed(chunk)?;
        self.adler.update(chunk);
        let mut out = self.header();
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        let body = self.deflater.flush()?;
        let mut out = self.header();
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let body = self.deflater.finish()?;
        let mut out = self.header();
        out.extend_from_slice(&body);
        out.extend_from_slice(&self.adler.finish().to_be_bytes());
        Ok(out)
    }

    fn is_finished(&self) -> bool {
        self.deflater.is_finished()
    }

    fn reset(&mut self) {
        self.deflater.reset();
        self.adler.reset();
        self.header_written = false;
    }
}

/// Streaming zlib decompressor.
///
/// Buffers the header until both bytes have arrived, sizes the window from
/// CINFO, and verifies the Adler-32 trailer once the DEFLATE stream ends.
/// Bytes after the trailer are ignored.
#[derive(Debug)]
pub struct ZlibDecompressor {
    options: InflateOptions,
    header: Vec<u8>,
    parsed: Option<ZlibHeader>,
    inflater: Option<Inflater>,
    adler: Adler32,
    trailer: Vec<u8>,
    finished: bool,
}

impl ZlibDecompressor {
    /// Create a decompressor with default options.
    pub fn new() -> Self {
        Self::with_options(InflateOptions::default())
    }

    /// Create a decompressor; the window size in `options` is replaced by
    /// the one announced in the stream header.
    pub fn with_options(options: InflateOptions) -> Self {
        Self {
            options,
            header: Vec::with_capacity(2),
            parsed: None,
            inflater: None,
            adler: Adler32::new(),
            trailer: Vec::with_capacity(4),
            finished: false,
        }
    }

    /// The parsed header, once available.
    pub fn header(&self) -> Option<&ZlibHeader> {
        self.parsed.as_ref()
    }

    /// Statistics of the embedded DEFLATE stream.
    pub fn inflate_stats(&self) -> InflateStats {
        self.inflater
            .as_ref()
            .map(Inflater::stats)
            .unwrap_or_default()
    }

    /// Decompress `chunk`, appending the decoded bytes to `out`.
    pub fn decompress_into(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let mut rest = chunk;
        if self.inflater.is_none() {
            let take = (2 - self.header.len()).min(rest.len());
            self.header.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.header.len() < 2 {
                return Ok(());
            }

            let header = ZlibHeader::parse([self.header[0], self.header[1]])?;
            tracing::debug!(window_bits = header.window_bits, level = ?header.level, "zlib header");
            let window_size = 1usize << header.window_bits.max(9);
            self.inflater = Some(Inflater::with_options(
                self.options.with_window_size(window_size),
            )?);
            self.parsed = Some(header);
        }
        let Some(inflater) = self.inflater.as_mut() else {
            return Ok(());
        };

        let trailer_input = if inflater.is_finished() {
            rest
        } else {
            let start = out.len();
            inflater.decompress_into(rest, out)?;
            self.adler.update(&out[start..]);
            if !inflater.is_finished() {
                return Ok(());
            }
            inflater.unconsumed()
        };

        let take = (4 - self.trailer.len()).min(trailer_input.len());
        self.trailer.extend_from_slice(&trailer_input[..take]);

        if self.trailer.len() == 4 {
            let expected = u32::from_be_bytes([
                self.trailer[0],
                self.trailer[1],
                self.trailer[2],
                self.trailer[3],
            ]);
            let computed = self.adler.finish();
            if expected != computed {
                return Err(ZflateError::checksum_mismatch(expected, computed));
            }
            self.finished = true;
        }

        Ok(())
    }
}

impl Default for ZlibDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for ZlibDecompressor {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_into(chunk, &mut out)?;
        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.finished {
            return Ok(Vec::new());
        }

        match self.inflater.as_mut() {
            None => Err(ZflateError::input_too_short(
                self.header.len() as u64 * 8,
                (2 - self.header.len()) * 8,
            )),
            Some(inflater) if !inflater.is_finished() => {
                // Surfaces the truncation (or a pending corruption) error.
                inflater.finish()?;
                let bit_position = inflater.stats().bytes_in * 8;
                Err(ZflateError::input_too_short(bit_position, 32))
            }
            Some(inflater) => Err(ZflateError::input_too_short(
                (inflater.stats().bytes_in + 2 + self.trailer.len() as u64) * 8,
                (4 - self.trailer.len()) * 8,
            )),
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn reset(&mut self) {
        *self = Self::with_options(self.options);
    }
}

/// Compress data into a zlib stream.
///
/// # Example
///
/// ```
/// use zflate_deflate::zlib::{compress, decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = compress(data, 6).unwrap();
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// assert_eq!(decompress(&compressed, None).unwrap(), data);
/// ```
pub fn compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let level = CompressionLevel::try_new(level)?;
    ZlibCompressor::new(level).compress_all(data)
}

/// Compress data into a zlib stream with explicit options.
pub fn compress_with_options(data: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    ZlibCompressor::with_options(options)?.compress_all(data)
}

/// Decompress a zlib stream.
///
/// `size_hint` pre-sizes the output buffer when the decompressed size is
/// known.
pub fn decompress(data: &[u8], size_hint: Option<usize>) -> Result<Vec<u8>> {
    let options = InflateOptions::default();
    let mut out = Vec::with_capacity(size_hint.unwrap_or(0).min(options.max_output));
    let mut decoder = ZlibDecompressor::with_options(options);
    decoder.decompress_into(data, &mut out)?;
    decoder.finish()?;
    Ok(out)
}

/// Decompress a zlib stream with explicit options.
pub fn decompress_with_options(data: &[u8], options: InflateOptions) -> Result<Vec<u8>> {
    ZlibDecompressor::with_options(options).decompress_all(data)
}
