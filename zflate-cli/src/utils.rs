//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zflate_core::{Compressor, Decompressor};
use zflate_deflate::zlib::{ZlibCompressor, ZlibDecompressor};
use zflate_deflate::{DeflateOptions, Deflater, InflateOptions, Inflater};

/// Size of the chunks fed through the codecs.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Extension for zlib streams.
pub const ZLIB_EXTENSION: &str = "zz";

/// Extension for raw DEFLATE streams.
pub const RAW_EXTENSION: &str = "deflate";

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let template = "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Open a file for buffered reading, returning its length too.
pub fn open_input(path: &Path) -> CliResult<(BufReader<File>, u64)> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    Ok((BufReader::with_capacity(CHUNK_SIZE, file), len))
}

/// Create a file for buffered writing.
pub fn create_output(path: &Path) -> CliResult<BufWriter<File>> {
    Ok(BufWriter::with_capacity(CHUNK_SIZE, File::create(path)?))
}

/// Output path used when `-o` is not given.
///
/// Compression appends `.zz` (or `.deflate` with `--raw`). Decompression
/// strips that extension when present and appends `.out` otherwise.
pub fn default_output(input: &Path, compress: bool, raw: bool) -> PathBuf {
    let extension = if raw { RAW_EXTENSION } else { ZLIB_EXTENSION };
    if compress {
        let mut name = input.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        return PathBuf::from(name);
    }

    if input.extension().is_some_and(|ext| ext == extension) {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".out");
        PathBuf::from(name)
    }
}

/// Build the compressor for the selected container.
pub fn new_compressor(options: DeflateOptions, raw: bool) -> CliResult<Box<dyn Compressor>> {
    Ok(if raw {
        Box::new(Deflater::with_options(options)?)
    } else {
        Box::new(ZlibCompressor::with_options(options)?)
    })
}

/// Build the decompressor for the selected container.
pub fn new_decompressor(options: InflateOptions, raw: bool) -> CliResult<Box<dyn Decompressor>> {
    Ok(if raw {
        Box::new(Inflater::with_options(options)?)
    } else {
        Box::new(ZlibDecompressor::with_options(options))
    })
}

/// Read `reader` in chunks, pass each through `step` and write the result.
///
/// Returns the number of bytes written.
pub fn pump<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    progress: &ProgressBar,
    mut step: F,
) -> CliResult<u64>
where
    R: Read,
    W: Write,
    F: FnMut(&[u8]) -> zflate_core::Result<Vec<u8>>,
{
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let out = step(&buffer[..n])?;
        writer.write_all(&out)?;
        written += out.len() as u64;
        progress.inc(n as u64);
    }

    Ok(written)
}

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Space saved as a percentage of the original size.
pub fn space_savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (1.0 - compressed as f64 / original as f64) * 100.0
    }
}
