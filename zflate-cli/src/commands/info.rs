//! Info command implementation.

use crate::utils::{CliResult, create_progress_bar, format_size, open_input, pump, space_savings};
use serde::Serialize;
use std::io;
use std::path::Path;
use zflate_core::{Adler32, Decompressor};
use zflate_deflate::zlib::ZlibDecompressor;
use zflate_deflate::{InflateStats, Inflater};

/// zlib header fields.
#[derive(Debug, Serialize)]
struct HeaderJson {
    window_bits: u8,
    window_size: usize,
    level: String,
}

/// JSON output for stream information.
#[derive(Debug, Serialize)]
struct StreamInfoJson {
    file: String,
    format: String,
    compressed_size: u64,
    decompressed_size: u64,
    savings: f64,
    adler32: String,
    stored_blocks: u64,
    fixed_blocks: u64,
    dynamic_blocks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<HeaderJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trailing_bytes: Option<usize>,
}

pub fn cmd_info(input: &Path, raw: bool, json: bool) -> CliResult<()> {
    let (mut reader, input_len) = open_input(input)?;
    let pb = create_progress_bar(input_len, false);
    let mut adler = Adler32::new();

    let (stats, header, trailing) = if raw {
        let mut inflater = Inflater::new();
        pump(&mut reader, &mut io::sink(), &pb, |chunk| {
            let out = inflater.feed(chunk)?;
            adler.update(&out);
            Ok(out)
        })?;
        adler.update(&inflater.finish()?);
        (inflater.stats(), None, Some(inflater.unconsumed().len()))
    } else {
        let mut decompressor = ZlibDecompressor::new();
        pump(&mut reader, &mut io::sink(), &pb, |chunk| {
            let out = decompressor.feed(chunk)?;
            adler.update(&out);
            Ok(out)
        })?;
        adler.update(&decompressor.finish()?);
        let header = decompressor.header().map(|h| HeaderJson {
            window_bits: h.window_bits,
            window_size: 1 << h.window_bits,
            level: format!("{:?}", h.level),
        });
        (decompressor.inflate_stats(), header, None)
    };

    let adler32 = adler.finish();
    let info = build_info(input, raw, input_len, &stats, adler32, header, trailing);
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&info);
    }

    Ok(())
}

fn build_info(
    input: &Path,
    raw: bool,
    compressed_size: u64,
    stats: &InflateStats,
    adler32: u32,
    header: Option<HeaderJson>,
    trailing_bytes: Option<usize>,
) -> StreamInfoJson {
    StreamInfoJson {
        file: input.display().to_string(),
        format: if raw { "deflate" } else { "zlib" }.to_string(),
        compressed_size,
        decompressed_size: stats.bytes_out,
        savings: space_savings(stats.bytes_out, compressed_size),
        adler32: format!("{:08x}", adler32),
        stored_blocks: stats.stored_blocks,
        fixed_blocks: stats.fixed_blocks,
        dynamic_blocks: stats.dynamic_blocks,
        header,
        trailing_bytes,
    }
}

fn print_info(info: &StreamInfoJson) {
    println!("Stream Information");
    println!("==================");
    println!("File: {}", info.file);
    println!("Format: {}", info.format);
    println!(
        "Compressed size: {} ({} bytes)",
        format_size(info.compressed_size),
        info.compressed_size
    );
    println!(
        "Decompressed size: {} ({} bytes)",
        format_size(info.decompressed_size),
        info.decompressed_size
    );
    if info.decompressed_size > 0 {
        println!("Space savings: {:.1}%", info.savings);
    }
    println!("Adler-32: {}", info.adler32);

    if let Some(header) = &info.header {
        println!();
        println!("zlib Header:");
        println!(
            "  Window: 2^{} ({} bytes)",
            header.window_bits, header.window_size
        );
        println!("  Level hint: {}", header.level);
    }

    println!();
    println!("Blocks:");
    println!("  Stored: {}", info.stored_blocks);
    println!("  Fixed: {}", info.fixed_blocks);
    println!("  Dynamic: {}", info.dynamic_blocks);
    if let Some(trailing) = info.trailing_bytes.filter(|&n| n > 0) {
        println!("  Trailing bytes: {}", trailing);
    }
}
