//! Compress command implementation.

use crate::utils::{
    CliResult, create_output, create_progress_bar, default_output, format_size, new_compressor,
    open_input, pump, space_savings,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zflate_core::CompressionLevel;
use zflate_deflate::DeflateOptions;

/// Options for the compress command.
pub struct CompressOptions<'a> {
    pub output: Option<&'a Path>,
    pub level: u8,
    pub raw: bool,
    pub window_bits: u8,
    pub progress: bool,
}

pub fn cmd_compress(input: &Path, options: &CompressOptions) -> CliResult<()> {
    let level = CompressionLevel::try_new(options.level)?;
    let deflate_options = DeflateOptions::new(level).with_window_bits(options.window_bits);
    let mut compressor = new_compressor(deflate_options, options.raw)?;

    let output: PathBuf = options
        .output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, true, options.raw));

    info!(
        input = %input.display(),
        output = %output.display(),
        level = options.level,
        window_bits = options.window_bits,
        raw = options.raw,
        "compressing"
    );

    let (mut reader, input_len) = open_input(input)?;
    let mut writer = create_output(&output)?;
    let pb = create_progress_bar(input_len, options.progress);

    let mut written = pump(
        &mut reader,
        &mut writer,
        &pb,
        |chunk| compressor.feed(chunk),
    )?;
    let tail = compressor.finish()?;
    writer.write_all(&tail)?;
    writer.flush()?;
    written += tail.len() as u64;
    pb.finish_and_clear();

    debug!(
        bytes_in = input_len,
        bytes_out = written,
        "compression finished"
    );
    println!(
        "{} -> {}: {} -> {} ({:.1}% saved)",
        input.display(),
        output.display(),
        format_size(input_len),
        format_size(written),
        space_savings(input_len, written)
    );

    Ok(())
}
