//! Decompress command implementation.

use crate::utils::{
    CliResult, create_output, create_progress_bar, default_output, format_size, new_decompressor,
    open_input, pump,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zflate_deflate::InflateOptions;

/// Options for the decompress command.
pub struct DecompressOptions<'a> {
    pub output: Option<&'a Path>,
    pub raw: bool,
    pub max_output: Option<usize>,
    pub progress: bool,
}

pub fn cmd_decompress(input: &Path, options: &DecompressOptions) -> CliResult<()> {
    let mut inflate_options = InflateOptions::default();
    if let Some(limit) = options.max_output {
        inflate_options = inflate_options.with_max_output(limit);
    }
    let mut decompressor = new_decompressor(inflate_options, options.raw)?;

    let output: PathBuf = options
        .output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, false, options.raw));

    info!(
        input = %input.display(),
        output = %output.display(),
        raw = options.raw,
        max_output = inflate_options.max_output,
        "decompressing"
    );

    let (mut reader, input_len) = open_input(input)?;
    let pb = create_progress_bar(input_len, options.progress);

    // A failed stream must not leave a truncated output file behind.
    let result = (|| -> CliResult<u64> {
        let mut writer = create_output(&output)?;
        let mut written = pump(
            &mut reader,
            &mut writer,
            &pb,
            |chunk| decompressor.feed(chunk),
        )?;
        let tail = decompressor.finish()?;
        writer.write_all(&tail)?;
        writer.flush()?;
        written += tail.len() as u64;
        Ok(written)
    })();
    pb.finish_and_clear();

    let written = match result {
        Ok(written) => written,
        Err(e) => {
            let _ = std::fs::remove_file(&output);
            return Err(e);
        }
    };

    debug!(
        bytes_in = input_len,
        bytes_out = written,
        "decompression finished"
    );
    println!(
        "{} -> {}: {} -> {}",
        input.display(),
        output.display(),
        format_size(input_len),
        format_size(written)
    );

    Ok(())
}
