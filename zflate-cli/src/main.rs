//! zflate CLI - DEFLATE and zlib file compression
//!
//! Streams files through the zflate codecs in 64 KiB chunks.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    CompressOptions, DecompressOptions, cmd_compress, cmd_decompress, cmd_info, cmd_test,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zflate")]
#[command(author, version, about = "Pure Rust DEFLATE/zlib compressor")]
#[command(long_about = "
zflate compresses and decompresses files in the zlib format (RFC 1950)
or, with --raw, as bare DEFLATE streams (RFC 1951).

Examples:
  zflate compress data.txt
  zflate compress data.txt -o data.zz -l 9
  zflate compress data.txt --raw --window-bits 12
  zflate decompress data.txt.zz
  zflate decompress huge.zz --max-output 1048576
  zflate test data.txt.zz
  zflate info data.txt.zz --json
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (default: input + .zz, or .deflate with --raw)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6)]
        #[arg(value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Write a raw DEFLATE stream without the zlib wrapper
        #[arg(long)]
        raw: bool,

        /// Base-2 logarithm of the match window
        #[arg(long, default_value_t = 15)]
        #[arg(value_parser = clap::value_parser!(u8).range(9..=15))]
        window_bits: u8,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (default: input without .zz/.deflate, or input + .out)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read a raw DEFLATE stream without the zlib wrapper
        #[arg(long)]
        raw: bool,

        /// Fail once the output would exceed this many bytes
        #[arg(long)]
        max_output: Option<usize>,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test stream integrity
    #[command(alias = "t")]
    Test {
        /// File to test
        input: PathBuf,

        /// Input is a raw DEFLATE stream
        #[arg(long)]
        raw: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Show information about a compressed stream
    #[command(alias = "i")]
    Info {
        /// File to inspect
        input: PathBuf,

        /// Input is a raw DEFLATE stream
        #[arg(long)]
        raw: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            raw,
            window_bits,
            progress,
        } => cmd_compress(
            &input,
            &CompressOptions {
                output: output.as_deref(),
                level,
                raw,
                window_bits,
                progress,
            },
        ),
        Commands::Decompress {
            input,
            output,
            raw,
            max_output,
            progress,
        } => cmd_decompress(
            &input,
            &DecompressOptions {
                output: output.as_deref(),
                raw,
                max_output,
                progress,
            },
        ),
        Commands::Test {
            input,
            raw,
            progress,
        } => cmd_test(&input, raw, progress),
        Commands::Info { input, raw, json } => cmd_info(&input, raw, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
