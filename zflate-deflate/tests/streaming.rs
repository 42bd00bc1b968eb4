//! Streaming behaviour: chunked input, sync flush and resumable decoding.

use zflate_core::{CompressionLevel, Compressor, Decompressor};
use zflate_deflate::zlib::{self, ZlibCompressor, ZlibDecompressor};
use zflate_deflate::{DeflateOptions, Deflater, Inflater, deflate, inflate};

fn corpus(size: usize) -> Vec<u8> {
    let words = [
        "stream ", "chunk ", "window ", "huffman ", "deflate ", "block ", "\n", "flush ",
    ];
    let mut seed = 42u32;
    let mut out = Vec::with_capacity(size + 16);
    while out.len() < size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        out.extend_from_slice(words[(seed >> 16) as usize % words.len()].as_bytes());
        if seed % 11 == 0 {
            out.extend_from_slice(&seed.to_le_bytes());
        }
    }
    out.truncate(size);
    out
}

fn level(level: u8) -> CompressionLevel {
    CompressionLevel::try_new(level).unwrap()
}

#[test]
fn test_chunked_compression_matches_one_shot() {
    let data = corpus(300_000);
    for lvl in [0u8, 1, 4, 6, 9] {
        let expected = deflate(&data, lvl).unwrap();
        for chunk in [1usize, 100, 4096, 65_536, 100_000] {
            let mut deflater = Deflater::new(level(lvl));
            let mut out = Vec::new();
            for piece in data.chunks(chunk) {
                out.extend(deflater.feed(piece).unwrap());
            }
            out.extend(deflater.finish().unwrap());
            assert!(out == expected, "level {} chunk {}", lvl, chunk);
        }
    }
}

#[test]
fn test_decoder_any_chunking() {
    let data = corpus(200_000);
    let compressed = deflate(&data, 6).unwrap();

    for chunk in [1usize, 2, 3, 17, 1000, 65_536] {
        let mut inflater = Inflater::new();
        let mut out = Vec::new();
        for piece in compressed.chunks(chunk) {
            out.extend(inflater.feed(piece).unwrap());
        }
        out.extend(inflater.finish().unwrap());
        assert!(out == data, "chunk {}", chunk);
    }
}

#[test]
fn test_sync_flush_prefix_decodes() {
    let first = corpus(50_000);
    let second = b"tail after the flush point".repeat(40);

    let mut deflater = Deflater::default();
    let mut stream = deflater.feed(&first).unwrap();
    stream.extend(deflater.flush().unwrap());

    // Everything before the flush decodes without further input.
    let mut inflater = Inflater::new();
    let prefix = inflater.feed(&stream).unwrap();
    assert_eq!(prefix, first);
    assert!(!inflater.is_finished());

    let rest = {
        let mut rest = deflater.feed(&second).unwrap();
        rest.extend(deflater.finish().unwrap());
        rest
    };
    let mut tail = inflater.feed(&rest).unwrap();
    tail.extend(inflater.finish().unwrap());
    assert_eq!(tail, second);

    stream.extend_from_slice(&rest);
    let mut expected = first.clone();
    expected.extend_from_slice(&second);
    assert_eq!(inflate(&stream).unwrap(), expected);
}

#[test]
fn test_repeated_flushes() {
    let mut deflater = Deflater::new(level(1));
    let mut stream = Vec::new();
    let mut expected = Vec::new();
    for i in 0..50u32 {
        let piece = format!("record {} ", i).into_bytes();
        stream.extend(deflater.feed(&piece).unwrap());
        stream.extend(deflater.flush().unwrap());
        expected.extend_from_slice(&piece);
    }
    // A flush with nothing pending still emits a marker.
    stream.extend(deflater.flush().unwrap());
    stream.extend(deflater.finish().unwrap());

    assert_eq!(inflate(&stream).unwrap(), expected);
}

#[test]
fn test_small_window_roundtrip() {
    let data = corpus(100_000);
    for bits in 9..=15u8 {
        let options = DeflateOptions::new(level(6)).with_window_bits(bits);
        let compressed = zflate_deflate::deflate_with_options(&data, options).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data, "window bits {}", bits);
    }
}

#[test]
fn test_zlib_streaming_matches_one_shot() {
    let data = corpus(120_000);
    let expected = zlib::compress(&data, 6).unwrap();

    let mut compressor = ZlibCompressor::new(level(6));
    let mut out = Vec::new();
    for piece in data.chunks(777) {
        out.extend(compressor.feed(piece).unwrap());
    }
    out.extend(compressor.finish().unwrap());
    assert_eq!(out, expected);

    let mut decompressor = ZlibDecompressor::new();
    let mut decoded = Vec::new();
    for piece in out.chunks(5) {
        decoded.extend(decompressor.feed(piece).unwrap());
    }
    decoded.extend(decompressor.finish().unwrap());
    assert_eq!(decoded, data);
    assert_eq!(decompressor.inflate_stats().bytes_out, data.len() as u64);
}

#[test]
fn test_trait_objects() {
    let data = corpus(10_000);
    let raw = deflate(&data, 6).unwrap();
    let wrapped = zlib::compress(&data, 6).unwrap();

    let cases: Vec<(Box<dyn Decompressor>, &[u8])> = vec![
        (Box::new(Inflater::new()), &raw),
        (Box::new(ZlibDecompressor::new()), &wrapped),
    ];
    for (mut decoder, input) in cases {
        assert_eq!(decoder.decompress_all(input).unwrap(), data);
        assert!(decoder.is_finished());
        decoder.reset();
        assert!(!decoder.is_finished());
    }

    let mut encoders: Vec<Box<dyn Compressor>> = vec![
        Box::new(Deflater::default()),
        Box::new(ZlibCompressor::new(CompressionLevel::DEFAULT)),
    ];
    let first = encoders[0].compress_all(&data).unwrap();
    assert_eq!(first, raw);
    let second = encoders[1].compress_all(&data).unwrap();
    assert_eq!(second, wrapped);
}
