//! Benchmarks for the LZ77 hash-chain matcher.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use zflate_core::CompressionLevel;
use zflate_deflate::lz77::{Lz77Encoder, Lz77Token};

fn generate_random(size: usize) -> Vec<u8> {
    // Simple LCG random number generator
    let mut data = Vec::with_capacity(size);
    let mut seed = 12345u32;
    for _ in 0..size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

fn generate_repeated(size: usize) -> Vec<u8> {
    let pattern = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    pattern.iter().copied().cycle().take(size).collect()
}

fn generate_text_like(size: usize) -> Vec<u8> {
    let words = [
        "the ", "quick ", "brown ", "fox ", "jumps ", "over ", "lazy ", "dog ", "and ", "runs ",
    ];
    let mut data = Vec::with_capacity(size + 8);
    let mut seed = 54321u32;
    while data.len() < size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.extend_from_slice(words[(seed >> 16) as usize % words.len()].as_bytes());
    }
    data.truncate(size);
    data
}

fn bench_tokenize(c: &mut Criterion) {
    let size = 256 * 1024;
    let inputs = [
        ("random", generate_random(size)),
        ("repeated", generate_repeated(size)),
        ("text", generate_text_like(size)),
    ];

    for (name, data) in &inputs {
        let mut group = c.benchmark_group(format!("lz77_{}", name));
        group.throughput(Throughput::Bytes(data.len() as u64));

        for level in [1u8, 4, 6, 9] {
            let level = CompressionLevel::try_new(level).unwrap();
            let id = BenchmarkId::from_parameter(level.level());
            group.bench_with_input(id, data, |b, data| {
                b.iter(|| {
                    let tokens = Lz77Encoder::compress_all(black_box(data), level);
                    black_box(tokens.len())
                });
            });
        }

        group.finish();
    }
}

fn bench_token_mix(c: &mut Criterion) {
    let data = generate_text_like(64 * 1024);
    let level = CompressionLevel::DEFAULT;
    let tokens = Lz77Encoder::compress_all(&data, level);
    let matches = tokens
        .iter()
        .filter(|t| matches!(t, Lz77Token::Match { .. }))
        .count();
    let mut group = c.benchmark_group("lz77_token_mix");
    group.throughput(Throughput::Elements(tokens.len() as u64));
    group.bench_function(format!("{}_matches_of_{}", matches, tokens.len()), |b| {
        b.iter(|| {
            let tokens = Lz77Encoder::compress_all(black_box(&data), level);
            black_box(tokens.len())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_token_mix);
criterion_main!(benches);
