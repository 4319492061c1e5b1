//! Benchmarks for field boundary scanning.
//!
//! These measure scanner throughput across content shapes that stress
//! different paths:
//!
//! - **Unquoted**: plain fields, the pure hot loop + boundary cache
//! - **Quoted**: every other field quoted, exercising the prefix-XOR masking
//! - **Escaped**: backslash escapes sprinkled through the data
//! - **Wide fields**: few boundaries per block, dominated by block scans
//!
//! Sizes run from 64KB to 4MB to show scaling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use simdsv::{CsvOptions, FieldScanner};

/// Rows of short unquoted fields.
fn generate_unquoted(size: usize) -> Vec<u8> {
    let row = b"alpha,beta,gamma,delta,epsilon,zeta,eta,theta\n";
    let mut data = Vec::with_capacity(size + row.len());
    while data.len() < size {
        data.extend_from_slice(row);
    }
    data
}

/// Rows alternating quoted fields (with embedded separators) and plain ones.
fn generate_quoted(size: usize) -> Vec<u8> {
    let row = b"\"smith, john\",1234,\"portland, or\",5678,\"a \"\"quoted\"\" word\",tail\n";
    let mut data = Vec::with_capacity(size + row.len());
    while data.len() < size {
        data.extend_from_slice(row);
    }
    data
}

/// Rows with backslash escapes in most fields.
fn generate_escaped(size: usize) -> Vec<u8> {
    let row = b"a\\,b,c\\\\d,plain,\\\"quoted\\\",tail\n";
    let mut data = Vec::with_capacity(size + row.len());
    while data.len() < size {
        data.extend_from_slice(row);
    }
    data
}

/// Rows whose fields span multiple 64-byte blocks.
fn generate_wide(size: usize) -> Vec<u8> {
    let mut row = Vec::new();
    for i in 0..4u8 {
        row.extend(std::iter::repeat(b'a' + i).take(90));
        row.push(if i == 3 { b'\n' } else { b',' });
    }
    let mut data = Vec::with_capacity(size + row.len());
    while data.len() < size {
        data.extend_from_slice(&row);
    }
    data
}

fn count_fields(data: &[u8], options: &CsvOptions) -> usize {
    FieldScanner::new(data, options).count()
}

fn bench_field_scan(c: &mut Criterion) {
    let sizes = [64 * 1024, 1024 * 1024, 4 * 1024 * 1024];
    let shapes: [(&str, fn(usize) -> Vec<u8>, bool); 4] = [
        ("unquoted", generate_unquoted, false),
        ("quoted", generate_quoted, false),
        ("escaped", generate_escaped, true),
        ("wide_fields", generate_wide, false),
    ];

    let mut group = c.benchmark_group("field_scan");
    for size in sizes {
        for (name, generate, escape) in shapes {
            let data = generate(size);
            let options = CsvOptions::default().with_escape_backslash(escape);
            group.throughput(Throughput::Bytes(data.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &data, |b, data| {
                b.iter(|| count_fields(black_box(data), &options));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_field_scan);
criterion_main!(benches);
