//! Record unpacking and reference parsing benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench unpack
//! ```

#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use encstr_formats::record::{RECORD_HEADER_SIZE, RecordHeader, RecordUnpacker, TableRecord};
use encstr_formats::token::parse_tokens;
use std::hint::black_box;

/// Record of `chars` packed codes at `bits` width, none of them zero.
fn packed_record(bits: u8, chars: usize) -> TableRecord {
    let payload_len = (chars * bits as usize).div_ceil(8);
    let header = RecordHeader {
        total_size: (RECORD_HEADER_SIZE + payload_len) as u16,
        base_char: 0x41,
        bits_per_char: bits,
        flags: 0,
    };
    let mut raw = header.to_bytes().expect("header fits").to_vec();
    raw.extend(std::iter::repeat_n(0xFF, payload_len));
    TableRecord::from(raw)
}

fn bench_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");
    let unpacker = RecordUnpacker::new();

    for bits in [5u8, 7, 12] {
        let record = packed_record(bits, 64);
        group.bench_with_input(BenchmarkId::new("packed", bits), &record, |b, record| {
            b.iter(|| unpacker.unpack(black_box(record)));
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let tokens = [0x8101u16, 0x47D8, 0xB358, 0xFFE1, 0x4077];
    c.bench_function("parse_tokens", |b| {
        b.iter(|| parse_tokens(black_box(&tokens)));
    });
}

criterion_group!(benches, bench_unpack, bench_parse);
criterion_main!(benches);
