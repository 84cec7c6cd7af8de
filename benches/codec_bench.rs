//! Performance benchmarks for the HAN wire path.
//!
//! Covers command encoding, reply line framing, reply parsing and reading
//! conversion.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hanbridge_core::{Address, Channel, HanCommand, Unit};
use hanbridge_protocol::{HanCodec, HanRequest, ResponseFrame, encode, readings};
use std::hint::black_box;
use tokio_util::codec::Decoder;

const GTMP_REPLY: &str = "RS0A120002140000";
const GRGC_REPLY: &str = "RS0A3300FFFE000001000000";

/// Benchmark encoding one read command for every command type.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    let address = Address::new(0x0A).unwrap();
    let channel = Channel::new(1).unwrap();

    for entry in hanbridge_core::COMMAND_MAP.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(entry.keyword),
            &entry.command,
            |b, &command| {
                b.iter(|| {
                    black_box(encode(command, address, channel, HanRequest::Read).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark parsing a reply line into a frame.
fn bench_parse_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_reply");
    group.throughput(Throughput::Elements(1));

    group.bench_function("gtmp", |b| {
        b.iter(|| black_box(ResponseFrame::parse(black_box(GTMP_REPLY)).unwrap()));
    });

    group.bench_function("grgc", |b| {
        b.iter(|| black_box(ResponseFrame::parse(black_box(GRGC_REPLY)).unwrap()));
    });

    group.finish();
}

/// Benchmark converting parsed parameters into a reading.
fn bench_readings(c: &mut Criterion) {
    let mut group = c.benchmark_group("readings");
    group.throughput(Throughput::Elements(1));

    let gtmp = ResponseFrame::parse(GTMP_REPLY).unwrap().unwrap();
    let grgc = ResponseFrame::parse(GRGC_REPLY).unwrap().unwrap();

    group.bench_function("gtmp_celsius", |b| {
        b.iter(|| {
            black_box(readings::decode(HanCommand::Gtmp, Unit::Celsius, gtmp.params()).unwrap());
        });
    });

    group.bench_function("grgc_inches", |b| {
        b.iter(|| {
            black_box(readings::decode(HanCommand::Grgc, Unit::Inches, grgc.params()).unwrap());
        });
    });

    group.finish();
}

/// Benchmark framing a batch of reply lines arriving in one read.
fn bench_decode_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));

        let mut encoded = BytesMut::new();
        for _ in 0..*batch_size {
            encoded.extend_from_slice(GTMP_REPLY.as_bytes());
            encoded.extend_from_slice(b"\r\n");
        }
        let encoded_bytes = encoded.freeze();

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, _| {
                b.iter(|| {
                    let mut codec = HanCodec::new();
                    let mut buffer = BytesMut::from(&encoded_bytes[..]);
                    let mut count = 0;

                    while let Ok(Some(_)) = codec.decode(&mut buffer) {
                        count += 1;
                    }

                    black_box(count);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a reply arriving in small chunks.
fn bench_decode_partial_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_partial_streaming");
    let line = format!("{GRGC_REPLY}\n");

    for chunk_size in [1, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("chunk_{chunk_size}_bytes")),
            chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut codec = HanCodec::new();
                    let mut buffer = BytesMut::new();
                    let mut decoded = None;

                    for chunk in line.as_bytes().chunks(size) {
                        buffer.extend_from_slice(chunk);
                        if let Ok(Some(l)) = codec.decode(&mut buffer) {
                            decoded = Some(l);
                        }
                    }

                    black_box(decoded);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_parse_reply,
    bench_readings,
    bench_decode_batch,
    bench_decode_partial_streaming,
);

criterion_main!(benches);
