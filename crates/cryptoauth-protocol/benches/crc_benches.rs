//! Benchmarks for frame CRC and command building
//!
//! Run with: cargo bench --bench crc_benches

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use cryptoauth_protocol::{Command, CommandBuilder, DeviceFamily, crc16, verify_frame};
use std::hint::black_box;

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for len in [4usize, 35, 67, 189] {
        let data = vec![0xA5u8; len];
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| crc16(black_box(data)));
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut frame = vec![35u8];
    frame.extend_from_slice(&[0x5A; 32]);
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc);

    c.bench_function("verify_frame_35", |b| {
        b.iter(|| verify_frame(black_box(&frame)));
    });
}

fn bench_build(c: &mut Criterion) {
    let builder = CommandBuilder::new(DeviceFamily::Ecc608A.into());
    let signature_and_key = [0x11u8; 128];

    c.bench_function("build_verify_external", |b| {
        b.iter(|| {
            builder.build(
                Command::Verify,
                black_box(0x02),
                0x0004,
                black_box(&signature_and_key),
            )
        });
    });
}

criterion_group!(benches, bench_crc, bench_verify, bench_build);
criterion_main!(benches);
