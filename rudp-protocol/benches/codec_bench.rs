use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rudp_protocol::{ChecksumEngine, ChecksumModel, LzfCodec};

fn sample_payload(len: usize) -> Vec<u8> {
    // Mildly compressible: short repeating phrases with a varying counter
    let mut data = Vec::with_capacity(len);
    let mut i = 0u32;
    while data.len() < len {
        data.extend_from_slice(format!("frame {} payload segment; ", i % 97).as_bytes());
        i += 1;
    }
    data.truncate(len);
    data
}

fn bench_checksum(c: &mut Criterion) {
    let data = sample_payload(1400);
    let mut group = c.benchmark_group("checksum");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for model in [
        ChecksumModel::CRC16_IBM_3740,
        ChecksumModel::CRC32,
        ChecksumModel::CRC64_XZ,
    ] {
        let engine = ChecksumEngine::new(model.clone()).unwrap();
        group.bench_function(model.name.as_ref(), |b| {
            b.iter(|| black_box(engine.generate(black_box(&data))));
        });
    }

    let engine = ChecksumEngine::new(ChecksumModel::CRC32).unwrap();
    group.bench_function("bitwise/CRC-32/ISO-HDLC", |b| {
        b.iter(|| black_box(engine.generate_bitwise(black_box(&data))));
    });

    group.finish();
}

fn bench_lzf(c: &mut Criterion) {
    let codec = LzfCodec::default();
    let mut group = c.benchmark_group("lzf");

    for size in [256usize, 1400, 16 * 1024] {
        let data = sample_payload(size);
        let compressed = codec.compress(&data).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("compress/{}", size), |b| {
            b.iter(|| black_box(codec.compress(black_box(&data)).unwrap()));
        });
        group.bench_function(format!("decompress/{}", size), |b| {
            b.iter(|| black_box(codec.decompress(black_box(&compressed)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_checksum, bench_lzf);
criterion_main!(benches);
