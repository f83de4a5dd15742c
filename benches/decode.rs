use criterion::{criterion_group, criterion_main, Criterion};
use gillstream::{classify, MrtEntryReader};
use std::hint::black_box;

const RECORD_COUNT: u32 = 10_000;

fn mrt_record(ts: u32, entry_type: u16, subtype: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend(ts.to_be_bytes());
    bytes.extend(entry_type.to_be_bytes());
    bytes.extend(subtype.to_be_bytes());
    bytes.extend((body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// BGP4MP MESSAGE_AS4 carrying an UPDATE that announces `10.x.y.0/24`.
fn update_record(ts: u32) -> Vec<u8> {
    let mut attrs = vec![0x40, 1, 1, 0];
    attrs.extend([0x40, 2, 14, 2, 3]);
    for asn in [65001u32, 3356, 13335] {
        attrs.extend(asn.to_be_bytes());
    }
    attrs.extend([0x40, 3, 4, 192, 0, 2, 1]);
    attrs.extend([0xc0, 8, 4, 0xfd, 0xe9, 0, 100]);

    let mut update = vec![];
    update.extend(0u16.to_be_bytes());
    update.extend((attrs.len() as u16).to_be_bytes());
    update.extend(attrs);
    update.extend([24, 10, (ts >> 8) as u8, ts as u8]);

    let mut message = vec![0xff; 16];
    message.extend((19 + update.len() as u16).to_be_bytes());
    message.push(2);
    message.extend(update);

    let mut body = vec![];
    body.extend(65001u32.to_be_bytes());
    body.extend(65000u32.to_be_bytes());
    body.extend(0u16.to_be_bytes());
    body.extend(1u16.to_be_bytes());
    body.extend([192, 0, 2, 1, 192, 0, 2, 2]);
    body.extend(message);
    mrt_record(ts, 16, 4, &body)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let updates: Vec<u8> = (0..RECORD_COUNT).flat_map(update_record).collect();
    println!("Required {} bytes to store updates", updates.len());

    c.bench_function("decode updates", |b| {
        b.iter(|| {
            let reader = black_box(&updates[..]);
            MrtEntryReader::new(reader).count()
        })
    });

    c.bench_function("decode and classify updates", |b| {
        b.iter(|| {
            let reader = black_box(&updates[..]);
            MrtEntryReader::new(reader)
                .filter_map(|entry| classify(&entry))
                .count()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
