//! Decode throughput on the receive hot path
//!
//! Each iteration refills a reused frame, identifies it and decodes it, which is the
//! work a listener thread does per datagram or sentence.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nav_codec::{CodecRegistry, RawBuffer, ReceivedFrame, WireFormat};
use nav_types::{BinaryMessageType, NavFields, SentenceId};

fn encoded(registry: &CodecRegistry, id: u32) -> Vec<u8> {
    let mut out = RawBuffer::with_capacity(256);
    registry
        .resolve(id)
        .encode(&NavFields::manual(), &mut out)
        .expect("standard codecs encode the manual vector");
    out.as_slice().to_vec()
}

fn bench_decode(c: &mut Criterion, name: &str, format: WireFormat, bytes: &[u8]) {
    let registry = CodecRegistry::standard();
    let mut frame = ReceivedFrame::new(format, 256);

    c.bench_function(name, |b| {
        b.iter(|| {
            frame.reset();
            frame.fill(black_box(bytes)).expect("fits");
            let update = match registry.identify(&mut frame) {
                Ok(id) => registry.resolve(id).decode(&mut frame),
                Err(_) => nav_types::NavUpdate::empty(),
            };
            black_box(update);
        });
    });
}

fn bench_binary(c: &mut Criterion) {
    let registry = CodecRegistry::standard();
    let position = encoded(&registry, BinaryMessageType::ComputedPosition.id());
    bench_decode(c, "decode_computed_position", WireFormat::Binary, &position);

    bench_decode(
        c,
        "decode_short_binary_frame",
        WireFormat::Binary,
        &position[..20],
    );
}

fn bench_sentences(c: &mut Criterion) {
    let registry = CodecRegistry::standard();
    let gga = encoded(&registry, SentenceId::GGA.id());
    bench_decode(c, "decode_gga_sentence", WireFormat::Nmea, &gga);

    let rmc = encoded(&registry, SentenceId::RMC.id());
    bench_decode(c, "decode_rmc_sentence", WireFormat::Nmea, &rmc);
}

fn bench_unknown(c: &mut Criterion) {
    let mut unknown = vec![0, 0, 0, 0x63, 0, 0, 0, 40];
    unknown.extend_from_slice(&[0xA5; 40]);
    bench_decode(c, "decode_unknown_type", WireFormat::Binary, &unknown);
}

criterion_group!(benches, bench_binary, bench_sentences, bench_unknown);
criterion_main!(benches);
