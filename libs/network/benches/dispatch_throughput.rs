//! Dispatch Throughput Benchmarks
//!
//! Pool acquire, fill, dispatch and release for the frames a listener sees most: position
//! reports from UDP and sentences from serial.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nav_codec::{RawBuffer, WireFormat};
use nav_network::{Dispatcher, MessageSlotPool};
use nav_types::{BinaryMessageType, NavFields, RecordingSink, SentenceId};
use std::sync::Arc;

fn encoded(dispatcher: &Dispatcher, id: u32) -> Vec<u8> {
    let mut out = RawBuffer::with_capacity(256);
    dispatcher
        .registry()
        .resolve(id)
        .encode(&NavFields::manual(), &mut out)
        .expect("manual fields encode");
    out.as_slice().to_vec()
}

fn bench_pooled_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::with_standard_codecs();
    dispatcher.add_sink(Arc::new(RecordingSink::new()));

    let mut group = c.benchmark_group("pooled_dispatch");
    group.throughput(Throughput::Elements(1));

    let position = encoded(&dispatcher, BinaryMessageType::ComputedPosition.id());
    let mut binary_pool = MessageSlotPool::new("bench-udp", WireFormat::Binary, 32, 1500);
    group.bench_function("computed_position", |b| {
        b.iter(|| {
            let mut lease = binary_pool.acquire();
            let frame = binary_pool.frame_mut(&mut lease);
            frame.fill(black_box(&position)).expect("fits");
            black_box(dispatcher.dispatch(frame));
            binary_pool.release(lease);
        })
    });

    let rmc = encoded(&dispatcher, SentenceId::RMC.id());
    let mut sentence_pool = MessageSlotPool::new("bench-serial", WireFormat::Nmea, 10, 128);
    group.bench_function("rmc_sentence", |b| {
        b.iter(|| {
            let mut lease = sentence_pool.acquire();
            let frame = sentence_pool.frame_mut(&mut lease);
            frame.fill(black_box(&rmc)).expect("fits");
            black_box(dispatcher.dispatch(frame));
            sentence_pool.release(lease);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_pooled_dispatch);
criterion_main!(benches);
