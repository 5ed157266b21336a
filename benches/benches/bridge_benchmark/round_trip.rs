use std::hint::black_box;

use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;
use topicast::{
    transport::{FrameCodec, DEFAULT_MAX_FRAME_SIZE},
    Context, Frame, PayloadCodec, RemotePublisher, SubSocket,
};

fn bench_frame_codec(c: &mut Criterion) {
    let codec = FrameCodec::new(DEFAULT_MAX_FRAME_SIZE);
    let frame = Frame::new("sensors.temperature", r#"{"value":23.5}"#);
    let mut group = c.benchmark_group("frame_codec");
    group.throughput(Throughput::Bytes(frame.encoded_len() as u64));

    group.bench_function("encode", |b| {
        let mut buf = BytesMut::with_capacity(frame.encoded_len());
        b.iter(|| {
            buf.clear();
            codec.encode(black_box(&frame), &mut buf).unwrap();
        })
    });

    group.bench_function("decode", |b| {
        let mut encoded = BytesMut::new();
        codec.encode(&frame, &mut encoded).unwrap();
        let encoded = encoded.freeze();
        b.iter(|| {
            let mut buf = BytesMut::from(&encoded[..]);
            black_box(codec.decode(&mut buf).unwrap());
        })
    });
    group.finish();
}

fn bench_payload_codec(c: &mut Criterion) {
    let payload = json!({"sensor": "t-01", "value": 23.5, "tags": ["indoor", "north"]});
    for codec in [PayloadCodec::Json, PayloadCodec::MessagePack] {
        c.bench_function(&format!("payload_encode_{}", codec.name()), |b| {
            b.iter(|| black_box(codec.encode(black_box(&payload)).unwrap()))
        });
    }
}

/// Отправка и приём одного фрейма через inproc-сокеты.
fn bench_inproc_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let ctx = Context::new();
    let (publisher, mut sub) = rt.block_on(async {
        let publisher = RemotePublisher::bind(&ctx, "inproc://bench").await.unwrap();
        let sub = SubSocket::connect(&ctx, "inproc://bench").await.unwrap();
        sub.subscribe(b"sensors.");
        (publisher, sub)
    });
    let payload = json!({"value": 23.5});

    c.bench_function("inproc_round_trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                publisher.send(&payload, "sensors.temperature").unwrap();
                black_box(sub.recv().await.unwrap());
            })
        })
    });
}

/// То же через TCP на loopback.
fn bench_tcp_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let ctx = Context::new();
    let (publisher, mut sub) = rt.block_on(async {
        let publisher = RemotePublisher::bind(&ctx, "tcp://127.0.0.1:0").await.unwrap();
        let endpoint = publisher.local_endpoint().to_string();
        let sub = SubSocket::connect(&ctx, &endpoint).await.unwrap();
        sub.subscribe(b"");
        while publisher.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        (publisher, sub)
    });
    let payload = json!({"value": 23.5});

    c.bench_function("tcp_round_trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                publisher.send(&payload, "sensors.temperature").unwrap();
                black_box(sub.recv().await.unwrap());
            })
        })
    });
}

criterion_group!(
    benches,
    bench_frame_codec,
    bench_payload_codec,
    bench_inproc_round_trip,
    bench_tcp_round_trip
);
criterion_main!(benches);
