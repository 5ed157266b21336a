use std::{
    hint::black_box,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use topicast::{FnSubscriber, Notifier, Subscriber, SubscriberError, WILDCARD};

fn counting(counter: &Arc<AtomicU64>) -> Arc<dyn Subscriber> {
    let counter = counter.clone();
    Arc::new(FnSubscriber::new("counter", move |_: &Value, _: &str| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok::<_, SubscriberError>(())
    }))
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify_fan_out");
    let payload = json!({"value": 23.5});

    for n in [1usize, 10, 100] {
        let counter = Arc::new(AtomicU64::new(0));
        let notifier: Notifier = Notifier::new();
        for _ in 0..n {
            notifier.register(counting(&counter), "temperature");
        }

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| notifier.notify(black_box(&payload), "temperature").unwrap())
        });
    }
    group.finish();
}

fn bench_wildcard_and_named(c: &mut Criterion) {
    let counter = Arc::new(AtomicU64::new(0));
    let notifier: Notifier = Notifier::new();
    for _ in 0..5 {
        notifier.register(counting(&counter), WILDCARD);
        notifier.register(counting(&counter), "humidity");
    }
    let payload = json!({"value": 61});

    c.bench_function("notify_wildcard_and_named", |b| {
        b.iter(|| notifier.notify(black_box(&payload), "humidity").unwrap())
    });
    c.bench_function("notify_unknown_topic", |b| {
        b.iter(|| notifier.notify(black_box(&payload), "pressure").unwrap())
    });
}

fn bench_register_unregister(c: &mut Criterion) {
    let counter = Arc::new(AtomicU64::new(0));
    let notifier: Notifier = Notifier::new();
    let subscriber = counting(&counter);

    c.bench_function("register_unregister", |b| {
        b.iter(|| {
            notifier.register(subscriber.clone(), ["temperature", "humidity"]);
            black_box(notifier.unregister(&subscriber, WILDCARD));
        })
    });
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_wildcard_and_named,
    bench_register_unregister
);
criterion_main!(benches);
