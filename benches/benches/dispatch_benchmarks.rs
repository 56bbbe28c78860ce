use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use framebus::{Agent, Bus, EventLoop, Window};
use serde_json::json;

/// Страница с Agent-ом и `frames` подписчиками на событие `tick`.
fn setup(frames: usize) -> (EventLoop, Agent, Vec<Bus>, Bus) {
    let el = EventLoop::new();
    let page = Window::new(&el, "https://host.bench");
    let agent = Agent::new(page.clone()).unwrap();

    let subscribers: Vec<Bus> = (0..frames)
        .map(|i| {
            let bus = Bus::new(page.create_frame(format!("https://f{i}.bench"))).unwrap();
            bus.on("tick", |payload| {
                black_box(payload);
            })
            .unwrap();
            bus
        })
        .collect();
    let publisher = Bus::new(page.create_frame("https://pub.bench")).unwrap();
    el.run_until_idle();

    (el, agent, subscribers, publisher)
}

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");
    for frames in [1usize, 8, 64] {
        let (el, _agent, _subs, publisher) = setup(frames);
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, _| {
            b.iter(|| {
                publisher.publish("tick", json!({"n": 1}));
                black_box(el.run_until_idle());
            })
        });
    }
    group.finish();
}

fn bench_agent_publish_no_subscribers(c: &mut Criterion) {
    let (el, agent, _subs, _publisher) = setup(0);
    c.bench_function("agent_publish_0_subs", |b| {
        b.iter(|| {
            agent.publish("nobody", json!(null));
            black_box(el.run_until_idle());
        })
    });
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let (el, agent, _subs, publisher) = setup(0);
    c.bench_function("subscribe_unsubscribe_cycle", |b| {
        b.iter(|| {
            let cb = publisher.on("cycle", |_| {}).unwrap();
            el.run_until_idle();
            publisher.detach("cycle", Some(&cb));
            publisher.unsubscribe("cycle");
            el.run_until_idle();
            black_box(agent.listener_count("cycle"));
        })
    });
}

criterion_group!(
    benches,
    bench_publish_fanout,
    bench_agent_publish_no_subscribers,
    bench_subscribe_unsubscribe
);
criterion_main!(benches);
