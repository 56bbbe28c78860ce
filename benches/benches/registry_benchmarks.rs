use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use framebus::{registry::CallbackRegistry, Callback, ExecutionBudget};

fn bench_register(c: &mut Criterion) {
    let registry = CallbackRegistry::new();
    let cb = Callback::new(|_| {});
    c.bench_function("callback_register_remove", |b| {
        b.iter(|| {
            registry.register(black_box("evt"), cb.clone(), ExecutionBudget::Any);
            black_box(registry.remove_all("evt"))
        })
    });
}

fn bench_take_due_unlimited(c: &mut Criterion) {
    let registry = CallbackRegistry::new();
    for _ in 0..16 {
        registry.register("evt", Callback::new(|_| {}), ExecutionBudget::Any);
    }
    c.bench_function("take_due_16_unlimited", |b| {
        b.iter(|| black_box(registry.take_due("evt")))
    });
}

fn bench_take_due_once(c: &mut Criterion) {
    let registry = CallbackRegistry::new();
    let cb = Callback::new(|_| {});
    c.bench_function("register_then_take_due_once", |b| {
        b.iter(|| {
            registry.register("evt", cb.clone(), ExecutionBudget::ONCE);
            black_box(registry.take_due("evt"))
        })
    });
}

fn bench_detach(c: &mut Criterion) {
    let registry = CallbackRegistry::new();
    let keep = Callback::new(|_| {});
    for _ in 0..8 {
        registry.register("evt", keep.clone(), ExecutionBudget::Any);
    }
    let cb = Callback::new(|_| {});
    c.bench_function("detach_one_of_9", |b| {
        b.iter(|| {
            registry.register("evt", cb.clone(), ExecutionBudget::Any);
            black_box(registry.detach("evt", &cb))
        })
    });
}

criterion_group!(
    benches,
    bench_register,
    bench_take_due_unlimited,
    bench_take_due_once,
    bench_detach
);
criterion_main!(benches);
