//! Benchmarks for the IGT update step.
//!
//! Run with: cargo bench -p igt-optim-rs

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor, TensorId, Var};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use igt_optim_rs::{IgtConfig, MomentumIgt};

fn setup(size: usize, config: IgtConfig) -> (MomentumIgt, HashMap<TensorId, Tensor>) {
    let device = Device::Cpu;
    let w = Var::zeros((size, size), DType::F32, &device).unwrap();
    let grad = Tensor::randn(0.0f32, 1.0, (size, size), &device).unwrap();

    let mut grads = HashMap::new();
    grads.insert(w.id(), grad);
    (MomentumIgt::new(vec![w], config).unwrap(), grads)
}

fn step_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("igt_step");
    let variants = [
        ("plain", IgtConfig::new(0.01)),
        ("heavyball", IgtConfig::new(0.01).with_momentum(0.9)),
        (
            "nesterov",
            IgtConfig::new(0.01).with_momentum(0.9).with_nesterov(true),
        ),
    ];

    for (name, config) in variants {
        for size in [64, 256] {
            let (mut opt, grads) = setup(size, config);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| opt.step(black_box(&grads)).unwrap());
            });
        }
    }
    group.finish();
}

fn mode_switch_bench(c: &mut Criterion) {
    let (mut opt, grads) = setup(256, IgtConfig::new(0.01).with_momentum(0.9));
    opt.step(&grads).unwrap();

    c.bench_function("igt_eval_train_round_trip", |b| {
        b.iter(|| {
            opt.enter_evaluation().unwrap();
            opt.enter_training().unwrap();
        });
    });
}

criterion_group!(benches, step_bench, mode_switch_bench);
criterion_main!(benches);
