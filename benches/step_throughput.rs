use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fluid_sim::cpu_ref::CpuExecutor;
use fluid_sim::input::ForceSignal;
use fluid_sim::kernel::DensityPattern;
use fluid_sim::params::Controls;
use fluid_sim::pipeline::Pipeline;
use glam::Vec2;

fn benchmark_reference_step(c: &mut Criterion) {
    let mut exec = CpuExecutor::new();
    let mut pipeline = Pipeline::new(&mut exec, 128, 128, DensityPattern::Blob).unwrap();
    let params = Controls::default().snapshot();
    let force = ForceSignal::impulse(Vec2::new(64.0, 64.0), Vec2::new(2.0, 1.0));

    c.bench_function("reference_step_128x128", |b| {
        b.iter(|| {
            pipeline.step(&mut exec, black_box(&params), black_box(&force)).unwrap();
        });
    });
}

criterion_group!(benches, benchmark_reference_step);
criterion_main!(benches);
