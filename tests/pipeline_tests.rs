use fluid_sim::cpu_ref::CpuExecutor;
use fluid_sim::field::FieldHandle;
use fluid_sim::input::ForceSignal;
use fluid_sim::kernel::{DensityPattern, Kernel};
use fluid_sim::params::{RenderMode, SimulationParameters, GRID_SPACE};
use fluid_sim::pipeline::{Pipeline, JACOBI_ITERATIONS};
use fluid_sim::Instrumented;
use glam::Vec2;
use proptest::prelude::*;

type Exec = Instrumented<CpuExecutor>;

fn params(diffuse: f32) -> SimulationParameters {
    SimulationParameters {
        grid_space: GRID_SPACE,
        time_step: 1.0,
        diffuse,
        force_rad: 4.0,
        force_intensity: 1.0,
        render_mode: RenderMode::Density,
    }
}

fn pipeline(width: u32, height: u32) -> (Exec, Pipeline<Exec>) {
    let mut exec = Instrumented::new(CpuExecutor::new());
    let pipeline = Pipeline::new(&mut exec, width, height, DensityPattern::Blob).unwrap();
    exec.take_records();
    (exec, pipeline)
}

fn drag() -> ForceSignal {
    ForceSignal::impulse(Vec2::new(8.0, 8.0), Vec2::new(2.0, -1.0))
}

fn projection() -> Vec<Kernel> {
    let mut passes = vec![Kernel::ProjectionStep1];
    passes.extend([Kernel::ProjectionStep2; JACOBI_ITERATIONS]);
    passes.push(Kernel::ProjectionStep3);
    passes
}

#[test]
fn test_full_step_pass_sequence() {
    let (mut exec, mut pipeline) = pipeline(16, 16);
    pipeline.step(&mut exec, &params(0.1), &drag()).unwrap();

    let mut expected = vec![Kernel::AddExternalForce];
    expected.extend([Kernel::DiffuseVelocity; JACOBI_ITERATIONS]);
    expected.extend(projection());
    expected.push(Kernel::AdvectVelocity);
    expected.extend(projection());
    expected.push(Kernel::AddDensitySource);
    expected.extend([Kernel::DiffuseDensity; JACOBI_ITERATIONS]);
    expected.push(Kernel::AdvectDensity);

    let actual: Vec<Kernel> = exec.records().iter().map(|r| r.kernel).collect();
    assert_eq!(actual, expected);
    assert_eq!(actual.len(), 48);
}

#[test]
fn test_jacobi_solves_run_ten_iterations() {
    let (mut exec, mut pipeline) = pipeline(16, 16);
    pipeline.step(&mut exec, &params(0.1), &drag()).unwrap();

    assert_eq!(exec.count(Kernel::DiffuseVelocity), 10);
    assert_eq!(exec.count(Kernel::DiffuseDensity), 10);
    // Two projections per step.
    assert_eq!(exec.count(Kernel::ProjectionStep2), 20);
    assert_eq!(exec.count(Kernel::ProjectionStep1), 2);
    assert_eq!(exec.count(Kernel::ProjectionStep3), 2);
}

#[test]
fn test_inactive_force_skips_force_pass() {
    let (mut exec, mut pipeline) = pipeline(16, 16);
    pipeline.step(&mut exec, &params(0.1), &ForceSignal::inactive()).unwrap();

    assert_eq!(exec.count(Kernel::AddExternalForce), 0);
    assert_eq!(exec.count(Kernel::AddDensitySource), 1, "source pass always runs");
}

#[test]
fn test_zero_diffuse_skips_diffusion() {
    let (mut exec, mut pipeline) = pipeline(16, 16);
    pipeline.step(&mut exec, &params(0.0), &drag()).unwrap();

    assert_eq!(exec.count(Kernel::DiffuseVelocity), 0);
    assert_eq!(exec.count(Kernel::DiffuseDensity), 0);
    assert_eq!(exec.count(Kernel::AdvectVelocity), 1);
    assert_eq!(exec.count(Kernel::AdvectDensity), 1);
    assert_eq!(exec.records().len(), 1 + 12 + 1 + 12 + 1 + 1);
}

#[test]
fn test_render_reads_selected_field() {
    let (mut exec, pipeline) = pipeline(16, 16);

    pipeline.render(&mut exec, &(), RenderMode::Velocity).unwrap();
    pipeline.render(&mut exec, &(), RenderMode::Density).unwrap();

    let records = exec.records();
    assert_eq!(records[0].kernel, Kernel::RenderVelocity);
    assert_eq!(records[0].inputs, vec![pipeline.velocity().id()]);
    assert_eq!(records[0].target, None);
    assert_eq!(records[1].kernel, Kernel::RenderDensity);
    assert_eq!(exec.inner().frame_size(), (16, 16));
}

#[test]
fn test_advect_density_uses_final_velocity() {
    let (mut exec, mut pipeline) = pipeline(16, 16);
    pipeline.step(&mut exec, &params(0.1), &drag()).unwrap();

    let velocity_id = pipeline.velocity().id();
    let last = exec.records().last().unwrap();
    assert_eq!(last.kernel, Kernel::AdvectDensity);
    assert_eq!(last.inputs[1], velocity_id);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_no_pass_reads_its_own_target(
        width in 2u32..20,
        height in 2u32..20,
        diffuse in 0.0f32..2.0,
        time_step in 0.01f32..4.0,
        active in any::<bool>(),
        cx in 0.0f32..20.0,
        cy in 0.0f32..20.0,
        dx in -5.0f32..5.0,
        dy in -5.0f32..5.0,
        steps in 1usize..3,
    ) {
        let (mut exec, mut pipeline) = pipeline(width, height);
        let mut p = params(diffuse);
        p.time_step = time_step;
        let force = ForceSignal { center: Vec2::new(cx, cy), direction: Vec2::new(dx, dy), active };

        for _ in 0..steps {
            pipeline.step(&mut exec, &p, &force).unwrap();
        }
        pipeline.render(&mut exec, &(), RenderMode::Density).unwrap();

        prop_assert!(!exec.records().is_empty());
        for record in exec.records() {
            prop_assert!(record.is_disjoint(), "{:?} read its own target", record.kernel);
        }
    }
}
