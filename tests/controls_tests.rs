use approx::assert_relative_eq;
use fluid_sim::cpu_ref::CpuExecutor;
use fluid_sim::kernel::{DensityPattern, Kernel};
use fluid_sim::params::{ControlAction, Controls, RenderMode, SimulationParameters, GRID_SPACE};
use fluid_sim::{FrameDriver, Instrumented};
use glam::Vec2;

#[test]
fn test_default_snapshot() {
    let params = SimulationParameters::default();
    assert_eq!(params.grid_space, GRID_SPACE);
    assert_eq!(params.time_step, 1.0);
    assert_eq!(params.force_rad, 30.0);
    assert_eq!(params.render_mode, RenderMode::Density);
}

#[test]
fn test_toggle_render_mode() {
    let mut controls = Controls::default();
    assert!(controls.apply(ControlAction::ToggleRenderMode));
    assert_eq!(controls.render_mode, RenderMode::Velocity);
    assert!(controls.apply(ControlAction::ToggleRenderMode));
    assert_eq!(controls.render_mode, RenderMode::Density);
}

#[test]
fn test_adjustments_scale_and_step() {
    let mut controls = Controls::default();
    controls.apply(ControlAction::IncreaseTimeStep);
    assert_relative_eq!(controls.time_step, 1.25);
    controls.apply(ControlAction::DecreaseTimeStep);
    assert_relative_eq!(controls.time_step, 1.0);

    controls.apply(ControlAction::IncreaseForceRadius);
    assert_relative_eq!(controls.force_rad, 35.0);

    controls.apply(ControlAction::DecreaseForceIntensity);
    assert_relative_eq!(controls.force_intensity, 0.8);

    controls.apply(ControlAction::IncreaseDiffuse);
    assert_relative_eq!(controls.diffuse, 0.1);
}

#[test]
fn test_adjustments_are_clamped() {
    let mut controls = Controls::default();
    for _ in 0..100 {
        controls.apply(ControlAction::DecreaseDiffuse);
        controls.apply(ControlAction::DecreaseForceRadius);
        controls.apply(ControlAction::IncreaseTimeStep);
    }
    assert_eq!(controls.diffuse, 0.0);
    assert_eq!(controls.force_rad, 1.0);
    assert_eq!(controls.time_step, 10.0);
    assert!(!controls.apply(ControlAction::DecreaseDiffuse), "no change at the bound");
}

#[test]
fn test_reset_restores_defaults() {
    let mut controls = Controls::default();
    controls.apply(ControlAction::IncreaseForceIntensity);
    controls.apply(ControlAction::ToggleRenderMode);
    assert!(controls.apply(ControlAction::Reset));
    assert_eq!(controls, Controls::default());
}

#[test]
fn test_snapshot_is_detached_from_controls() {
    let mut controls = Controls::default();
    let snapshot = controls.snapshot();
    controls.apply(ControlAction::IncreaseTimeStep);
    assert_eq!(snapshot.time_step, 1.0);
}

#[test]
fn test_frame_runs_one_step_and_one_render() {
    let mut exec = Instrumented::new(CpuExecutor::new());
    let mut driver = FrameDriver::new(&mut exec, 20, 20, DensityPattern::Blob, Controls::default()).unwrap();
    exec.take_records();

    driver.input_mut().pointer_moved(Vec2::new(5.0, 5.0));
    driver.input_mut().pointer_pressed(true);
    driver.input_mut().pointer_moved(Vec2::new(7.0, 5.0));

    let params = driver.frame(&mut exec, &()).unwrap();
    assert_eq!(params.render_mode, RenderMode::Density);
    assert_eq!(driver.frame_count(), 1);
    assert_eq!(exec.count(Kernel::AddExternalForce), 1);
    assert_eq!(exec.count(Kernel::RenderDensity), 1);
    assert_eq!(exec.count(Kernel::RenderVelocity), 0);
    assert_eq!(exec.records().last().map(|r| r.kernel), Some(Kernel::RenderDensity));

    exec.take_records();
    driver.frame(&mut exec, &()).unwrap();
    assert_eq!(exec.count(Kernel::AddExternalForce), 0, "held pointer without motion");
}

#[test]
fn test_driver_reset_reinitializes_fields() {
    let mut exec = Instrumented::new(CpuExecutor::new());
    let mut driver = FrameDriver::new(&mut exec, 16, 16, DensityPattern::Blob, Controls::default()).unwrap();
    driver.controls_mut().apply(ControlAction::ToggleRenderMode);
    exec.take_records();

    assert!(driver.apply(&mut exec, ControlAction::Reset).unwrap());
    assert_eq!(driver.controls(), &Controls::default());
    assert_eq!(exec.count(Kernel::InitVelocity), 2);
    assert_eq!(exec.count(Kernel::InitDensity), 2);
}
