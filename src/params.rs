//! Per-frame simulation parameters and the runtime controls they are read from.

/// Distance between neighbouring cells. Fixed for the lifetime of the program.
pub const GRID_SPACE: f32 = 1.0;

pub const DEFAULT_TIME_STEP: f32 = 1.0;
pub const DEFAULT_DIFFUSE: f32 = 0.05;
pub const DEFAULT_FORCE_RADIUS: f32 = 30.0;
pub const DEFAULT_FORCE_INTENSITY: f32 = 1.0;

/// Color scale applied to velocity components before mapping them to red/green.
pub const VELOCITY_RENDER_SCALE: f32 = 0.05;
pub const DENSITY_RENDER_SCALE: f32 = 1.0;

const TIME_STEP_RANGE: (f32, f32) = (0.01, 10.0);
const FORCE_RADIUS_RANGE: (f32, f32) = (1.0, 500.0);
const FORCE_INTENSITY_RANGE: (f32, f32) = (0.01, 100.0);
const DIFFUSE_RANGE: (f32, f32) = (0.0, 10.0);

const SCALE_FACTOR: f32 = 1.25;
const RADIUS_STEP: f32 = 5.0;
const DIFFUSE_STEP: f32 = 0.05;

/// Which field is drawn to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RenderMode {
    Velocity,
    #[default]
    Density,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Velocity => RenderMode::Density,
            RenderMode::Density => RenderMode::Velocity,
        }
    }
}

/// Snapshot taken once per frame; every pass of the step sees the same values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    pub grid_space: f32,
    pub time_step: f32,
    pub diffuse: f32,
    pub force_rad: f32,
    pub force_intensity: f32,
    pub render_mode: RenderMode,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Controls::default().snapshot()
    }
}

/// Adjustment requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ToggleRenderMode,
    IncreaseTimeStep,
    DecreaseTimeStep,
    IncreaseForceRadius,
    DecreaseForceRadius,
    IncreaseForceIntensity,
    DecreaseForceIntensity,
    IncreaseDiffuse,
    DecreaseDiffuse,
    /// Restore default controls; the driver also reinitializes the fields.
    Reset,
}

/// Live control values. Mutated between frames only.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub time_step: f32,
    pub diffuse: f32,
    pub force_rad: f32,
    pub force_intensity: f32,
    pub render_mode: RenderMode,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            diffuse: DEFAULT_DIFFUSE,
            force_rad: DEFAULT_FORCE_RADIUS,
            force_intensity: DEFAULT_FORCE_INTENSITY,
            render_mode: RenderMode::default(),
        }
    }
}

impl Controls {
    pub fn snapshot(&self) -> SimulationParameters {
        SimulationParameters {
            grid_space: GRID_SPACE,
            time_step: self.time_step,
            diffuse: self.diffuse,
            force_rad: self.force_rad,
            force_intensity: self.force_intensity,
            render_mode: self.render_mode,
        }
    }

    /// Applies one adjustment, clamped to its range. Returns whether anything changed.
    pub fn apply(&mut self, action: ControlAction) -> bool {
        let before = self.clone();
        match action {
            ControlAction::ToggleRenderMode => self.render_mode = self.render_mode.toggled(),
            ControlAction::IncreaseTimeStep => self.time_step = clamp(self.time_step * SCALE_FACTOR, TIME_STEP_RANGE),
            ControlAction::DecreaseTimeStep => self.time_step = clamp(self.time_step / SCALE_FACTOR, TIME_STEP_RANGE),
            ControlAction::IncreaseForceRadius => self.force_rad = clamp(self.force_rad + RADIUS_STEP, FORCE_RADIUS_RANGE),
            ControlAction::DecreaseForceRadius => self.force_rad = clamp(self.force_rad - RADIUS_STEP, FORCE_RADIUS_RANGE),
            ControlAction::IncreaseForceIntensity => {
                self.force_intensity = clamp(self.force_intensity * SCALE_FACTOR, FORCE_INTENSITY_RANGE)
            }
            ControlAction::DecreaseForceIntensity => {
                self.force_intensity = clamp(self.force_intensity / SCALE_FACTOR, FORCE_INTENSITY_RANGE)
            }
            ControlAction::IncreaseDiffuse => self.diffuse = clamp(self.diffuse + DIFFUSE_STEP, DIFFUSE_RANGE),
            ControlAction::DecreaseDiffuse => self.diffuse = clamp(self.diffuse - DIFFUSE_STEP, DIFFUSE_RANGE),
            ControlAction::Reset => *self = Controls::default(),
        }

        let changed = *self != before;
        if changed {
            log::info!(
                "controls: dt={:.3} diffuse={:.3} radius={:.1} intensity={:.3} mode={:?}",
                self.time_step,
                self.diffuse,
                self.force_rad,
                self.force_intensity,
                self.render_mode
            );
        }
        changed
    }
}

fn clamp(value: f32, (min, max): (f32, f32)) -> f32 {
    value.clamp(min, max)
}
