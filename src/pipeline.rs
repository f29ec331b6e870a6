//! Simulation step orchestration.
//!
//! The pipeline owns the three double buffers and issues every pass of a
//! step in a fixed order. Each stage runs its pass into the write buffer and
//! then swaps, so the next stage always reads the freshest field.

use crate::error::{FluidError, Result};
use crate::executor::{Input, PassExecutor, Target};
use crate::field::{DoubleBuffer, FieldKind};
use crate::input::ForceSignal;
use crate::kernel::{
    AdvectUniform, DensityPattern, DiffuseUniform, ForceUniform, InitDensityUniform, KernelParams,
    ProjectionUniform, RenderUniform, SourceUniform,
};
use crate::params::{RenderMode, SimulationParameters, DENSITY_RENDER_SCALE, VELOCITY_RENDER_SCALE};

/// Jacobi sweeps per diffusion solve and per pressure solve.
pub const JACOBI_ITERATIONS: usize = 10;

/// Peak dye added at the force center while the pointer is dragging.
pub const SOURCE_AMOUNT: f32 = 0.25;

struct Fields<F> {
    velocity: DoubleBuffer<F>,
    density: DoubleBuffer<F>,
    pressure: DoubleBuffer<F>,
}

impl<F> Fields<F> {
    fn create<E: PassExecutor<Field = F>>(exec: &mut E, width: u32, height: u32) -> Result<Self> {
        let kinds = [
            FieldKind::Velocity,
            FieldKind::Velocity,
            FieldKind::Density,
            FieldKind::Density,
            FieldKind::Pressure,
            FieldKind::Pressure,
        ];
        let mut created = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match exec.create_field(kind, width, height) {
                Ok(field) => created.push(field),
                Err(error) => {
                    for field in created {
                        exec.release_field(field);
                    }
                    return Err(error);
                }
            }
        }

        let mut created = created.into_iter();
        let mut next_pair = || match (created.next(), created.next()) {
            (Some(read), Some(write)) => Ok(DoubleBuffer::new(read, write)),
            _ => Err(FluidError::InvalidSize { width, height }),
        };
        Ok(Self {
            velocity: next_pair()?,
            density: next_pair()?,
            pressure: next_pair()?,
        })
    }

    fn release<E: PassExecutor<Field = F>>(self, exec: &mut E) {
        for buffer in [self.velocity, self.density, self.pressure] {
            let (read, write) = buffer.into_fields();
            exec.release_field(read);
            exec.release_field(write);
        }
    }
}

pub struct Pipeline<E: PassExecutor> {
    fields: Fields<E::Field>,
    width: u32,
    height: u32,
    pattern: DensityPattern,
}

impl<E: PassExecutor> Pipeline<E> {
    /// Allocates every field at `width` x `height` and initializes them.
    pub fn new(exec: &mut E, width: u32, height: u32, pattern: DensityPattern) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FluidError::InvalidSize { width, height });
        }
        let fields = Fields::create(exec, width, height)?;
        let mut pipeline = Self {
            fields,
            width,
            height,
            pattern,
        };
        pipeline.initialize(exec)?;
        log::info!("pipeline ready at {}x{} ({:?} density)", width, height, pattern);
        Ok(pipeline)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pattern(&self) -> DensityPattern {
        self.pattern
    }

    pub fn velocity(&self) -> &E::Field {
        self.fields.velocity.read()
    }

    pub fn density(&self) -> &E::Field {
        self.fields.density.read()
    }

    pub fn pressure(&self) -> &E::Field {
        self.fields.pressure.read()
    }

    /// Writes zero velocity and the initial density pattern into both halves
    /// of their double buffers.
    pub fn initialize(&mut self, exec: &mut E) -> Result<()> {
        let density_params = KernelParams::InitDensity(InitDensityUniform {
            pattern: self.pattern.code(),
            _padding: 0,
            size: [self.width as f32, self.height as f32],
        });
        for _ in 0..2 {
            let velocity = &mut self.fields.velocity;
            exec.run(&KernelParams::InitVelocity, Target::Field(velocity.write()), &[])?;
            velocity.swap();

            let density = &mut self.fields.density;
            exec.run(&density_params, Target::Field(density.write()), &[])?;
            density.swap();
        }
        Ok(())
    }

    pub fn reset(&mut self, exec: &mut E) -> Result<()> {
        log::info!("resetting fields");
        self.initialize(exec)
    }

    /// Recreates every field at the new size. All state is lost. A zero-area
    /// size is ignored and leaves the current fields untouched.
    pub fn resize(&mut self, exec: &mut E, width: u32, height: u32) -> Result<bool> {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {}x{}", width, height);
            return Ok(false);
        }
        let fields = Fields::create(exec, width, height)?;
        let old = std::mem::replace(&mut self.fields, fields);
        old.release(exec);
        self.width = width;
        self.height = height;
        self.initialize(exec)?;
        log::info!("resized fields to {}x{}", width, height);
        Ok(true)
    }

    /// Advances velocity and density by one time step.
    pub fn step(&mut self, exec: &mut E, params: &SimulationParameters, force: &ForceSignal) -> Result<()> {
        self.apply_force(exec, params, force)?;
        self.diffuse_velocity(exec, params)?;
        self.project(exec, params)?;
        self.advect_velocity(exec, params)?;
        self.project(exec, params)?;

        self.add_density_source(exec, params, force)?;
        self.diffuse_density(exec, params)?;
        self.advect_density(exec, params)?;
        Ok(())
    }

    pub fn apply_force(&mut self, exec: &mut E, params: &SimulationParameters, force: &ForceSignal) -> Result<()> {
        if !force.active {
            return Ok(());
        }
        let uniform = ForceUniform {
            center: force.center.to_array(),
            direction: force.direction.to_array(),
            radius: params.force_rad,
            intensity: params.force_intensity,
            time_step: params.time_step,
            _padding: 0.0,
        };
        let velocity = &mut self.fields.velocity;
        exec.run(
            &KernelParams::AddExternalForce(uniform),
            Target::Field(velocity.write()),
            &[Input::new("velocity", velocity.read())],
        )?;
        velocity.swap();
        Ok(())
    }

    pub fn diffuse_velocity(&mut self, exec: &mut E, params: &SimulationParameters) -> Result<()> {
        if params.diffuse <= 0.0 {
            return Ok(());
        }
        let uniform = diffuse_uniform(params);
        let velocity = &mut self.fields.velocity;
        for _ in 0..JACOBI_ITERATIONS {
            exec.run(
                &KernelParams::DiffuseVelocity(uniform),
                Target::Field(velocity.write()),
                &[Input::new("velocity", velocity.read())],
            )?;
            velocity.swap();
        }
        Ok(())
    }

    /// Removes the divergent part of the velocity field.
    pub fn project(&mut self, exec: &mut E, params: &SimulationParameters) -> Result<()> {
        let uniform = ProjectionUniform {
            grid_space: params.grid_space,
            _padding: [0.0; 3],
        };
        let Fields { velocity, pressure, .. } = &mut self.fields;

        exec.run(
            &KernelParams::ProjectionStep1(uniform),
            Target::Field(pressure.write()),
            &[Input::new("velocity", velocity.read())],
        )?;
        pressure.swap();

        for _ in 0..JACOBI_ITERATIONS {
            exec.run(
                &KernelParams::ProjectionStep2(uniform),
                Target::Field(pressure.write()),
                &[Input::new("pressure", pressure.read())],
            )?;
            pressure.swap();
        }

        exec.run(
            &KernelParams::ProjectionStep3(uniform),
            Target::Field(velocity.write()),
            &[
                Input::new("velocity", velocity.read()),
                Input::new("pressure", pressure.read()),
            ],
        )?;
        velocity.swap();
        Ok(())
    }

    pub fn advect_velocity(&mut self, exec: &mut E, params: &SimulationParameters) -> Result<()> {
        let velocity = &mut self.fields.velocity;
        exec.run(
            &KernelParams::AdvectVelocity(advect_uniform(params)),
            Target::Field(velocity.write()),
            &[Input::new("velocity", velocity.read())],
        )?;
        velocity.swap();
        Ok(())
    }

    /// Always issued; the amount is zero unless the force is active.
    pub fn add_density_source(
        &mut self,
        exec: &mut E,
        params: &SimulationParameters,
        force: &ForceSignal,
    ) -> Result<()> {
        let uniform = SourceUniform {
            center: force.center.to_array(),
            radius: params.force_rad,
            amount: if force.active { SOURCE_AMOUNT } else { 0.0 },
        };
        let density = &mut self.fields.density;
        exec.run(
            &KernelParams::AddDensitySource(uniform),
            Target::Field(density.write()),
            &[Input::new("density", density.read())],
        )?;
        density.swap();
        Ok(())
    }

    pub fn diffuse_density(&mut self, exec: &mut E, params: &SimulationParameters) -> Result<()> {
        if params.diffuse <= 0.0 {
            return Ok(());
        }
        let uniform = diffuse_uniform(params);
        let density = &mut self.fields.density;
        for _ in 0..JACOBI_ITERATIONS {
            exec.run(
                &KernelParams::DiffuseDensity(uniform),
                Target::Field(density.write()),
                &[Input::new("density", density.read())],
            )?;
            density.swap();
        }
        Ok(())
    }

    /// Carries dye along the final velocity of the step.
    pub fn advect_density(&mut self, exec: &mut E, params: &SimulationParameters) -> Result<()> {
        let Fields { velocity, density, .. } = &mut self.fields;
        exec.run(
            &KernelParams::AdvectDensity(advect_uniform(params)),
            Target::Field(density.write()),
            &[
                Input::new("density", density.read()),
                Input::new("velocity", velocity.read()),
            ],
        )?;
        density.swap();
        Ok(())
    }

    /// Draws the selected field onto `surface`.
    pub fn render(&self, exec: &mut E, surface: &E::Surface, mode: RenderMode) -> Result<()> {
        let (params, input) = match mode {
            RenderMode::Velocity => (
                KernelParams::RenderVelocity(render_uniform(VELOCITY_RENDER_SCALE)),
                Input::new("velocity", self.fields.velocity.read()),
            ),
            RenderMode::Density => (
                KernelParams::RenderDensity(render_uniform(DENSITY_RENDER_SCALE)),
                Input::new("density", self.fields.density.read()),
            ),
        };
        exec.run(&params, Target::Surface(surface), &[input])?;
        Ok(())
    }

    /// Hands every field back to the executor.
    pub fn release(self, exec: &mut E) {
        self.fields.release(exec);
    }
}

fn diffuse_uniform(params: &SimulationParameters) -> DiffuseUniform {
    DiffuseUniform {
        diffuse: params.diffuse,
        time_step: params.time_step,
        grid_space: params.grid_space,
        _padding: 0.0,
    }
}

fn advect_uniform(params: &SimulationParameters) -> AdvectUniform {
    AdvectUniform {
        time_step: params.time_step,
        grid_space: params.grid_space,
        _padding: [0.0; 2],
    }
}

fn render_uniform(scale: f32) -> RenderUniform {
    RenderUniform {
        scale,
        _padding: [0.0; 3],
    }
}
