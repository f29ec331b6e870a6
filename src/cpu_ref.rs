//! Host-side reference executor.
//!
//! Evaluates every kernel with the same formulas as the WGSL sources so the
//! GPU pipeline has an oracle to be checked against, and so the pipeline's
//! pass sequencing can be exercised without an adapter.

use crate::error::{FluidError, PassError};
use crate::executor::{find_input, validate_pass, Input, PassExecutor, Target};
use crate::field::{FieldHandle, FieldId, FieldKind};
use crate::kernel::{Kernel, KernelParams};
use glam::Vec2;
use std::collections::HashMap;

/// Handle to a grid owned by a [`CpuExecutor`].
#[derive(Debug, PartialEq, Eq)]
pub struct CpuField {
    id: FieldId,
    kind: FieldKind,
}

impl FieldHandle for CpuField {
    fn id(&self) -> FieldId {
        self.id
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Row-major grid. Scalar fields keep their value in `x` and leave `y` at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<Vec2>,
}

impl CpuGrid {
    fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Vec2::ZERO; (width * height) as usize],
        }
    }

    pub fn at(&self, x: u32, y: u32) -> Vec2 {
        self.cells[(y * self.width + x) as usize]
    }

    fn load(&self, x: i32, y: i32) -> Vec2 {
        let x = x.clamp(0, self.width as i32 - 1);
        let y = y.clamp(0, self.height as i32 - 1);
        self.cells[(y as u32 * self.width + x as u32) as usize]
    }

    fn bilinear(&self, position: Vec2) -> Vec2 {
        let px = position.x.clamp(0.0, (self.width - 1) as f32);
        let py = position.y.clamp(0.0, (self.height - 1) as f32);
        let (bx, by) = (px.floor(), py.floor());
        let (fx, fy) = (px - bx, py - by);
        let (x, y) = (bx as i32, by as i32);
        let bottom = mix(self.load(x, y), self.load(x + 1, y), fx);
        let top = mix(self.load(x, y + 1), self.load(x + 1, y + 1), fx);
        mix(bottom, top, fy)
    }

    /// Sum of all cells.
    pub fn total(&self) -> Vec2 {
        self.cells.iter().copied().sum()
    }

    /// Sum of squared magnitudes, accumulated in f64.
    pub fn energy(&self) -> f64 {
        self.cells
            .iter()
            .map(|v| (v.x as f64).powi(2) + (v.y as f64).powi(2))
            .sum()
    }
}

// Same expression as WGSL `mix`, so both backends round alike.
fn mix(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a * (1.0 - t) + b * t
}

fn falloff(position: Vec2, center: Vec2, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let d = position - center;
    (1.0 - d.dot(d) / (radius * radius)).max(0.0)
}

fn scalar(value: f32) -> Vec2 {
    Vec2::new(value, 0.0)
}

#[derive(Default)]
pub struct CpuExecutor {
    grids: HashMap<FieldId, CpuGrid>,
    next_id: u32,
    frame: Vec<[f32; 4]>,
    frame_size: (u32, u32),
}

impl CpuExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self, field: &CpuField) -> Option<&CpuGrid> {
        self.grids.get(&field.id)
    }

    /// Number of fields currently allocated.
    pub fn live_fields(&self) -> usize {
        self.grids.len()
    }

    /// Colors written by the last render pass, row-major.
    pub fn frame(&self) -> &[[f32; 4]] {
        &self.frame
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn lookup(&self, kernel: Kernel, field: &CpuField) -> Result<&CpuGrid, PassError> {
        self.grids.get(&field.id).ok_or(PassError::UnknownField {
            kernel: kernel.name(),
            field: field.id,
        })
    }

    fn evaluate_field(
        &self,
        params: &KernelParams,
        inputs: &[Input<'_, CpuField>],
        width: u32,
        height: u32,
    ) -> Result<Vec<Vec2>, PassError> {
        let kernel = params.kernel();
        let input = |name| {
            find_input(kernel, inputs, name).and_then(|field| {
                let grid = self.lookup(kernel, field)?;
                if (grid.width, grid.height) != (width, height) {
                    return Err(PassError::SizeMismatch { kernel: kernel.name() });
                }
                Ok(grid)
            })
        };

        let mut cells = Vec::with_capacity((width * height) as usize);
        match params {
            KernelParams::InitVelocity => {
                cells.resize((width * height) as usize, Vec2::ZERO);
            }
            KernelParams::InitDensity(u) => {
                let size = Vec2::from(u.size);
                let radius = size.x.min(size.y) / 6.0;
                for_each_cell(width, height, |cell, _, _| {
                    let amount = if u.pattern == 0 { 0.0 } else { falloff(cell, size * 0.5, radius) };
                    cells.push(scalar(amount));
                });
            }
            KernelParams::AddExternalForce(u) => {
                let velocity = input("velocity")?;
                let (center, direction) = (Vec2::from(u.center), Vec2::from(u.direction));
                for_each_cell(width, height, |cell, x, y| {
                    let w = falloff(cell, center, u.radius);
                    cells.push(velocity.load(x, y) + direction * u.intensity * u.time_step * w);
                });
            }
            KernelParams::DiffuseVelocity(u) | KernelParams::DiffuseDensity(u) => {
                let field = if kernel == Kernel::DiffuseVelocity {
                    input("velocity")?
                } else {
                    input("density")?
                };
                let a = u.diffuse * u.time_step / (u.grid_space * u.grid_space);
                for_each_cell(width, height, |_, x, y| {
                    let neighbours = field.load(x - 1, y)
                        + field.load(x + 1, y)
                        + field.load(x, y - 1)
                        + field.load(x, y + 1);
                    cells.push((field.load(x, y) + a * neighbours) / (1.0 + 4.0 * a));
                });
            }
            KernelParams::AdvectVelocity(u) => {
                let velocity = input("velocity")?;
                for_each_cell(width, height, |cell, x, y| {
                    let origin = cell - u.time_step * velocity.load(x, y) / u.grid_space;
                    cells.push(velocity.bilinear(origin));
                });
            }
            KernelParams::AdvectDensity(u) => {
                let density = input("density")?;
                let velocity = input("velocity")?;
                for_each_cell(width, height, |cell, x, y| {
                    let origin = cell - u.time_step * velocity.load(x, y) / u.grid_space;
                    cells.push(scalar(density.bilinear(origin).x));
                });
            }
            KernelParams::ProjectionStep1(u) => {
                let velocity = input("velocity")?;
                for_each_cell(width, height, |_, x, y| {
                    let du = velocity.load(x + 1, y).x - velocity.load(x - 1, y).x;
                    let dv = velocity.load(x, y + 1).y - velocity.load(x, y - 1).y;
                    cells.push(Vec2::new(0.0, (du + dv) / (2.0 * u.grid_space)));
                });
            }
            KernelParams::ProjectionStep2(u) => {
                let pressure = input("pressure")?;
                let h2 = u.grid_space * u.grid_space;
                for_each_cell(width, height, |_, x, y| {
                    let divergence = pressure.load(x, y).y;
                    let sum = pressure.load(x - 1, y).x
                        + pressure.load(x + 1, y).x
                        + pressure.load(x, y - 1).x
                        + pressure.load(x, y + 1).x;
                    cells.push(Vec2::new((sum - h2 * divergence) * 0.25, divergence));
                });
            }
            KernelParams::ProjectionStep3(u) => {
                let velocity = input("velocity")?;
                let pressure = input("pressure")?;
                for_each_cell(width, height, |_, x, y| {
                    let gradient = Vec2::new(
                        pressure.load(x + 1, y).x - pressure.load(x - 1, y).x,
                        pressure.load(x, y + 1).x - pressure.load(x, y - 1).x,
                    ) / (2.0 * u.grid_space);
                    cells.push(velocity.load(x, y) - gradient);
                });
            }
            KernelParams::AddDensitySource(u) => {
                let density = input("density")?;
                let center = Vec2::from(u.center);
                for_each_cell(width, height, |cell, x, y| {
                    let w = falloff(cell, center, u.radius);
                    cells.push(scalar(density.load(x, y).x + u.amount * w));
                });
            }
            KernelParams::RenderVelocity(_) | KernelParams::RenderDensity(_) => {
                return Err(PassError::TargetMismatch {
                    kernel: kernel.name(),
                    expected: kernel.output(),
                    found: crate::kernel::Output::Field(FieldKind::Velocity),
                });
            }
        }
        Ok(cells)
    }

    fn evaluate_frame(
        &self,
        params: &KernelParams,
        inputs: &[Input<'_, CpuField>],
    ) -> Result<(Vec<[f32; 4]>, u32, u32), PassError> {
        let kernel = params.kernel();
        let (source, scale) = match params {
            KernelParams::RenderVelocity(u) => (find_input(kernel, inputs, "velocity")?, u.scale),
            KernelParams::RenderDensity(u) => (find_input(kernel, inputs, "density")?, u.scale),
            _ => {
                return Err(PassError::TargetMismatch {
                    kernel: kernel.name(),
                    expected: kernel.output(),
                    found: crate::kernel::Output::Surface,
                })
            }
        };
        let grid = self.lookup(kernel, source)?;
        let (width, height) = (grid.width, grid.height);

        let mut colors = Vec::with_capacity((width * height) as usize);
        for_each_cell(width, height, |_, x, y| {
            let value = grid.load(x, y);
            let color = if kernel == Kernel::RenderVelocity {
                let v = value * scale;
                let rg = (Vec2::splat(0.5) + 0.5 * v).clamp(Vec2::ZERO, Vec2::ONE);
                [rg.x, rg.y, 0.5, 1.0]
            } else {
                let d = (value.x * scale).clamp(0.0, 1.0);
                [d * 0.4, d * 0.7, d, 1.0]
            };
            colors.push(color);
        });
        Ok((colors, width, height))
    }
}

fn for_each_cell(width: u32, height: u32, mut f: impl FnMut(Vec2, i32, i32)) {
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            f(Vec2::new(x as f32, y as f32), x, y);
        }
    }
}

impl PassExecutor for CpuExecutor {
    type Field = CpuField;
    type Surface = ();

    fn create_field(&mut self, kind: FieldKind, width: u32, height: u32) -> Result<CpuField, FluidError> {
        if width == 0 || height == 0 {
            return Err(FluidError::InvalidSize { width, height });
        }
        let id = FieldId(self.next_id);
        self.next_id += 1;
        self.grids.insert(id, CpuGrid::zeroed(width, height));
        Ok(CpuField { id, kind })
    }

    fn release_field(&mut self, field: CpuField) {
        self.grids.remove(&field.id);
    }

    fn run(
        &mut self,
        params: &KernelParams,
        target: Target<'_, CpuField, ()>,
        inputs: &[Input<'_, CpuField>],
    ) -> Result<(), PassError> {
        let kernel = params.kernel();
        validate_pass(kernel, &target, inputs)?;

        match target {
            Target::Field(field) => {
                let (width, height) = {
                    let grid = self.lookup(kernel, field)?;
                    (grid.width, grid.height)
                };
                let cells = self.evaluate_field(params, inputs, width, height)?;
                if let Some(grid) = self.grids.get_mut(&field.id) {
                    grid.cells = cells;
                }
            }
            Target::Surface(()) => {
                let (colors, width, height) = self.evaluate_frame(params, inputs)?;
                self.frame = colors;
                self.frame_size = (width, height);
            }
        }
        Ok(())
    }
}
