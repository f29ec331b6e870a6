//! Kernel catalogue: the declared interface of every pass program.
//!
//! Each kernel is a fragment program evaluated once per output cell behind a
//! shared fullscreen vertex stage. Its interface is fixed here and mirrored
//! by the WGSL source in `shaders/`: binding 0 is the kernel's uniform block
//! (when it has one), bindings 1.. are its input fields in declaration order.

use crate::field::FieldKind;
use bytemuck::{Pod, Zeroable};

/// Vertex stage and sampling helpers prepended to every kernel source.
pub const COMMON_SOURCE: &str = include_str!("shaders/common.wgsl");
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kernel {
    InitVelocity,
    InitDensity,
    AddExternalForce,
    DiffuseVelocity,
    AdvectVelocity,
    ProjectionStep1,
    ProjectionStep2,
    ProjectionStep3,
    AddDensitySource,
    DiffuseDensity,
    AdvectDensity,
    RenderVelocity,
    RenderDensity,
}

/// Where a kernel writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Field(FieldKind),
    Surface,
}

/// One named input slot of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDecl {
    pub name: &'static str,
    pub kind: FieldKind,
}

const VELOCITY: InputDecl = InputDecl { name: "velocity", kind: FieldKind::Velocity };
const DENSITY: InputDecl = InputDecl { name: "density", kind: FieldKind::Density };
const PRESSURE: InputDecl = InputDecl { name: "pressure", kind: FieldKind::Pressure };

impl Kernel {
    pub const ALL: [Kernel; 13] = [
        Kernel::InitVelocity,
        Kernel::InitDensity,
        Kernel::AddExternalForce,
        Kernel::DiffuseVelocity,
        Kernel::AdvectVelocity,
        Kernel::ProjectionStep1,
        Kernel::ProjectionStep2,
        Kernel::ProjectionStep3,
        Kernel::AddDensitySource,
        Kernel::DiffuseDensity,
        Kernel::AdvectDensity,
        Kernel::RenderVelocity,
        Kernel::RenderDensity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::InitVelocity => "initialize-velocity",
            Kernel::InitDensity => "initialize-density",
            Kernel::AddExternalForce => "add-external-force",
            Kernel::DiffuseVelocity => "diffuse-velocity",
            Kernel::AdvectVelocity => "advect-velocity",
            Kernel::ProjectionStep1 => "projection-step-1",
            Kernel::ProjectionStep2 => "projection-step-2",
            Kernel::ProjectionStep3 => "projection-step-3",
            Kernel::AddDensitySource => "add-density-source",
            Kernel::DiffuseDensity => "diffuse-density",
            Kernel::AdvectDensity => "advect-density",
            Kernel::RenderVelocity => "render-velocity",
            Kernel::RenderDensity => "render-density",
        }
    }

    pub fn inputs(self) -> &'static [InputDecl] {
        match self {
            Kernel::InitVelocity | Kernel::InitDensity => &[],
            Kernel::AddExternalForce
            | Kernel::DiffuseVelocity
            | Kernel::AdvectVelocity
            | Kernel::ProjectionStep1
            | Kernel::RenderVelocity => &[VELOCITY],
            Kernel::ProjectionStep2 => &[PRESSURE],
            Kernel::ProjectionStep3 => &[VELOCITY, PRESSURE],
            Kernel::AddDensitySource | Kernel::DiffuseDensity | Kernel::RenderDensity => &[DENSITY],
            Kernel::AdvectDensity => &[DENSITY, VELOCITY],
        }
    }

    pub fn output(self) -> Output {
        match self {
            Kernel::InitVelocity
            | Kernel::AddExternalForce
            | Kernel::DiffuseVelocity
            | Kernel::AdvectVelocity
            | Kernel::ProjectionStep3 => Output::Field(FieldKind::Velocity),
            Kernel::InitDensity
            | Kernel::AddDensitySource
            | Kernel::DiffuseDensity
            | Kernel::AdvectDensity => Output::Field(FieldKind::Density),
            Kernel::ProjectionStep1 | Kernel::ProjectionStep2 => Output::Field(FieldKind::Pressure),
            Kernel::RenderVelocity | Kernel::RenderDensity => Output::Surface,
        }
    }

    /// Size in bytes of the kernel's uniform block; zero when it has none.
    pub fn uniform_size(self) -> usize {
        match self {
            Kernel::InitVelocity => 0,
            Kernel::InitDensity => std::mem::size_of::<InitDensityUniform>(),
            Kernel::AddExternalForce => std::mem::size_of::<ForceUniform>(),
            Kernel::DiffuseVelocity | Kernel::DiffuseDensity => std::mem::size_of::<DiffuseUniform>(),
            Kernel::AdvectVelocity | Kernel::AdvectDensity => std::mem::size_of::<AdvectUniform>(),
            Kernel::ProjectionStep1 | Kernel::ProjectionStep2 | Kernel::ProjectionStep3 => {
                std::mem::size_of::<ProjectionUniform>()
            }
            Kernel::AddDensitySource => std::mem::size_of::<SourceUniform>(),
            Kernel::RenderVelocity | Kernel::RenderDensity => std::mem::size_of::<RenderUniform>(),
        }
    }

    /// Fragment stage source, without the common prelude.
    pub fn source(self) -> &'static str {
        match self {
            Kernel::InitVelocity => include_str!("shaders/init_velocity.wgsl"),
            Kernel::InitDensity => include_str!("shaders/init_density.wgsl"),
            Kernel::AddExternalForce => include_str!("shaders/add_external_force.wgsl"),
            Kernel::DiffuseVelocity => include_str!("shaders/diffuse_velocity.wgsl"),
            Kernel::AdvectVelocity => include_str!("shaders/advect_velocity.wgsl"),
            Kernel::ProjectionStep1 => include_str!("shaders/projection_step_1.wgsl"),
            Kernel::ProjectionStep2 => include_str!("shaders/projection_step_2.wgsl"),
            Kernel::ProjectionStep3 => include_str!("shaders/projection_step_3.wgsl"),
            Kernel::AddDensitySource => include_str!("shaders/add_density_source.wgsl"),
            Kernel::DiffuseDensity => include_str!("shaders/diffuse_density.wgsl"),
            Kernel::AdvectDensity => include_str!("shaders/advect_density.wgsl"),
            Kernel::RenderVelocity => include_str!("shaders/render_velocity.wgsl"),
            Kernel::RenderDensity => include_str!("shaders/render_density.wgsl"),
        }
    }

    /// Complete WGSL module: common prelude followed by the kernel body.
    pub fn module_source(self) -> String {
        format!("{}\n{}", COMMON_SOURCE, self.source())
    }
}

/// Starting contents of the density field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DensityPattern {
    /// No dye anywhere.
    Empty,
    /// Soft disc of dye in the middle of the grid.
    #[default]
    Blob,
}

impl DensityPattern {
    pub fn code(self) -> u32 {
        match self {
            DensityPattern::Empty => 0,
            DensityPattern::Blob => 1,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InitDensityUniform {
    pub pattern: u32,
    pub _padding: u32,
    pub size: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ForceUniform {
    pub center: [f32; 2],
    pub direction: [f32; 2],
    pub radius: f32,
    pub intensity: f32,
    pub time_step: f32,
    pub _padding: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DiffuseUniform {
    pub diffuse: f32,
    pub time_step: f32,
    pub grid_space: f32,
    pub _padding: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AdvectUniform {
    pub time_step: f32,
    pub grid_space: f32,
    pub _padding: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ProjectionUniform {
    pub grid_space: f32,
    pub _padding: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SourceUniform {
    pub center: [f32; 2],
    pub radius: f32,
    pub amount: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderUniform {
    pub scale: f32,
    pub _padding: [f32; 3],
}

// Uniform blocks must match the WGSL struct layouts byte for byte.
const _: () = assert!(std::mem::size_of::<InitDensityUniform>() == 16);
const _: () = assert!(std::mem::size_of::<ForceUniform>() == 32);
const _: () = assert!(std::mem::size_of::<DiffuseUniform>() == 16);
const _: () = assert!(std::mem::size_of::<AdvectUniform>() == 16);
const _: () = assert!(std::mem::size_of::<ProjectionUniform>() == 16);
const _: () = assert!(std::mem::size_of::<SourceUniform>() == 16);
const _: () = assert!(std::mem::size_of::<RenderUniform>() == 16);

/// Typed parameters for one pass. The variant names the kernel it drives,
/// so a pass can never be issued with another kernel's uniform block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelParams {
    InitVelocity,
    InitDensity(InitDensityUniform),
    AddExternalForce(ForceUniform),
    DiffuseVelocity(DiffuseUniform),
    AdvectVelocity(AdvectUniform),
    ProjectionStep1(ProjectionUniform),
    ProjectionStep2(ProjectionUniform),
    ProjectionStep3(ProjectionUniform),
    AddDensitySource(SourceUniform),
    DiffuseDensity(DiffuseUniform),
    AdvectDensity(AdvectUniform),
    RenderVelocity(RenderUniform),
    RenderDensity(RenderUniform),
}

impl KernelParams {
    pub fn kernel(&self) -> Kernel {
        match self {
            KernelParams::InitVelocity => Kernel::InitVelocity,
            KernelParams::InitDensity(_) => Kernel::InitDensity,
            KernelParams::AddExternalForce(_) => Kernel::AddExternalForce,
            KernelParams::DiffuseVelocity(_) => Kernel::DiffuseVelocity,
            KernelParams::AdvectVelocity(_) => Kernel::AdvectVelocity,
            KernelParams::ProjectionStep1(_) => Kernel::ProjectionStep1,
            KernelParams::ProjectionStep2(_) => Kernel::ProjectionStep2,
            KernelParams::ProjectionStep3(_) => Kernel::ProjectionStep3,
            KernelParams::AddDensitySource(_) => Kernel::AddDensitySource,
            KernelParams::DiffuseDensity(_) => Kernel::DiffuseDensity,
            KernelParams::AdvectDensity(_) => Kernel::AdvectDensity,
            KernelParams::RenderVelocity(_) => Kernel::RenderVelocity,
            KernelParams::RenderDensity(_) => Kernel::RenderDensity,
        }
    }

    /// Raw bytes of the uniform block, exactly `kernel().uniform_size()` long.
    pub fn uniform_bytes(&self) -> &[u8] {
        match self {
            KernelParams::InitVelocity => &[],
            KernelParams::InitDensity(u) => bytemuck::bytes_of(u),
            KernelParams::AddExternalForce(u) => bytemuck::bytes_of(u),
            KernelParams::DiffuseVelocity(u) | KernelParams::DiffuseDensity(u) => bytemuck::bytes_of(u),
            KernelParams::AdvectVelocity(u) | KernelParams::AdvectDensity(u) => bytemuck::bytes_of(u),
            KernelParams::ProjectionStep1(u)
            | KernelParams::ProjectionStep2(u)
            | KernelParams::ProjectionStep3(u) => bytemuck::bytes_of(u),
            KernelParams::AddDensitySource(u) => bytemuck::bytes_of(u),
            KernelParams::RenderVelocity(u) | KernelParams::RenderDensity(u) => bytemuck::bytes_of(u),
        }
    }
}
