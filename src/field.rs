//! Field handles and the read/write double buffer.
//!
//! A field is one grid of per-cell samples at surface resolution. The
//! storage behind a handle belongs to whichever executor created it; the
//! pipeline only ever moves handles around.

/// Logical field stored in a buffer. Determines the channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Two components per cell.
    Velocity,
    /// One component per cell.
    Density,
    /// `x` = pressure, `y` = divergence.
    Pressure,
}

impl FieldKind {
    pub fn channels(self) -> u32 {
        match self {
            FieldKind::Velocity | FieldKind::Pressure => 2,
            FieldKind::Density => 1,
        }
    }

    /// Full 32-bit float storage; no compression or clamping.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            FieldKind::Velocity | FieldKind::Pressure => wgpu::TextureFormat::Rg32Float,
            FieldKind::Density => wgpu::TextureFormat::R32Float,
        }
    }

    pub fn bytes_per_cell(self) -> u32 {
        self.channels() * 4
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Velocity => "velocity",
            FieldKind::Density => "density",
            FieldKind::Pressure => "pressure",
        }
    }
}

/// Identity of one allocated field, unique within its executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

pub trait FieldHandle {
    fn id(&self) -> FieldId;
    fn kind(&self) -> FieldKind;
}

/// Two fields of the same kind with alternating read/write roles.
///
/// Passes sample `read` and render into `write`; `swap` then makes the fresh
/// result the next input. Swapping exchanges handles, never data.
#[derive(Debug, PartialEq, Eq)]
pub struct DoubleBuffer<F> {
    read: F,
    write: F,
}

impl<F> DoubleBuffer<F> {
    pub fn new(read: F, write: F) -> Self {
        Self { read, write }
    }

    pub fn read(&self) -> &F {
        &self.read
    }

    pub fn write(&self) -> &F {
        &self.write
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn into_fields(self) -> (F, F) {
        (self.read, self.write)
    }
}

impl<F: FieldHandle> DoubleBuffer<F> {
    pub fn kind(&self) -> FieldKind {
        self.read.kind()
    }
}
