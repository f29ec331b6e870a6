//! Error types for the fluid simulator.
//!
//! - **FluidError**: top-level error returned by pipeline and executor setup
//! - **KernelError**: kernel program compilation and lookup failures
//! - **PassError**: binding violations detected when a pass is issued

use crate::field::{FieldId, FieldKind};
use crate::kernel::Output;
use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, FluidError>;

#[derive(Error, Debug)]
pub enum FluidError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("pass error: {0}")]
    Pass(#[from] PassError),

    #[error("invalid field size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("unsupported device: {0}")]
    Unsupported(String),

    #[error("gpu readback failed: {0}")]
    Readback(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Kernel programs are compiled once at startup; any failure here aborts it.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("kernel `{kernel}` failed to compile:\n{log}")]
    Compile { kernel: &'static str, log: String },

    #[error("kernel `{0}` is not loaded")]
    Missing(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PassError {
    #[error("kernel `{kernel}` is missing input `{name}`")]
    MissingInput { kernel: &'static str, name: &'static str },

    #[error("kernel `{kernel}` does not declare input `{name}`")]
    UnexpectedInput { kernel: &'static str, name: &'static str },

    #[error("kernel `{kernel}` received input `{name}` twice")]
    DuplicateInput { kernel: &'static str, name: &'static str },

    #[error("kernel `{kernel}` input `{name}` expects a {expected:?} field, got {found:?}")]
    InputKind {
        kernel: &'static str,
        name: &'static str,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("kernel `{kernel}` writes {expected:?}, but the target is {found:?}")]
    TargetMismatch {
        kernel: &'static str,
        expected: Output,
        found: Output,
    },

    #[error("kernel `{kernel}` reads and writes field {field:?} in the same pass")]
    Aliased { kernel: &'static str, field: FieldId },

    #[error("kernel `{kernel}` references unknown field {field:?}")]
    UnknownField { kernel: &'static str, field: FieldId },

    #[error("kernel `{kernel}` mixes fields of different sizes")]
    SizeMismatch { kernel: &'static str },

    #[error("kernel `{0}` is not loaded")]
    MissingKernel(&'static str),
}
