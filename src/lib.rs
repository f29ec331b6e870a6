pub mod capture;
pub mod cpu_ref;
pub mod error;
pub mod executor;
pub mod field;
pub mod frame;
pub mod gpu;
pub mod gpu_executor;
pub mod input;
pub mod kernel;
pub mod params;
pub mod pipeline;

pub use error::{FluidError, KernelError, PassError, Result};
pub use executor::{Input, Instrumented, PassExecutor, Target};
pub use frame::FrameDriver;
pub use pipeline::Pipeline;
