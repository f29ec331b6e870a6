//! Per-frame driver: snapshot, step, render.

use crate::error::Result;
use crate::executor::PassExecutor;
use crate::input::InputTranslator;
use crate::kernel::DensityPattern;
use crate::params::{ControlAction, Controls, SimulationParameters};
use crate::pipeline::Pipeline;

/// Simulation context threaded through the event loop.
pub struct FrameDriver<E: PassExecutor> {
    pipeline: Pipeline<E>,
    input: InputTranslator,
    controls: Controls,
    frame_count: u64,
}

impl<E: PassExecutor> FrameDriver<E> {
    pub fn new(exec: &mut E, width: u32, height: u32, pattern: DensityPattern, controls: Controls) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::new(exec, width, height, pattern)?,
            input: InputTranslator::new(),
            controls,
            frame_count: 0,
        })
    }

    pub fn pipeline(&self) -> &Pipeline<E> {
        &self.pipeline
    }

    pub fn input_mut(&mut self) -> &mut InputTranslator {
        &mut self.input
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Applies a keyboard control. `Reset` also reinitializes the fields.
    pub fn apply(&mut self, exec: &mut E, action: ControlAction) -> Result<bool> {
        let changed = self.controls.apply(action);
        if action == ControlAction::Reset {
            self.pipeline.reset(exec)?;
            return Ok(true);
        }
        Ok(changed)
    }

    pub fn resize(&mut self, exec: &mut E, width: u32, height: u32) -> Result<bool> {
        self.pipeline.resize(exec, width, height)
    }

    /// Runs one frame: exactly one simulation step, then one render pass.
    pub fn frame(&mut self, exec: &mut E, surface: &E::Surface) -> Result<SimulationParameters> {
        let params = self.controls.snapshot();
        let force = self.input.poll();
        if force.active {
            log::trace!("force at {:?} dir {:?}", force.center, force.direction);
        }
        self.pipeline.step(exec, &params, &force)?;
        self.pipeline.render(exec, surface, params.render_mode)?;
        self.frame_count += 1;
        Ok(params)
    }

    pub fn release(self, exec: &mut E) {
        self.pipeline.release(exec);
    }
}
