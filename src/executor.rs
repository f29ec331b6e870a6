//! Pass execution seam.
//!
//! A pass binds one kernel, its named input fields and its typed parameters,
//! then evaluates the kernel once per cell of the target. The pipeline only
//! talks to this trait; `GpuExecutor` drives wgpu and `CpuExecutor` evaluates
//! the same formulas on the host for reference.

use crate::error::{FluidError, PassError};
use crate::field::{FieldHandle, FieldId, FieldKind};
use crate::kernel::{Kernel, KernelParams, Output};
use std::collections::BTreeMap;

/// Write destination of a pass.
pub enum Target<'a, F, S> {
    Field(&'a F),
    Surface(&'a S),
}

impl<F: FieldHandle, S> Target<'_, F, S> {
    pub fn output(&self) -> Output {
        match self {
            Target::Field(field) => Output::Field(field.kind()),
            Target::Surface(_) => Output::Surface,
        }
    }

    pub fn field_id(&self) -> Option<FieldId> {
        match self {
            Target::Field(field) => Some(field.id()),
            Target::Surface(_) => None,
        }
    }
}

/// A field bound to one of the kernel's declared input names.
pub struct Input<'a, F> {
    pub name: &'static str,
    pub field: &'a F,
}

impl<'a, F> Input<'a, F> {
    pub fn new(name: &'static str, field: &'a F) -> Self {
        Self { name, field }
    }
}

pub trait PassExecutor {
    type Field: FieldHandle;
    type Surface;

    fn create_field(&mut self, kind: FieldKind, width: u32, height: u32) -> Result<Self::Field, FluidError>;

    fn release_field(&mut self, field: Self::Field);

    /// Runs one full-surface evaluation. Only the target is modified.
    fn run(
        &mut self,
        params: &KernelParams,
        target: Target<'_, Self::Field, Self::Surface>,
        inputs: &[Input<'_, Self::Field>],
    ) -> Result<(), PassError>;
}

/// Checks a pass against the kernel's declared interface before anything is bound.
///
/// Every declared input must be supplied exactly once with the right field
/// kind, the target must match the declared output, and the target must not
/// also be bound as an input.
pub fn validate_pass<F: FieldHandle, S>(
    kernel: Kernel,
    target: &Target<'_, F, S>,
    inputs: &[Input<'_, F>],
) -> Result<(), PassError> {
    let name = kernel.name();
    let declared = kernel.inputs();

    for (index, input) in inputs.iter().enumerate() {
        let decl = declared
            .iter()
            .find(|decl| decl.name == input.name)
            .ok_or(PassError::UnexpectedInput { kernel: name, name: input.name })?;

        if inputs[..index].iter().any(|earlier| earlier.name == input.name) {
            return Err(PassError::DuplicateInput { kernel: name, name: input.name });
        }

        let found = input.field.kind();
        if found != decl.kind {
            return Err(PassError::InputKind {
                kernel: name,
                name: input.name,
                expected: decl.kind,
                found,
            });
        }
    }

    if let Some(missing) = declared.iter().find(|decl| !inputs.iter().any(|i| i.name == decl.name)) {
        return Err(PassError::MissingInput { kernel: name, name: missing.name });
    }

    let found = target.output();
    if found != kernel.output() {
        return Err(PassError::TargetMismatch { kernel: name, expected: kernel.output(), found });
    }

    if let Some(target_id) = target.field_id() {
        if inputs.iter().any(|input| input.field.id() == target_id) {
            return Err(PassError::Aliased { kernel: name, field: target_id });
        }
    }

    Ok(())
}

/// Looks up the field bound to a declared input name.
pub fn find_input<'a, F>(
    kernel: Kernel,
    inputs: &[Input<'a, F>],
    name: &'static str,
) -> Result<&'a F, PassError> {
    inputs
        .iter()
        .find(|input| input.name == name)
        .map(|input| input.field)
        .ok_or(PassError::MissingInput { kernel: kernel.name(), name })
}

/// What one pass bound, as seen by [`Instrumented`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub kernel: Kernel,
    /// `None` for passes that write the visible surface.
    pub target: Option<FieldId>,
    pub inputs: Vec<FieldId>,
}

impl PassRecord {
    pub fn is_disjoint(&self) -> bool {
        match self.target {
            Some(target) => !self.inputs.contains(&target),
            None => true,
        }
    }
}

/// Executor decorator that records every pass before delegating it.
pub struct Instrumented<E> {
    inner: E,
    records: Vec<PassRecord>,
}

impl<E> Instrumented<E> {
    pub fn new(inner: E) -> Self {
        Self { inner, records: Vec::new() }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    pub fn records(&self) -> &[PassRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<PassRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn count(&self, kernel: Kernel) -> usize {
        self.records.iter().filter(|record| record.kernel == kernel).count()
    }

    /// Pass counts per kernel since the last `take_records`.
    pub fn summary(&self) -> BTreeMap<Kernel, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kernel).or_insert(0) += 1;
        }
        counts
    }
}

impl<E: PassExecutor> PassExecutor for Instrumented<E> {
    type Field = E::Field;
    type Surface = E::Surface;

    fn create_field(&mut self, kind: FieldKind, width: u32, height: u32) -> Result<Self::Field, FluidError> {
        self.inner.create_field(kind, width, height)
    }

    fn release_field(&mut self, field: Self::Field) {
        self.inner.release_field(field);
    }

    fn run(
        &mut self,
        params: &KernelParams,
        target: Target<'_, Self::Field, Self::Surface>,
        inputs: &[Input<'_, Self::Field>],
    ) -> Result<(), PassError> {
        let record = PassRecord {
            kernel: params.kernel(),
            target: target.field_id(),
            inputs: inputs.iter().map(|input| input.field.id()).collect(),
        };
        log::trace!("pass {} -> {:?} <- {:?}", record.kernel.name(), record.target, record.inputs);
        self.records.push(record);
        self.inner.run(params, target, inputs)
    }
}
