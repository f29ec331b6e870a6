//! wgpu-backed pass executor.
//!
//! Every kernel becomes a render pipeline: the shared fullscreen vertex stage
//! plus the kernel's fragment program, writing into a float texture (or the
//! presentation surface for the render kernels). Each pass is encoded and
//! submitted on its own, so queue order gives every pass its predecessor's
//! writes.

use crate::capture::read_texture;
use crate::error::{FluidError, KernelError, PassError};
use crate::executor::{find_input, validate_pass, Input, PassExecutor, Target};
use crate::field::{FieldHandle, FieldId, FieldKind};
use crate::gpu::GpuContext;
use crate::kernel::{Kernel, KernelParams, Output, FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT};
use glam::Vec2;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GpuField {
    id: FieldId,
    kind: FieldKind,
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuField {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl FieldHandle for GpuField {
    fn id(&self) -> FieldId {
        self.id
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// One compiled kernel: pipeline, bind group layout and its uniform block.
pub struct KernelProgram {
    pub kernel: Kernel,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: Option<wgpu::Buffer>,
}

impl KernelProgram {
    async fn compile(
        gpu: &GpuContext,
        kernel: Kernel,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, KernelError> {
        Self::compile_source(gpu, kernel, &kernel.module_source(), surface_format).await
    }

    /// Compiles `source` against `kernel`'s bind group layout and output.
    /// Validation errors come back as `KernelError::Compile` with the log.
    pub async fn compile_source(
        gpu: &GpuContext,
        kernel: Kernel,
        source: &str,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, KernelError> {
        let target_format = match kernel.output() {
            Output::Field(kind) => kind.texture_format(),
            Output::Surface => surface_format,
        };

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let bind_group_layout = Self::create_bind_group_layout(gpu, kernel);
        let pipeline = Self::create_pipeline(gpu, kernel, &shader, &bind_group_layout, target_format);

        if let Some(error) = gpu.device.pop_error_scope().await {
            return Err(KernelError::Compile {
                kernel: kernel.name(),
                log: error.to_string(),
            });
        }

        let uniform_buffer = (kernel.uniform_size() > 0).then(|| {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(kernel.name()),
                size: kernel.uniform_size() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        log::debug!("compiled kernel {} -> {:?}", kernel.name(), target_format);
        Ok(Self {
            kernel,
            pipeline,
            bind_group_layout,
            uniform_buffer,
        })
    }

    fn create_bind_group_layout(gpu: &GpuContext, kernel: Kernel) -> wgpu::BindGroupLayout {
        let mut entries = Vec::with_capacity(kernel.inputs().len() + 1);
        if kernel.uniform_size() > 0 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for slot in 0..kernel.inputs().len() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot as u32 + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(kernel.name()),
            entries: &entries,
        })
    }

    fn create_pipeline(
        gpu: &GpuContext,
        kernel: Kernel,
        shader: &wgpu::ShaderModule,
        bind_group_layout: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kernel.name()),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(kernel.name()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: VERTEX_ENTRY_POINT,
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: FRAGMENT_ENTRY_POINT,
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }
}

/// Every kernel compiled for one surface format.
pub struct KernelLibrary {
    programs: HashMap<Kernel, KernelProgram>,
}

impl KernelLibrary {
    /// Compiles all kernels. The first failure aborts with the compiler log.
    pub async fn compile(gpu: &GpuContext, surface_format: wgpu::TextureFormat) -> Result<Self, KernelError> {
        let mut programs = HashMap::with_capacity(Kernel::ALL.len());
        for kernel in Kernel::ALL {
            programs.insert(kernel, KernelProgram::compile(gpu, kernel, surface_format).await?);
        }
        log::info!("compiled {} kernels for {:?}", programs.len(), surface_format);
        Ok(Self { programs })
    }

    pub fn get(&self, kernel: Kernel) -> Result<&KernelProgram, KernelError> {
        self.programs.get(&kernel).ok_or(KernelError::Missing(kernel.name()))
    }
}

pub struct GpuExecutor {
    gpu: Arc<GpuContext>,
    library: KernelLibrary,
    next_id: u32,
}

impl GpuExecutor {
    /// Checks float render-target support, then compiles every kernel.
    pub async fn new(gpu: Arc<GpuContext>, surface_format: wgpu::TextureFormat) -> Result<Self, FluidError> {
        for kind in [FieldKind::Velocity, FieldKind::Density] {
            let format = kind.texture_format();
            if !gpu.supports_render_target(format) {
                return Err(FluidError::Unsupported(format!("{:?} is not renderable", format)));
            }
        }
        let library = KernelLibrary::compile(&gpu, surface_format).await?;
        Ok(Self {
            gpu,
            library,
            next_id: 0,
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Reads a field back to the host. Density fields fill `x` only.
    pub fn read_field(&self, field: &GpuField) -> Result<Vec<Vec2>, FluidError> {
        let bytes = read_texture(
            &self.gpu,
            &field.texture,
            field.width,
            field.height,
            field.kind.bytes_per_cell(),
        )?;
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let cells = match field.kind.channels() {
            1 => values.into_iter().map(|x| Vec2::new(x, 0.0)).collect(),
            _ => values.chunks_exact(2).map(|pair| Vec2::new(pair[0], pair[1])).collect(),
        };
        Ok(cells)
    }

    fn create_bind_group(
        &self,
        program: &KernelProgram,
        inputs: &[Input<'_, GpuField>],
    ) -> Result<wgpu::BindGroup, PassError> {
        let mut entries = Vec::with_capacity(inputs.len() + 1);
        if let Some(buffer) = &program.uniform_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            });
        }
        // Slots follow declaration order regardless of the order inputs were passed in.
        for (slot, decl) in program.kernel.inputs().iter().enumerate() {
            let field = find_input(program.kernel, inputs, decl.name)?;
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 + 1,
                resource: wgpu::BindingResource::TextureView(&field.view),
            });
        }

        Ok(self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.kernel.name()),
            layout: &program.bind_group_layout,
            entries: &entries,
        }))
    }
}

impl PassExecutor for GpuExecutor {
    type Field = GpuField;
    type Surface = wgpu::TextureView;

    fn create_field(&mut self, kind: FieldKind, width: u32, height: u32) -> Result<GpuField, FluidError> {
        let max = self.gpu.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(FluidError::InvalidSize { width, height });
        }
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(kind.label()),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: kind.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = FieldId(self.next_id);
        self.next_id += 1;
        Ok(GpuField {
            id,
            kind,
            width,
            height,
            texture,
            view,
        })
    }

    fn release_field(&mut self, field: GpuField) {
        field.texture.destroy();
    }

    fn run(
        &mut self,
        params: &KernelParams,
        target: Target<'_, GpuField, wgpu::TextureView>,
        inputs: &[Input<'_, GpuField>],
    ) -> Result<(), PassError> {
        let kernel = params.kernel();
        validate_pass(kernel, &target, inputs)?;

        let view = match target {
            Target::Field(field) => {
                let mismatched = inputs
                    .iter()
                    .any(|input| (input.field.width, input.field.height) != (field.width, field.height));
                if mismatched {
                    return Err(PassError::SizeMismatch { kernel: kernel.name() });
                }
                &field.view
            }
            Target::Surface(view) => view,
        };

        let program = self
            .library
            .get(kernel)
            .map_err(|_| PassError::MissingKernel(kernel.name()))?;
        if let Some(buffer) = &program.uniform_buffer {
            self.gpu.queue.write_buffer(buffer, 0, params.uniform_bytes());
        }
        let bind_group = self.create_bind_group(program, inputs)?;

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.name()),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(kernel.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.gpu.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
