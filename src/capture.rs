//! Texture readback and PNG output.

use crate::error::{FluidError, Result};
use crate::gpu::GpuContext;
use std::path::Path;

/// Format of the offscreen target used for headless rendering.
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Row pitch a texture-to-buffer copy needs for `unpadded` bytes of data.
pub fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    ((unpadded + align - 1) / align) * align
}

/// Drops the alignment padding at the end of every row.
pub fn strip_row_padding(data: &[u8], unpadded: u32, padded: u32, height: u32) -> Vec<u8> {
    let mut rows = Vec::with_capacity((unpadded * height) as usize);
    for y in 0..height {
        let row_start = (y * padded) as usize;
        let row_end = row_start + unpadded as usize;
        rows.extend_from_slice(&data[row_start..row_end]);
    }
    rows
}

/// Copies a whole texture back to host memory, one tightly packed row after another.
pub fn read_texture(
    gpu: &GpuContext,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    bytes_per_texel: u32,
) -> Result<Vec<u8>> {
    let unpadded = width * bytes_per_texel;
    let padded = padded_bytes_per_row(unpadded);

    let staging_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(Some(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device.poll(wgpu::Maintain::Wait);

    pollster::block_on(rx)
        .map_err(|_| FluidError::Readback("map callback dropped".into()))?
        .map_err(|e| FluidError::Readback(e.to_string()))?;

    let data = buffer_slice.get_mapped_range();
    let rows = strip_row_padding(&data, unpadded, padded, height);
    drop(data);
    staging_buffer.unmap();

    Ok(rows)
}

/// Render target standing in for the window surface when running headless.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl OffscreenTarget {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// RGBA8 pixels of the last frame rendered into the target.
    pub fn capture(&self, gpu: &GpuContext) -> Result<Vec<u8>> {
        read_texture(gpu, &self.texture, self.width, self.height, 4)
    }
}

pub fn save_frame_as_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    image::save_buffer(path, data, width, height, image::ColorType::Rgba8)?;
    Ok(())
}
