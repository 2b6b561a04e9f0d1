//! Output image of the raycaster and its presentation on the screen target.
//!
//! The kernel writes into the frame texture, sized by the display-scaling
//! mode. Presenting blits the frame onto the screen texture with linear
//! filtering, which performs the up- or downscaling.

use crate::error::{RenderError, RenderResult};
use crate::program::{ProgramSource, FRAME_TO_SCREEN_FILE};

/// Format shared by the frame and screen textures.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl Target {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
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
}

/// Fullscreen blit from the frame texture to the screen texture.
struct BlitPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl BlitPass {
    fn new(device: &wgpu::Device, source: &ProgramSource) -> RenderResult<Self> {
        let wgsl = source.load(FRAME_TO_SCREEN_FILE)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame To Screen Bind Group Layout"),
            entries: &[
                // Rendered frame
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Frame To Screen Shader"),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Frame To Screen Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Frame To Screen Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::PipelineCreationFailed(err.to_string()));
        }

        // Linear filtering performs the rescale for multi-scaled frames.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame To Screen Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
        })
    }

    fn render(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        input_view: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame To Screen Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Frame To Screen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1); // Fullscreen triangle
    }
}

/// Frame texture written by the kernel and the screen texture it is
/// presented on.
pub struct FrameTarget {
    frame: Target,
    screen: Target,
    source: ProgramSource,
    blit: Option<BlitPass>,
}

impl FrameTarget {
    /// Creates a frame of `frame_size` presented on a screen of `screen_size`.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        source: ProgramSource,
        frame_size: (u32, u32),
        screen_size: (u32, u32),
    ) -> Self {
        Self {
            frame: Target::new(device, "Raycast Frame Texture", frame_size.0, frame_size.1),
            screen: Target::new(device, "Screen Texture", screen_size.0, screen_size.1),
            source,
            blit: None,
        }
    }

    /// Resizes the frame and screen textures. Returns whether the frame
    /// texture was recreated, which invalidates bind groups referencing it.
    pub fn reshape(
        &mut self,
        device: &wgpu::Device,
        frame_size: (u32, u32),
        screen_size: (u32, u32),
    ) -> bool {
        if (self.screen.width, self.screen.height) != screen_size {
            self.screen = Target::new(device, "Screen Texture", screen_size.0, screen_size.1);
        }
        if (self.frame.width, self.frame.height) == frame_size {
            return false;
        }
        log::debug!("reshaping frame to {}x{}", frame_size.0, frame_size.1);
        self.frame = Target::new(device, "Raycast Frame Texture", frame_size.0, frame_size.1);
        true
    }

    /// Records a clear of the frame texture to fully transparent.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Raycast Frame Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
    }

    /// Records the presentation of the frame on the screen texture.
    ///
    /// Builds the blit pipeline on first use.
    pub fn draw(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder) -> RenderResult<()> {
        if self.blit.is_none() {
            self.blit = Some(BlitPass::new(device, &self.source)?);
        }
        if let Some(blit) = &self.blit {
            blit.render(device, encoder, &self.frame.view, &self.screen.view);
        }
        Ok(())
    }

    /// Drops the cached blit pipeline so the next draw reloads its shader.
    pub fn clear_shaders(&mut self) {
        self.blit = None;
    }

    /// Changes where the blit shader is loaded from.
    pub fn set_source(&mut self, source: ProgramSource) {
        self.source = source;
        self.blit = None;
    }

    #[must_use]
    pub fn frame_view(&self) -> &wgpu::TextureView {
        &self.frame.view
    }

    #[must_use]
    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    #[must_use]
    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen.width, self.screen.height)
    }

    /// Reads the frame texture back as tightly packed RGBA8 rows.
    pub fn read_frame(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> RenderResult<Vec<u8>> {
        read_texture(device, queue, &self.frame)
    }

    /// Reads the screen texture back as tightly packed RGBA8 rows.
    pub fn read_screen(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> RenderResult<Vec<u8>> {
        read_texture(device, queue, &self.screen)
    }
}

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
#[must_use]
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let bytes_per_pixel = 4u32; // RGBA8
    let unaligned = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

fn read_texture(device: &wgpu::Device, queue: &wgpu::Queue, target: &Target) -> RenderResult<Vec<u8>> {
    let bytes_per_row = aligned_bytes_per_row(target.width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: u64::from(bytes_per_row) * u64::from(target.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback copy encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(target.height),
            },
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::wait_indefinitely());
    rx.recv()
        .map_err(|_| RenderError::BufferMapFailed)?
        .map_err(|_| RenderError::BufferMapFailed)?;

    // Copy data, removing row padding
    let data = buffer_slice.get_mapped_range();
    let row_bytes = (target.width * 4) as usize;
    let mut result = Vec::with_capacity(row_bytes * target.height as usize);
    for row in 0..target.height {
        let start = (row * bytes_per_row) as usize;
        result.extend_from_slice(&data[start..start + row_bytes]);
    }
    drop(data);
    buffer.unmap();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(1), 256);
    }
}
