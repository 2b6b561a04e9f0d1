//! Compute program management for the marching kernel.
//!
//! The kernel is assembled from two WGSL files: the shared declarations with
//! ray generation and box clipping, followed by the marching kernel itself.
//! Sources come either from the copies embedded at build time or from a
//! directory on disk, which allows editing the kernel while the host runs and
//! picking up the change with a reload.

use std::path::{Path, PathBuf};

use isoray_core::{DispatchExtent, FrameUniforms, GridUniforms};

use crate::error::{RenderError, RenderResult};

/// Shared declarations, ray generation and box clipping.
pub const PRELUDE_FILE: &str = "ray_bbox_intersection.wgsl";
/// Marching and shading kernel.
pub const KERNEL_FILE: &str = "raycast_iso.wgsl";
/// Fullscreen pass presenting the frame on the screen target.
pub const FRAME_TO_SCREEN_FILE: &str = "frame_to_screen.wgsl";
/// Kernel entry point.
pub const ENTRY_POINT: &str = "cs_main";

/// Where shader sources are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProgramSource {
    /// Sources compiled into the binary.
    #[default]
    Embedded,
    /// Sources read from this directory on every (re)load.
    Directory(PathBuf),
}

impl ProgramSource {
    /// Source from a directory.
    pub fn directory(path: impl AsRef<Path>) -> Self {
        Self::Directory(path.as_ref().to_path_buf())
    }

    /// Reads the WGSL source of `file`.
    pub fn load(&self, file: &str) -> RenderResult<String> {
        match self {
            Self::Embedded => embedded_source(file)
                .map(str::to_string)
                .ok_or_else(|| RenderError::ShaderSourceMissing(PathBuf::from(file))),
            Self::Directory(dir) => {
                let path = dir.join(file);
                if !path.is_file() {
                    return Err(RenderError::ShaderSourceMissing(path));
                }
                log::debug!("loading shader {}", path.display());
                Ok(std::fs::read_to_string(path)?)
            }
        }
    }
}

fn embedded_source(file: &str) -> Option<&'static str> {
    match file {
        PRELUDE_FILE => Some(include_str!("shaders/ray_bbox_intersection.wgsl")),
        KERNEL_FILE => Some(include_str!("shaders/raycast_iso.wgsl")),
        FRAME_TO_SCREEN_FILE => Some(include_str!("shaders/frame_to_screen.wgsl")),
        _ => None,
    }
}

/// Builder concatenating WGSL sources into one compute module.
#[derive(Debug, Clone, Default)]
pub struct ComputeShaderBuilder {
    sources: Vec<String>,
    label: Option<String>,
}

impl ComputeShaderBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a WGSL source. Later sources may use earlier declarations.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Sets the shader label for debugging.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The concatenated source.
    pub fn combined_source(&self) -> RenderResult<String> {
        if self.sources.is_empty() {
            return Err(RenderError::ShaderCompilationFailed(
                "no shader sources".into(),
            ));
        }
        Ok(self.sources.join("\n\n"))
    }

    /// Builds the shader module (does not create pipeline).
    pub fn build_module(&self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self.combined_source()?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }
}

/// The linked marching kernel with its bind group layout.
pub struct ComputeProgram {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    source: ProgramSource,
}

impl ComputeProgram {
    /// Compiles and links the kernel from `source`.
    ///
    /// Validation failures are captured and returned instead of reaching the
    /// device's uncaptured-error handler.
    pub fn new(device: &wgpu::Device, source: &ProgramSource) -> RenderResult<Self> {
        let builder = ComputeShaderBuilder::new()
            .with_label("isosurface raycast kernel")
            .with_source(source.load(PRELUDE_FILE)?)
            .with_source(source.load(KERNEL_FILE)?);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = builder.build_module(device);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilationFailed(err.to_string()));
        }
        let module = module?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = Self::create_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Isosurface Raycast Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Isosurface Raycast Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::PipelineCreationFailed(err.to_string()));
        }

        log::debug!("linked isosurface kernel from {source:?}");
        Ok(Self {
            pipeline,
            bind_group_layout,
            source: source.clone(),
        })
    }

    /// Rebuilds the kernel from `source`. Keeps the current program when the
    /// rebuild fails.
    pub fn reload(&mut self, device: &wgpu::Device, source: &ProgramSource) -> RenderResult<()> {
        *self = Self::new(device, source)?;
        Ok(())
    }

    #[must_use]
    pub fn source(&self) -> &ProgramSource {
        &self.source
    }

    #[must_use]
    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let volume_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D3,
                multisampled: false,
            },
            count: None,
        };
        let uniform = |binding, size: usize| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Isosurface Raycast Bind Group Layout"),
            entries: &[
                // Fixed grid uniforms
                uniform(0, std::mem::size_of::<GridUniforms>()),
                // Per-frame uniforms
                uniform(1, std::mem::size_of::<FrameUniforms>()),
                // Scalar field
                volume_texture(2),
                // Gradient field (placeholder when unbound)
                volume_texture(3),
                // Output image
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        })
    }

    /// Creates the bind group for one set of inputs and one output image.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        grid_buffer: &wgpu::Buffer,
        frame_buffer: &wgpu::Buffer,
        volume_view: &wgpu::TextureView,
        gradient_view: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
    ) -> RenderResult<wgpu::BindGroup> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Isosurface Raycast Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: grid_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(volume_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(gradient_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(output_view),
                },
            ],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::PipelineCreationFailed(err.to_string()));
        }
        Ok(bind_group)
    }

    /// Records one dispatch covering `extent`.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        extent: DispatchExtent,
    ) {
        let (groups_x, groups_y) = extent.workgroups();
        log::debug!(
            "dispatching {groups_x}x{groups_y} workgroups for {}x{} pixels",
            extent.width,
            extent.height
        );
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Isosurface Raycast Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(groups_x, groups_y, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_sources_present() {
        let source = ProgramSource::Embedded;
        let prelude = source.load(PRELUDE_FILE).unwrap();
        let kernel = source.load(KERNEL_FILE).unwrap();
        assert!(prelude.contains("struct FrameUniforms"));
        assert!(prelude.contains("fn clip_to_volume"));
        assert!(kernel.contains(&format!("fn {ENTRY_POINT}")));
        assert!(source.load(FRAME_TO_SCREEN_FILE).unwrap().contains("fs_main"));
    }

    #[test]
    fn test_unknown_embedded_file() {
        assert!(matches!(
            ProgramSource::Embedded.load("missing.wgsl"),
            Err(RenderError::ShaderSourceMissing(_))
        ));
    }

    #[test]
    fn test_directory_source() {
        let dir = std::env::temp_dir().join(format!("isoray_shaders_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(KERNEL_FILE), "// edited").unwrap();

        let source = ProgramSource::directory(&dir);
        assert_eq!(source.load(KERNEL_FILE).unwrap(), "// edited");
        assert!(matches!(
            source.load(PRELUDE_FILE),
            Err(RenderError::ShaderSourceMissing(p)) if p.ends_with(PRELUDE_FILE)
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builder_orders_sources() {
        let combined = ComputeShaderBuilder::new()
            .with_source("first")
            .with_source("second")
            .combined_source()
            .unwrap();
        assert!(combined.find("first").unwrap() < combined.find("second").unwrap());
        assert!(ComputeShaderBuilder::new().combined_source().is_err());
    }

    #[test]
    fn test_kernel_workgroup_size_matches_dispatch() {
        let kernel = ProgramSource::Embedded.load(KERNEL_FILE).unwrap();
        let size = isoray_core::WORKGROUP_SIZE;
        assert!(kernel.contains(&format!("@workgroup_size({size}, {size}, 1)")));
    }
}
