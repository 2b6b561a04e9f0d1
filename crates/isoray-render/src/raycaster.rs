//! GPU single-pass isosurface raycaster.

use std::sync::Arc;

use isoray_core::{
    CameraState, DispatchExtent, FrameConfig, GradientField, GridDataType, GridUniforms,
    IsorayError, RenderSettings, RendererState, Result, VolumeGrid, VolumeRenderer, VolumeSource,
};
use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::frame_target::FrameTarget;
use crate::program::{ComputeProgram, ProgramSource};
use crate::volume_texture::VolumeTextures;

/// Everything allocated by `initialize` and released by `clean`.
struct BuiltResources {
    volume: Arc<VolumeGrid>,
    gradient: Option<Arc<GradientField>>,
    textures: VolumeTextures,
    program: ComputeProgram,
    grid_buffer: wgpu::Buffer,
    frame_buffer: wgpu::Buffer,
    target: FrameTarget,
    /// Dropped whenever a bound resource is replaced.
    bind_group: Option<wgpu::BindGroup>,
}

impl BuiltResources {
    fn ensure_bind_group(&mut self, device: &wgpu::Device) -> RenderResult<()> {
        if self.bind_group.is_none() {
            self.bind_group = Some(self.program.create_bind_group(
                device,
                &self.grid_buffer,
                &self.frame_buffer,
                self.textures.volume_view(),
                self.textures.gradient_view(),
                self.target.frame_view(),
            )?);
        }
        Ok(())
    }

    /// Binds or unbinds the gradient texture to match the shading flag.
    /// Returns whether the binding changed.
    fn sync_gradient(&mut self, ctx: &GpuContext, wanted: bool) -> RenderResult<bool> {
        let wanted = wanted && self.gradient.is_some();
        if wanted == self.textures.has_gradient() {
            return Ok(false);
        }
        match (&self.gradient, wanted) {
            (Some(gradient), true) => {
                self.textures.bind_gradient(&ctx.device, &ctx.queue, gradient)?;
                log::debug!("gradient texture bound");
            }
            _ => {
                self.textures.unbind_gradient();
                log::debug!("gradient texture unbound");
            }
        }
        self.bind_group = None;
        Ok(true)
    }
}

/// Marches primary rays through a structured volume in one compute dispatch
/// per frame and shades the first isosurface crossing.
pub struct IsoRaycaster {
    ctx: GpuContext,
    source: ProgramSource,
    state: RendererState,
    built: Option<BuiltResources>,
}

impl IsoRaycaster {
    /// Creates an uninitialized raycaster using the embedded kernel.
    #[must_use]
    pub fn new(ctx: GpuContext) -> Self {
        Self::with_program_source(ctx, ProgramSource::Embedded)
    }

    /// Creates an uninitialized raycaster loading its shaders from `source`.
    #[must_use]
    pub fn with_program_source(ctx: GpuContext, source: ProgramSource) -> Self {
        Self {
            ctx,
            source,
            state: RendererState::new(),
            built: None,
        }
    }

    #[must_use]
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    #[must_use]
    pub fn program_source(&self) -> &ProgramSource {
        &self.source
    }

    /// Changes where shaders are loaded from. Takes effect at the next
    /// `initialize` or `reload_program`.
    pub fn set_program_source(&mut self, source: ProgramSource) {
        if let Some(built) = &mut self.built {
            built.target.set_source(source.clone());
        }
        self.source = source;
    }

    /// The volume uploaded by the last successful `initialize`.
    #[must_use]
    pub fn volume(&self) -> Option<&VolumeGrid> {
        self.built.as_ref().map(|b| b.volume.as_ref())
    }

    /// Whether a gradient texture is currently bound.
    #[must_use]
    pub fn gradient_bound(&self) -> bool {
        self.built.as_ref().is_some_and(|b| b.textures.has_gradient())
    }

    /// Reads the rendered frame back as RGBA8 at its rendered resolution.
    pub fn read_frame(&self) -> Result<Vec<u8>> {
        let built = self.built.as_ref().ok_or(IsorayError::NotBuilt)?;
        Ok(built.target.read_frame(&self.ctx.device, &self.ctx.queue)?)
    }

    /// Reads the presented screen image back as RGBA8.
    pub fn read_screen(&self) -> Result<Vec<u8>> {
        let built = self.built.as_ref().ok_or(IsorayError::NotBuilt)?;
        Ok(built.target.read_screen(&self.ctx.device, &self.ctx.queue)?)
    }

    /// Size of the presented screen image.
    #[must_use]
    pub fn screen_size(&self) -> (u32, u32) {
        self.built
            .as_ref()
            .map_or((0, 0), |b| b.target.screen_size())
    }

    fn build(
        &self,
        volume: Arc<VolumeGrid>,
        gradient: Option<Arc<GradientField>>,
        width: u32,
        height: u32,
    ) -> RenderResult<BuiltResources> {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;

        let program = ComputeProgram::new(device, &self.source)?;
        let textures = VolumeTextures::upload(device, queue, &volume)?;

        let grid_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Uniform Buffer"),
            contents: bytemuck::bytes_of(&GridUniforms::from_grid(&volume)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<isoray_core::FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let target = FrameTarget::new(device, self.source.clone(), (width, height), (width, height));

        let mut built = BuiltResources {
            volume,
            gradient,
            textures,
            program,
            grid_buffer,
            frame_buffer,
            target,
            bind_group: None,
        };
        built.sync_gradient(&self.ctx, self.state.parameters().gradient_shading)?;
        Ok(built)
    }
}

impl VolumeRenderer for IsoRaycaster {
    fn name(&self) -> &'static str {
        "1-Pass - Isosurface Raycaster"
    }

    fn abbreviation(&self) -> &'static str {
        "iso"
    }

    fn data_type_support(&self) -> GridDataType {
        GridDataType::Structured
    }

    fn supports_pixel_multiscaling(&self) -> bool {
        true
    }

    fn state(&self) -> &RendererState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RendererState {
        &mut self.state
    }

    fn initialize(&mut self, source: &dyn VolumeSource, width: u32, height: u32) -> Result<()> {
        if self.state.is_built() {
            self.clean();
        }
        let volume = source.scalar_field().ok_or_else(|| {
            log::warn!("{}: no volume data to initialize from", self.abbreviation());
            IsorayError::NoVolumeData
        })?;
        if width == 0 || height == 0 {
            return Err(IsorayError::InvalidResolution(width, height, 1));
        }

        let res = volume.resolution();
        log::info!(
            "{}: initializing for {}x{}x{} grid, voxel size {:?}, extent {:?}",
            self.abbreviation(),
            res.x,
            res.y,
            res.z,
            volume.voxel_size(),
            volume.extent()
        );

        let built = self
            .build(volume, source.gradient_field(), width, height)
            .map_err(|err| {
                log::error!("{}: initialization failed: {err}", self.abbreviation());
                IsorayError::from(err)
            })?;
        if self.state.parameters().gradient_shading && source.gradient_field().is_none() {
            log::warn!(
                "{}: gradient shading enabled but the source has no gradient field, shading flat",
                self.abbreviation()
            );
        }
        self.built = Some(built);
        self.state.mark_built();
        Ok(())
    }

    fn clean(&mut self) {
        if self.built.take().is_some() {
            log::info!("{}: releasing resources", self.abbreviation());
        }
        self.state.mark_torn_down();
    }

    fn reload_program(&mut self) -> Result<()> {
        self.state.require_built()?;
        let built = self.built.as_mut().ok_or(IsorayError::NotBuilt)?;
        match built.program.reload(&self.ctx.device, &self.source) {
            Ok(()) => {
                built.target.clear_shaders();
                built.bind_group = None;
                self.state.mark_outdated();
                log::info!("iso: program reloaded");
                Ok(())
            }
            Err(err) => {
                log::error!("iso: program reload failed: {err}");
                self.clean();
                Err(err.into())
            }
        }
    }

    fn update_frame(&mut self, camera: &CameraState, settings: &RenderSettings) -> Result<()> {
        self.state.require_built()?;
        let (width, height) = settings.render_size(self.supports_pixel_multiscaling());
        let screen = (settings.screen_width.max(1), settings.screen_height.max(1));
        let built = self.built.as_mut().ok_or(IsorayError::NotBuilt)?;

        if built.target.reshape(&self.ctx.device, (width, height), screen) {
            built.bind_group = None;
            self.state.mark_outdated();
        }

        let wants_gradient = self.state.parameters().gradient_shading;
        if built.sync_gradient(&self.ctx, wants_gradient)? {
            self.state.mark_outdated();
        }
        if wants_gradient && built.gradient.is_none() {
            log::debug!("gradient shading requested without a gradient field, shading flat");
        }

        let config = FrameConfig::new(
            DispatchExtent::new(width, height),
            camera,
            self.state.parameters(),
            &settings.lighting,
            built.textures.has_gradient(),
        );
        self.ctx
            .queue
            .write_buffer(&built.frame_buffer, 0, bytemuck::bytes_of(&config.to_uniforms()));
        built.ensure_bind_group(&self.ctx.device)?;
        self.state.bind_frame(config);
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        self.state.require_built()?;
        let extent = self
            .state
            .frame()
            .map(|config| config.extent)
            .ok_or_else(|| {
                IsorayError::RenderError("no frame bound, call update_frame() first".to_string())
            })?;
        let built = self.built.as_mut().ok_or(IsorayError::NotBuilt)?;
        let device = &self.ctx.device;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("isosurface frame encoder"),
        });
        built.target.clear(&mut encoder);
        built.ensure_bind_group(device)?;
        if let Some(bind_group) = &built.bind_group {
            built.program.dispatch(&mut encoder, bind_group, extent);
        }
        built.target.draw(device, &mut encoder)?;
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        self.state.mark_rendered();
        Ok(())
    }

    fn output_size(&self) -> (u32, u32) {
        self.built.as_ref().map_or((0, 0), |b| b.target.frame_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoray_core::{UVec3, Vec3, VolumeData};

    fn try_context() -> Option<GpuContext> {
        GpuContext::new_headless_blocking().ok()
    }

    fn sphere() -> VolumeData {
        let grid = VolumeGrid::from_fn(UVec3::splat(16), Vec3::splat(0.125), |i, j, k| {
            #[allow(clippy::cast_precision_loss)]
            let p = (Vec3::new(i as f32, j as f32, k as f32) + 0.5) / 16.0 - 0.5;
            1.0 - 2.0 * p.length()
        })
        .unwrap();
        let mut data = VolumeData::with_volume(grid);
        data.compute_gradient().unwrap();
        data
    }

    #[test]
    fn test_identity() {
        let Some(ctx) = try_context() else {
            eprintln!("Skipping test: no GPU adapter available");
            return;
        };
        let renderer = IsoRaycaster::new(ctx);
        assert_eq!(renderer.name(), "1-Pass - Isosurface Raycaster");
        assert_eq!(renderer.abbreviation(), "iso");
        assert_eq!(renderer.data_type_support(), GridDataType::Structured);
        assert!(renderer.supports_pixel_multiscaling());
    }

    #[test]
    fn test_gradient_toggle_rebinds() {
        let Some(ctx) = try_context() else {
            eprintln!("Skipping test: no GPU adapter available");
            return;
        };
        let mut renderer = IsoRaycaster::new(ctx);
        renderer.initialize(&sphere(), 16, 16).unwrap();
        assert!(!renderer.gradient_bound());

        let settings = RenderSettings::with_screen(16, 16);
        renderer.set_gradient_shading(true);
        renderer.update_frame(&CameraState::default(), &settings).unwrap();
        assert!(renderer.gradient_bound());

        renderer.set_gradient_shading(false);
        renderer.update_frame(&CameraState::default(), &settings).unwrap();
        assert!(!renderer.gradient_bound());
    }

    #[test]
    fn test_broken_program_fails_initialize() {
        let Some(ctx) = try_context() else {
            eprintln!("Skipping test: no GPU adapter available");
            return;
        };
        let dir = std::env::temp_dir().join(format!("isoray_broken_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(crate::program::PRELUDE_FILE), "this is not wgsl").unwrap();
        std::fs::write(dir.join(crate::program::KERNEL_FILE), "fn").unwrap();

        let mut renderer = IsoRaycaster::with_program_source(ctx, ProgramSource::directory(&dir));
        let err = renderer.initialize(&sphere(), 16, 16).unwrap_err();
        assert!(matches!(err, IsorayError::ProgramFailed(_)));
        assert!(!renderer.is_built());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_reload_tears_down() {
        let Some(ctx) = try_context() else {
            eprintln!("Skipping test: no GPU adapter available");
            return;
        };
        let dir = std::env::temp_dir().join(format!("isoray_reload_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for file in [
            crate::program::PRELUDE_FILE,
            crate::program::KERNEL_FILE,
            crate::program::FRAME_TO_SCREEN_FILE,
        ] {
            let text = ProgramSource::Embedded.load(file).unwrap();
            std::fs::write(dir.join(file), text).unwrap();
        }

        let mut renderer = IsoRaycaster::with_program_source(ctx, ProgramSource::directory(&dir));
        renderer.initialize(&sphere(), 16, 16).unwrap();
        renderer.reload_program().unwrap();
        assert!(renderer.is_built());

        std::fs::write(dir.join(crate::program::KERNEL_FILE), "fn broken(").unwrap();
        assert!(matches!(renderer.reload_program(), Err(IsorayError::ProgramFailed(_))));
        assert!(!renderer.is_built());
        std::fs::remove_dir_all(&dir).ok();
    }
}
