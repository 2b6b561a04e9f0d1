//! CPU reference implementation of the single-pass isosurface raycaster.
//!
//! Runs the same ray generation, box clipping, marching and shading as the
//! GPU kernel, with rows traced in parallel on the rayon pool. Used to validate the GPU
//! path and to render where no adapter is available.

use std::sync::Arc;

use glam::{UVec2, Vec4};
use rayon::prelude::*;

use crate::bbox::VolumeBox;
use crate::camera::CameraState;
use crate::error::{IsorayError, Result};
use crate::frame::{DispatchExtent, FrameConfig};
use crate::march::march_isosurface;
use crate::options::RenderSettings;
use crate::ray::RayGenerator;
use crate::renderer::{GridDataType, RendererState, VolumeRenderer};
use crate::shading::{shade, BACKGROUND};
use crate::volume::{GradientField, VolumeGrid, VolumeSource};

/// Traces every pixel of one frame configuration against one volume.
#[derive(Debug, Clone, Copy)]
pub struct FrameTracer<'a> {
    config: &'a FrameConfig,
    rays: RayGenerator,
    bounds: VolumeBox,
    volume: &'a VolumeGrid,
    gradient: Option<&'a GradientField>,
}

impl<'a> FrameTracer<'a> {
    /// Prepares tracing. The gradient is only consulted when the
    /// configuration enables gradient shading.
    #[must_use]
    pub fn new(
        config: &'a FrameConfig,
        volume: &'a VolumeGrid,
        gradient: Option<&'a GradientField>,
    ) -> Self {
        Self {
            config,
            rays: config.ray_generator(),
            bounds: VolumeBox::from_origin_extent(volume.origin(), volume.extent()),
            volume,
            gradient: gradient.filter(|_| config.gradient_shading),
        }
    }

    /// Color of pixel `(x, y)`, row 0 at the top.
    #[must_use]
    pub fn trace(&self, x: u32, y: u32) -> Vec4 {
        let ray = self
            .rays
            .ray(UVec2::new(x, y), self.config.extent.as_uvec2());
        let Some(interval) = self.bounds.clip(&ray) else {
            return BACKGROUND;
        };
        let Some(hit) = march_isosurface(
            &ray,
            interval,
            self.config.step_size,
            self.config.isovalue,
            |p| self.volume.sample_world(p),
        ) else {
            return BACKGROUND;
        };

        let normal = self
            .gradient
            .map(|g| g.sample(self.volume.world_to_tex(hit.position)));
        shade(
            hit.position,
            normal,
            self.config.color,
            &self.config.lighting,
            self.config.eye,
        )
    }

    /// Fills image row `y`.
    fn trace_row(&self, y: u32, row: &mut [Vec4]) {
        for (x, pixel) in row.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let x = x as u32;
            *pixel = self.trace(x, y);
        }
    }
}

/// Resources held while built.
#[derive(Debug)]
struct BuiltVolume {
    volume: Arc<VolumeGrid>,
    gradient: Option<Arc<GradientField>>,
}

/// Single-pass isosurface raycaster evaluated on the CPU.
#[derive(Debug, Default)]
pub struct CpuIsoRaycaster {
    state: RendererState,
    built: Option<BuiltVolume>,
    size: (u32, u32),
    pixels: Vec<Vec4>,
    /// Dedicated pool; the global rayon pool when unset.
    pool: Option<rayon::ThreadPool>,
}

impl CpuIsoRaycaster {
    /// Creates an uninitialized renderer with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of worker threads. Zero uses all available cores.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.pool = None;
        if threads > 0 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => self.pool = Some(pool),
                Err(err) => log::warn!("using the global thread pool: {err}"),
            }
        }
        self
    }

    /// Output pixels in row-major order, row 0 at the top.
    #[must_use]
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    /// Output quantized to RGBA8, as a unorm storage texture would hold it.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.to_array().map(quantize_unorm8))
            .collect()
    }

    fn reshape(&mut self, width: u32, height: u32) {
        if self.size != (width, height) {
            log::debug!("reshaping reference output to {width}x{height}");
            self.size = (width, height);
            self.pixels = vec![BACKGROUND; DispatchExtent::new(width, height).pixel_count()];
            self.state.mark_outdated();
        }
    }
}

impl VolumeRenderer for CpuIsoRaycaster {
    fn name(&self) -> &'static str {
        "1-Pass - Isosurface Raycaster (CPU)"
    }

    fn abbreviation(&self) -> &'static str {
        "iso-cpu"
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
            "{}: initializing for {}x{}x{} grid, extent {:?}",
            self.abbreviation(),
            res.x,
            res.y,
            res.z,
            volume.extent()
        );
        if self.state.parameters().gradient_shading && source.gradient_field().is_none() {
            log::warn!(
                "{}: gradient shading enabled but the source has no gradient field, shading flat",
                self.abbreviation()
            );
        }
        self.built = Some(BuiltVolume {
            volume,
            gradient: source.gradient_field(),
        });
        self.size = (0, 0);
        self.reshape(width, height);
        self.state.mark_built();
        Ok(())
    }

    fn clean(&mut self) {
        if self.built.take().is_some() {
            log::info!("{}: releasing resources", self.abbreviation());
        }
        self.pixels.clear();
        self.size = (0, 0);
        self.state.mark_torn_down();
    }

    fn reload_program(&mut self) -> Result<()> {
        self.state.require_built()?;
        // Nothing to recompile; the next frame is redrawn.
        self.state.mark_outdated();
        Ok(())
    }

    fn update_frame(&mut self, camera: &CameraState, settings: &RenderSettings) -> Result<()> {
        self.state.require_built()?;
        let (width, height) = settings.render_size(self.supports_pixel_multiscaling());
        self.reshape(width, height);

        let gradient_available = self.built.as_ref().is_some_and(|b| b.gradient.is_some());
        if self.state.parameters().gradient_shading && !gradient_available {
            log::debug!("gradient shading requested without a gradient field, shading flat");
        }
        let config = FrameConfig::new(
            DispatchExtent::new(width, height),
            camera,
            self.state.parameters(),
            &settings.lighting,
            gradient_available,
        );
        self.state.bind_frame(config);
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        self.state.require_built()?;
        let built = self.built.as_ref().ok_or(IsorayError::NotBuilt)?;
        let config = *self.state.frame().ok_or_else(|| {
            IsorayError::RenderError("no frame bound, call update_frame() first".to_string())
        })?;
        let extent = config.extent;
        if extent.pixel_count() != self.pixels.len() {
            return Err(IsorayError::SizeMismatch {
                expected: extent.pixel_count(),
                actual: self.pixels.len(),
            });
        }

        let tracer = FrameTracer::new(&config, &built.volume, built.gradient.as_deref());
        let width = (extent.width as usize).max(1);
        let pixels = &mut self.pixels;
        let mut trace = move || {
            pixels
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    #[allow(clippy::cast_possible_truncation)]
                    let y = y as u32;
                    tracer.trace_row(y, row);
                });
        };
        match &self.pool {
            Some(pool) => pool.install(trace),
            None => trace(),
        }

        self.state.mark_rendered();
        Ok(())
    }

    fn output_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Converts a `[0, 1]` channel to 8 bits with round-to-nearest.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
