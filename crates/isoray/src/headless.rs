//! Headless rendering API.
//!
//! Renders one isosurface frame of a volume to an RGBA buffer or an image file
//! without a window. Useful for integration tests, batch processing and
//! automated screenshot generation.

use std::path::Path;

use isoray_core::{
    CameraState, CpuIsoRaycaster, IsorayError, Options, Result, VolumeRenderer, VolumeSource,
};
use isoray_render::{GpuContext, IsoRaycaster};

/// An RGBA8 image, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderedImage {
    /// RGBA of pixel `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let texel = self.pixels.get(offset..offset + 4)?;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(texel);
        Some(rgba)
    }

    /// Number of pixels where a surface was hit (non-zero alpha).
    #[must_use]
    pub fn covered_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    /// Saves as PNG or JPEG, chosen by the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        isoray_render::save_image(path, &self.pixels, self.width, self.height)?;
        Ok(())
    }
}

/// Runs one initialize / update / render cycle with `options`.
///
/// The renderer is sized to the screen and draws at the resolution selected by
/// the display-scaling mode.
pub fn render_once(
    renderer: &mut dyn VolumeRenderer,
    source: &dyn VolumeSource,
    camera: &CameraState,
    options: &Options,
) -> Result<()> {
    let settings = &options.settings;
    renderer.set_parameters(options.parameters);
    renderer.initialize(source, settings.screen_width, settings.screen_height)?;
    renderer.update_frame(camera, settings)?;
    renderer.render_frame()
}

/// Renders the volume on the GPU and returns the presented screen image.
///
/// Creates a headless GPU context for the call. Fails with
/// [`IsorayError::RenderError`] when no adapter is available.
///
/// # Example
/// ```no_run
/// use isoray::*;
///
/// let grid = synthetic::sphere(UVec3::splat(64), Vec3::splat(1.0 / 64.0)).unwrap();
/// let data = synthetic::volume_data(grid, true).unwrap();
/// let image = render_to_image(&data, &CameraState::default(), &Options::default()).unwrap();
/// assert_eq!(image.pixels.len(), 800 * 600 * 4);
/// ```
pub fn render_to_image(
    source: &dyn VolumeSource,
    camera: &CameraState,
    options: &Options,
) -> Result<RenderedImage> {
    let ctx = GpuContext::new_headless_blocking().map_err(|e| {
        IsorayError::RenderError(format!("failed to create headless GPU context: {e}"))
    })?;
    let mut renderer = IsoRaycaster::new(ctx);
    render_once(&mut renderer, source, camera, options)?;

    let (width, height) = renderer.screen_size();
    let pixels = renderer.read_screen()?;
    renderer.clean();
    Ok(RenderedImage {
        width,
        height,
        pixels,
    })
}

/// Renders the volume on the GPU and saves the screen image to `path`.
pub fn render_to_file(
    path: impl AsRef<Path>,
    source: &dyn VolumeSource,
    camera: &CameraState,
    options: &Options,
) -> Result<()> {
    render_to_image(source, camera, options)?.save(path)
}

/// Renders the volume with the CPU reference raycaster.
///
/// Returns the frame at its rendered resolution, which differs from the
/// screen size when display scaling is active.
pub fn render_to_image_cpu(
    source: &dyn VolumeSource,
    camera: &CameraState,
    options: &Options,
) -> Result<RenderedImage> {
    let mut renderer = CpuIsoRaycaster::new();
    render_once(&mut renderer, source, camera, options)?;

    let (width, height) = renderer.output_size();
    Ok(RenderedImage {
        width,
        height,
        pixels: renderer.to_rgba8(),
    })
}
