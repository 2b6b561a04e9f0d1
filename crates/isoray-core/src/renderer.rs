//! The capability interface shared by isosurface renderers.

use glam::Vec4;

use crate::camera::CameraState;
use crate::error::{IsorayError, Result};
use crate::frame::FrameConfig;
use crate::options::RenderSettings;
use crate::param_space::{ParameterRange, ParameterSpace};
use crate::params::{RenderParameters, STEP_SIZE_PARAMETER};
use crate::volume::VolumeSource;

/// Sweep range registered for the step size.
pub const STEP_SIZE_SWEEP: (f32, f32, f32) = (0.05, 1.5, 0.1);

/// Kind of grid a renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDataType {
    Structured,
    Unstructured,
}

/// Lifecycle flags, parameters and the last bound frame.
///
/// `built` gates every dispatch. `outdated` is raised by any parameter
/// change, any change of the bound frame configuration and by
/// (re)initialization, and cleared after a frame has been rendered.
#[derive(Debug, Clone, Default)]
pub struct RendererState {
    built: bool,
    outdated: bool,
    parameters: RenderParameters,
    frame: Option<FrameConfig>,
}

impl RendererState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.outdated
    }

    #[must_use]
    pub fn parameters(&self) -> &RenderParameters {
        &self.parameters
    }

    /// The configuration bound by the last `update_frame`.
    #[must_use]
    pub fn frame(&self) -> Option<&FrameConfig> {
        self.frame.as_ref()
    }

    /// Fails with [`IsorayError::NotBuilt`] unless built.
    pub fn require_built(&self) -> Result<()> {
        if self.built {
            Ok(())
        } else {
            Err(IsorayError::NotBuilt)
        }
    }

    /// Enters the built state with a stale frame.
    pub fn mark_built(&mut self) {
        self.built = true;
        self.outdated = true;
        self.frame = None;
    }

    /// Returns to the uninitialized state. Parameters are kept.
    pub fn mark_torn_down(&mut self) {
        self.built = false;
        self.outdated = false;
        self.frame = None;
    }

    pub fn mark_outdated(&mut self) {
        self.outdated = true;
    }

    /// Records that the bound frame has been rendered.
    pub fn mark_rendered(&mut self) {
        self.outdated = false;
    }

    /// Stores the configuration for the next dispatch.
    ///
    /// Returns whether it differs from the previously bound one.
    pub fn bind_frame(&mut self, config: FrameConfig) -> bool {
        let changed = self.frame.as_ref() != Some(&config);
        if changed {
            self.outdated = true;
        }
        self.frame = Some(config);
        changed
    }

    pub fn set_isovalue(&mut self, isovalue: f32) {
        let changed = self.parameters.set_isovalue(isovalue);
        self.note_change(changed);
    }

    pub fn set_step_size(&mut self, step_size: f32) {
        let changed = self.parameters.set_step_size(step_size);
        self.note_change(changed);
    }

    pub fn set_color(&mut self, color: Vec4) {
        let changed = self.parameters.set_color(color);
        self.note_change(changed);
    }

    pub fn set_gradient_shading(&mut self, enabled: bool) {
        let changed = self.parameters.set_gradient_shading(enabled);
        self.note_change(changed);
    }

    /// Replaces all parameters, clamping them first.
    pub fn set_parameters(&mut self, parameters: RenderParameters) {
        let clamped = parameters.clamped();
        if clamped != self.parameters {
            self.parameters = clamped;
            self.outdated = true;
        }
    }

    /// Sets a parameter registered in the parameter space by name.
    pub fn apply_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        match name {
            STEP_SIZE_PARAMETER => {
                self.set_step_size(value);
                Ok(())
            }
            _ => Err(IsorayError::UnknownParameter(name.to_string())),
        }
    }

    fn note_change(&mut self, changed: bool) {
        if changed {
            self.outdated = true;
        }
    }
}

/// A first-hit volume renderer driven by a host application.
///
/// Hosts call [`initialize`](Self::initialize) once data is available, then
/// per frame [`update_frame`](Self::update_frame) followed by
/// [`render_frame`](Self::render_frame). Parameter setters only take effect
/// at the next `update_frame`.
pub trait VolumeRenderer {
    /// Display name.
    fn name(&self) -> &'static str;

    /// Short identifier used in option files and benchmark reports.
    fn abbreviation(&self) -> &'static str;

    /// Grid kind this renderer can draw.
    fn data_type_support(&self) -> GridDataType;

    /// Whether the output may be rendered at a scaled resolution.
    fn supports_pixel_multiscaling(&self) -> bool {
        false
    }

    fn state(&self) -> &RendererState;

    fn state_mut(&mut self) -> &mut RendererState;

    fn is_built(&self) -> bool {
        self.state().is_built()
    }

    fn is_outdated(&self) -> bool {
        self.state().is_outdated()
    }

    fn parameters(&self) -> &RenderParameters {
        self.state().parameters()
    }

    fn set_isovalue(&mut self, isovalue: f32) {
        self.state_mut().set_isovalue(isovalue);
    }

    fn set_step_size(&mut self, step_size: f32) {
        self.state_mut().set_step_size(step_size);
    }

    fn set_color(&mut self, color: Vec4) {
        self.state_mut().set_color(color);
    }

    fn set_gradient_shading(&mut self, enabled: bool) {
        self.state_mut().set_gradient_shading(enabled);
    }

    fn set_parameters(&mut self, parameters: RenderParameters) {
        self.state_mut().set_parameters(parameters);
    }

    /// Registers the renderer's tunable dimensions.
    fn fill_parameter_space(&self, space: &mut ParameterSpace) {
        let (min, max, delta) = STEP_SIZE_SWEEP;
        space.clear();
        space.add(ParameterRange::new(STEP_SIZE_PARAMETER, min, max, delta));
    }

    /// Sets a registered parameter by name.
    fn apply_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        self.state_mut().apply_parameter(name, value)
    }

    /// Allocates resources for the volume currently held by `source` and
    /// sizes the output to `width` x `height`.
    ///
    /// Tears down first when already built. Fails with
    /// [`IsorayError::NoVolumeData`] when the source holds no scalar field,
    /// leaving the renderer uninitialized.
    fn initialize(&mut self, source: &dyn VolumeSource, width: u32, height: u32) -> Result<()>;

    /// Releases all renderer-owned resources. No-op when not built.
    fn clean(&mut self);

    /// Rebuilds the marching program in place, keeping parameters.
    ///
    /// On failure the renderer is torn down.
    fn reload_program(&mut self) -> Result<()>;

    /// Sizes the dispatch and binds camera, parameters and lighting for the
    /// next frame.
    fn update_frame(&mut self, camera: &CameraState, settings: &RenderSettings) -> Result<()>;

    /// Clears the output, runs the dispatch and presents the result.
    fn render_frame(&mut self) -> Result<()>;

    /// The configuration bound by the last `update_frame`.
    fn frame_config(&self) -> Option<&FrameConfig> {
        self.state().frame()
    }

    /// Width and height of the current output image.
    fn output_size(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DispatchExtent;
    use crate::shading::LightingConfig;

    fn config(isovalue: f32) -> FrameConfig {
        let params = RenderParameters {
            isovalue,
            ..RenderParameters::default()
        };
        FrameConfig::new(
            DispatchExtent::new(8, 8),
            &CameraState::default(),
            &params,
            &LightingConfig::default(),
            false,
        )
    }

    #[test]
    fn test_lifecycle_flags() {
        let mut state = RendererState::new();
        assert!(!state.is_built());
        assert!(state.require_built().is_err());

        state.mark_built();
        assert!(state.is_built() && state.is_outdated());

        state.bind_frame(config(0.5));
        state.mark_rendered();
        assert!(!state.is_outdated());

        // Same configuration again keeps the frame valid.
        assert!(!state.bind_frame(config(0.5)));
        assert!(!state.is_outdated());

        assert!(state.bind_frame(config(0.6)));
        assert!(state.is_outdated());

        state.mark_torn_down();
        assert!(!state.is_built());
        assert!(state.frame().is_none());
    }

    #[test]
    fn test_setters_mark_outdated_only_on_change() {
        let mut state = RendererState::new();
        state.mark_built();
        state.mark_rendered();

        state.set_isovalue(0.5);
        assert!(!state.is_outdated());

        state.set_isovalue(0.7);
        assert!(state.is_outdated());
    }

    #[test]
    fn test_apply_parameter() {
        let mut state = RendererState::new();
        state.apply_parameter(STEP_SIZE_PARAMETER, 3.0).unwrap();
        assert_eq!(state.parameters().step_size, 2.0);
        assert!(matches!(
            state.apply_parameter("Isovalue", 0.3),
            Err(IsorayError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_parameters_survive_teardown() {
        let mut state = RendererState::new();
        state.set_color(Vec4::ONE);
        state.mark_built();
        state.mark_torn_down();
        assert_eq!(state.parameters().color, Vec4::ONE);
    }
}
