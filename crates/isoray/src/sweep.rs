//! Parameter sweeps over a renderer's registered dimensions.

use std::time::{Duration, Instant};

use isoray_core::{
    CameraState, ParameterSpace, RenderSettings, Result, VolumeRenderer, STEP_SIZE_PARAMETER,
};

/// Timing of one rendered frame at one parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSample {
    pub value: f32,
    pub elapsed: Duration,
}

/// Result of sweeping one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub parameter: String,
    pub samples: Vec<SweepSample>,
}

impl SweepReport {
    /// Sum of all frame times.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.samples.iter().map(|s| s.elapsed).sum()
    }

    /// Sample with the shortest frame time.
    #[must_use]
    pub fn fastest(&self) -> Option<&SweepSample> {
        self.samples.iter().min_by_key(|s| s.elapsed)
    }
}

/// Renders one frame per value of `parameter` and times each `render_frame`.
///
/// The renderer must be built. `after_frame` runs inside the timed region and
/// is where GPU callers wait for the device. The renderer's parameters are
/// restored afterwards.
pub fn run_sweep<R, F>(
    renderer: &mut R,
    parameter: &str,
    camera: &CameraState,
    settings: &RenderSettings,
    mut after_frame: F,
) -> Result<SweepReport>
where
    R: VolumeRenderer + ?Sized,
    F: FnMut(&R) -> Result<()>,
{
    let mut space = ParameterSpace::new();
    renderer.fill_parameter_space(&mut space);
    let range = space.require(parameter)?.clone();
    let original = *renderer.parameters();

    log::info!(
        "{}: sweeping {} over [{}, {}] by {} ({} frames)",
        renderer.abbreviation(),
        range.name,
        range.min,
        range.max,
        range.delta,
        range.sample_count()
    );

    let mut samples = Vec::with_capacity(range.sample_count());
    let result: Result<()> = range.values().try_for_each(|value| {
        renderer.apply_parameter(parameter, value)?;
        renderer.update_frame(camera, settings)?;
        let start = Instant::now();
        renderer.render_frame()?;
        after_frame(&*renderer)?;
        let elapsed = start.elapsed();
        log::debug!("{parameter} = {value}: {elapsed:?}");
        samples.push(SweepSample { value, elapsed });
        Ok(())
    });
    renderer.set_parameters(original);
    result?;

    Ok(SweepReport {
        parameter: range.name,
        samples,
    })
}

/// Sweeps the step size without waiting on the device between frames.
pub fn run_step_size_sweep<R>(
    renderer: &mut R,
    camera: &CameraState,
    settings: &RenderSettings,
) -> Result<SweepReport>
where
    R: VolumeRenderer + ?Sized,
{
    run_sweep(renderer, STEP_SIZE_PARAMETER, camera, settings, |_| Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;
    use glam::{UVec3, Vec3};
    use isoray_core::{CpuIsoRaycaster, IsorayError};

    fn built_renderer() -> CpuIsoRaycaster {
        let grid = synthetic::sphere(UVec3::splat(8), Vec3::splat(0.25)).unwrap();
        let data = synthetic::volume_data(grid, false).unwrap();
        let mut renderer = CpuIsoRaycaster::new().with_threads(1);
        renderer.initialize(&data, 8, 8).unwrap();
        renderer
    }

    #[test]
    fn test_step_size_sweep_covers_range() {
        let mut renderer = built_renderer();
        renderer.set_step_size(0.7);
        let report = run_step_size_sweep(
            &mut renderer,
            &CameraState::default(),
            &RenderSettings::with_screen(8, 8),
        )
        .unwrap();

        assert_eq!(report.parameter, STEP_SIZE_PARAMETER);
        assert_eq!(report.samples.len(), 15);
        assert!((report.samples[0].value - 0.05).abs() < 1e-6);
        assert!(report.samples.last().unwrap().value <= 1.5 + 1e-4);
        assert!(report.fastest().is_some());
        assert!((renderer.parameters().step_size - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_parameter() {
        let mut renderer = built_renderer();
        let err = run_sweep(
            &mut renderer,
            "Isovalue",
            &CameraState::default(),
            &RenderSettings::with_screen(8, 8),
            |_| Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, IsorayError::UnknownParameter(name) if name == "Isovalue"));
    }

    #[test]
    fn test_sweep_requires_built_renderer() {
        let mut renderer = CpuIsoRaycaster::new();
        let err = run_step_size_sweep(
            &mut renderer,
            &CameraState::default(),
            &RenderSettings::with_screen(8, 8),
        )
        .unwrap_err();
        assert!(matches!(err, IsorayError::NotBuilt));
        assert!((renderer.parameters().step_size - 0.5).abs() < 1e-6);
    }
}
