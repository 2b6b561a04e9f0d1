//! Render settings and persisted options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::RenderParameters;
use crate::shading::LightingConfig;

/// Largest supported super/subsampling factor.
pub const MAX_SCALING_FACTOR: u32 = 4;

/// How the rendered resolution relates to the screen resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DisplayScaling {
    /// Render at screen resolution.
    #[default]
    Native,
    /// Render `factor` times larger per axis, downsampled on present.
    Supersample(u32),
    /// Render `factor` times smaller per axis, upsampled on present.
    Subsample(u32),
}

impl DisplayScaling {
    /// Whether the rendered size differs from the screen size.
    #[must_use]
    pub fn is_active(self) -> bool {
        self.factor() > 1
    }

    /// Scaling factor clamped to `1..=MAX_SCALING_FACTOR`.
    #[must_use]
    pub fn factor(self) -> u32 {
        match self {
            Self::Native => 1,
            Self::Supersample(f) | Self::Subsample(f) => f.clamp(1, MAX_SCALING_FACTOR),
        }
    }

    /// Rendered size for a screen of `width` x `height`. Never zero.
    #[must_use]
    pub fn scaled_size(self, width: u32, height: u32) -> (u32, u32) {
        let factor = self.factor();
        let (w, h) = match self {
            Self::Native => (width, height),
            Self::Supersample(_) => (width.saturating_mul(factor), height.saturating_mul(factor)),
            Self::Subsample(_) => (width.div_ceil(factor), height.div_ceil(factor)),
        };
        (w.max(1), h.max(1))
    }
}

/// Screen-level settings the renderer reads every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// Multi-scaling mode.
    pub display_scaling: DisplayScaling,
    /// Light and material coefficients.
    pub lighting: LightingConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            display_scaling: DisplayScaling::Native,
            lighting: LightingConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Settings for a screen of the given size with default lighting.
    #[must_use]
    pub fn with_screen(width: u32, height: u32) -> Self {
        Self {
            screen_width: width,
            screen_height: height,
            ..Self::default()
        }
    }

    /// Size of the image the renderer must produce.
    ///
    /// Renderers without multi-scaling support always use the screen size.
    #[must_use]
    pub fn render_size(&self, supports_multiscaling: bool) -> (u32, u32) {
        if supports_multiscaling && self.display_scaling.is_active() {
            self.display_scaling
                .scaled_size(self.screen_width, self.screen_height)
        } else {
            (self.screen_width.max(1), self.screen_height.max(1))
        }
    }
}

/// Everything needed to reproduce a rendering setup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub parameters: RenderParameters,
    pub settings: RenderSettings,
}

impl Options {
    /// Reads options from a JSON file. Parameters are clamped on load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut options: Self = serde_json::from_str(&text)?;
        options.parameters = options.parameters.clamped();
        log::debug!("loaded options from {}", path.as_ref().display());
        Ok(options)
    }

    /// Writes options as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }
}
