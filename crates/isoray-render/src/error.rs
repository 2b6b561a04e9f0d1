//! Rendering error types.

use std::path::PathBuf;

use isoray_core::{IsorayError, UVec3};
use thiserror::Error;

/// Errors that can occur in the GPU backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// A shader file was not found in the shader directory.
    #[error("shader source not found: {}", .0.display())]
    ShaderSourceMissing(PathBuf),

    /// Mapping a read-back buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// The volume does not fit the device's 3D texture limits.
    #[error("volume {0}x{1}x{2} exceeds the 3D texture limit of {3}")]
    VolumeTooLarge(u32, u32, u32, u32),

    /// The gradient field is not aligned with the bound volume.
    #[error("gradient resolution {gradient} does not match volume resolution {volume}")]
    GradientMismatch { volume: UVec3, gradient: UVec3 },

    /// I/O error while reading shader sources.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for IsorayError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::ShaderCompilationFailed(_)
            | RenderError::PipelineCreationFailed(_)
            | RenderError::ShaderSourceMissing(_) => IsorayError::ProgramFailed(err.to_string()),
            RenderError::Io(io) => IsorayError::IoError(io),
            other => IsorayError::RenderError(other.to_string()),
        }
    }
}

impl From<crate::screenshot::ScreenshotError> for IsorayError {
    fn from(err: crate::screenshot::ScreenshotError) -> Self {
        match err {
            crate::screenshot::ScreenshotError::IoError(io) => IsorayError::IoError(io),
            other => IsorayError::RenderError(format!("failed to save image: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_errors_map_to_program_failed() {
        let err: IsorayError = RenderError::ShaderCompilationFailed("bad token".into()).into();
        assert!(matches!(err, IsorayError::ProgramFailed(ref msg) if msg.contains("bad token")));

        let err: IsorayError = RenderError::ShaderSourceMissing(PathBuf::from("x.wgsl")).into();
        assert!(matches!(err, IsorayError::ProgramFailed(_)));
    }

    #[test]
    fn test_other_errors_map_to_render_error() {
        let err: IsorayError = RenderError::BufferMapFailed.into();
        assert!(matches!(err, IsorayError::RenderError(_)));

        let err: IsorayError =
            crate::screenshot::ScreenshotError::UnsupportedFormat("tga".into()).into();
        assert!(matches!(err, IsorayError::RenderError(ref msg) if msg.contains("tga")));
    }
}
