//! Error types for isoray.

use thiserror::Error;

/// The main error type for isoray operations.
#[derive(Error, Debug)]
pub enum IsorayError {
    /// No scalar volume is available to render.
    #[error("no volume data available")]
    NoVolumeData,

    /// The renderer has not been initialized, or was torn down.
    #[error("renderer not built - call initialize() first")]
    NotBuilt,

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A grid or output dimension was zero.
    #[error("invalid resolution {0}x{1}x{2}")]
    InvalidResolution(u32, u32, u32),

    /// A parameter name that the renderer does not expose.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// The compute program failed to compile, link or bind.
    #[error("program failure: {0}")]
    ProgramFailed(String),

    /// Rendering error.
    #[error("render error: {0}")]
    RenderError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for isoray operations.
pub type Result<T> = std::result::Result<T, IsorayError>;
