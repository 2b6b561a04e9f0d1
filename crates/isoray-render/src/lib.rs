//! wgpu backend for isoray.
//!
//! This crate provides the GPU side of single-pass isosurface raycasting:
//! - Device ownership ([`GpuContext`]) and 3D volume textures
//! - The marching compute kernel (WGSL) and its hot-reloadable program
//! - The frame target with multi-scaled presentation and read-back
//! - [`IsoRaycaster`], the [`isoray_core::VolumeRenderer`] running on the GPU

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Pixel and texel counts are u32 on the GPU and usize in buffers
#![allow(clippy::cast_possible_truncation)]
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod camera;
pub mod context;
pub mod error;
pub mod frame_target;
pub mod program;
pub mod raycaster;
pub mod screenshot;
pub mod volume_texture;

pub use camera::Camera;
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use frame_target::{aligned_bytes_per_row, FrameTarget, OUTPUT_FORMAT};
pub use program::{ComputeProgram, ComputeShaderBuilder, ProgramSource};
pub use raycaster::IsoRaycaster;
pub use screenshot::{encode_png, save_image, ScreenshotError};
pub use volume_texture::VolumeTextures;
