//! Core model and reference algorithms for isoray.
//!
//! This crate provides the GPU-agnostic parts of single-pass isosurface ray marching:
//! - [`VolumeGrid`] and [`GradientField`] behind the [`VolumeSource`] trait
//! - [`RayGenerator`], [`VolumeBox`] clipping and [`march_isosurface`]
//! - Blinn-Phong [`shade`]ing driven by a [`LightingConfig`]
//! - The [`VolumeRenderer`] lifecycle contract and its per-frame [`FrameConfig`]
//! - [`CpuIsoRaycaster`], a reference implementation of that contract

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Getters and builders return values whose use is obvious
#![allow(clippy::must_use_candidate)]
// Short math names like t, d, o mirror the formulas
#![allow(clippy::many_single_char_names)]
// Tests compare values that are assigned, not computed
#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod bbox;
pub mod camera;
pub mod error;
pub mod frame;
pub mod march;
pub mod options;
pub mod param_space;
pub mod params;
pub mod ray;
pub mod reference;
pub mod renderer;
pub mod shading;
pub mod volume;

pub use bbox::{RayInterval, VolumeBox};
pub use camera::CameraState;
pub use error::{IsorayError, Result};
pub use frame::{DispatchExtent, FrameConfig, FrameUniforms, GridUniforms, WORKGROUP_SIZE};
pub use march::{march_isosurface, IsoHit};
pub use options::{DisplayScaling, Options, RenderSettings};
pub use param_space::{ParameterRange, ParameterSpace};
pub use params::{RenderParameters, STEP_SIZE_PARAMETER};
pub use ray::{Ray, RayGenerator};
pub use reference::{quantize_unorm8, CpuIsoRaycaster, FrameTracer};
pub use renderer::{GridDataType, RendererState, VolumeRenderer};
pub use shading::{shade, LightingConfig, BACKGROUND};
pub use volume::{GradientField, VolumeData, VolumeGrid, VolumeSource};

// Re-export glam types for convenience
pub use glam::{Mat4, UVec2, UVec3, Vec3, Vec4};
