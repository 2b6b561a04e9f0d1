//! 3D textures holding the scalar and gradient fields.

use isoray_core::{GradientField, UVec3, VolumeGrid};

use crate::error::{RenderError, RenderResult};

/// Scalar field texture plus the gradient texture bound beside it.
///
/// The gradient slot always holds a view: the uploaded gradient field when
/// one is bound, otherwise a single zero texel.
pub struct VolumeTextures {
    resolution: UVec3,
    volume: (wgpu::Texture, wgpu::TextureView),
    gradient: Option<(wgpu::Texture, wgpu::TextureView)>,
    placeholder: (wgpu::Texture, wgpu::TextureView),
}

impl VolumeTextures {
    /// Uploads `grid` as an `R32Float` 3D texture.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        grid: &VolumeGrid,
    ) -> RenderResult<Self> {
        let resolution = grid.resolution();
        let limit = device.limits().max_texture_dimension_3d;
        if resolution.max_element() > limit {
            return Err(RenderError::VolumeTooLarge(
                resolution.x,
                resolution.y,
                resolution.z,
                limit,
            ));
        }

        let volume = create_texture_3d(
            device,
            "Volume Texture",
            resolution,
            wgpu::TextureFormat::R32Float,
        );
        write_texture_3d(queue, &volume, resolution, bytemuck::cast_slice(grid.values()), 4);
        let volume_view = volume.create_view(&wgpu::TextureViewDescriptor::default());

        let placeholder = create_texture_3d(
            device,
            "Gradient Placeholder Texture",
            UVec3::ONE,
            wgpu::TextureFormat::Rgba32Float,
        );
        write_texture_3d(queue, &placeholder, UVec3::ONE, &[0u8; 16], 16);
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!(
            "uploaded {}x{}x{} volume texture",
            resolution.x,
            resolution.y,
            resolution.z
        );
        Ok(Self {
            resolution,
            volume: (volume, volume_view),
            gradient: None,
            placeholder: (placeholder, placeholder_view),
        })
    }

    /// Uploads `gradient` into the gradient slot, replacing any previous one.
    pub fn bind_gradient(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        gradient: &GradientField,
    ) -> RenderResult<()> {
        if gradient.resolution() != self.resolution {
            return Err(RenderError::GradientMismatch {
                volume: self.resolution,
                gradient: gradient.resolution(),
            });
        }
        let texels: Vec<[f32; 4]> = gradient
            .vectors()
            .iter()
            .map(|v| v.extend(0.0).to_array())
            .collect();
        let texture = create_texture_3d(
            device,
            "Gradient Texture",
            self.resolution,
            wgpu::TextureFormat::Rgba32Float,
        );
        write_texture_3d(queue, &texture, self.resolution, bytemuck::cast_slice(&texels), 16);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.gradient = Some((texture, view));
        Ok(())
    }

    /// Returns the gradient slot to the placeholder.
    pub fn unbind_gradient(&mut self) {
        self.gradient = None;
    }

    #[must_use]
    pub fn has_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    #[must_use]
    pub fn volume_view(&self) -> &wgpu::TextureView {
        &self.volume.1
    }

    /// View for the gradient binding.
    #[must_use]
    pub fn gradient_view(&self) -> &wgpu::TextureView {
        self.gradient
            .as_ref()
            .map_or(&self.placeholder.1, |(_, view)| view)
    }
}

fn create_texture_3d(
    device: &wgpu::Device,
    label: &str,
    size: UVec3,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: size.z,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D3,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_texture_3d(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    size: UVec3,
    data: &[u8],
    bytes_per_texel: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(size.x * bytes_per_texel),
            rows_per_image: Some(size.y),
        },
        wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: size.z,
        },
    );
}
