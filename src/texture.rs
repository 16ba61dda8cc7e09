use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// Decoded image pixels, ready for GPU upload.
///
/// Decoding happens on the CPU and is kept apart from [`Texture`] so a bad
/// file is reported before any GPU work starts.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// RGBA8 pixels, row-major, top row first.
    pub pixels: RgbaImage,
    /// Channel count of the source file (3 for a JPEG, 4 for an RGBA PNG).
    pub source_channels: u8,
    pub label: String,
}

impl TextureData {
    /// Decode an image file into RGBA pixels.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::decode(&bytes, path)
    }

    /// Decode an in-memory encoded image. `path` is only used for labels and errors.
    pub fn decode(bytes: &[u8], path: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let path = path.into();
        let img = image::load_from_memory(bytes).map_err(|source| AssetError::Decode {
            path: path.clone(),
            source,
        })?;

        let source_channels = img.color().channel_count();
        Ok(Self {
            pixels: img.to_rgba8(),
            source_channels,
            label: path.display().to_string(),
        })
    }

    /// Decode an image file, or fall back to [`TextureData::white`].
    ///
    /// A missing or undecodable file is logged as a warning. Multiplying by
    /// white leaves the vertex colors unchanged, so the quad still draws.
    pub fn load_or_white(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(data) => {
                log::info!(
                    "loaded texture '{}' ({}x{}, {} channels, {} mip levels)",
                    data.label,
                    data.width(),
                    data.height(),
                    data.source_channels,
                    data.mip_level_count()
                );
                data
            }
            Err(e) => {
                log::warn!("{e}; drawing with vertex colors only");
                Self::white()
            }
        }
    }

    /// Wrap raw RGBA pixels.
    pub fn from_rgba(pixels: RgbaImage, label: impl Into<String>) -> Self {
        Self {
            pixels,
            source_channels: 4,
            label: label.into(),
        }
    }

    /// A 1x1 opaque white image. Multiplying by it leaves vertex colors as-is.
    pub fn white() -> Self {
        Self::from_rgba(
            RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
            "Fallback White Texture",
        )
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width(), self.height())
    }

    /// Build the full mip chain, level 0 first.
    ///
    /// Each level halves the previous one (never below 1 pixel) using a
    /// triangle filter.
    pub fn mip_chain(&self) -> Vec<RgbaImage> {
        let mut levels = Vec::with_capacity(self.mip_level_count() as usize);
        levels.push(self.pixels.clone());

        while let Some(prev) = levels.last() {
            let (w, h) = prev.dimensions();
            if w == 1 && h == 1 {
                break;
            }
            let next = image::imageops::resize(
                prev,
                (w / 2).max(1),
                (h / 2).max(1),
                image::imageops::FilterType::Triangle,
            );
            levels.push(next);
        }

        levels
    }
}

/// `floor(log2(max(width, height))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// A GPU texture with its view and sampler.
#[derive(Debug)]
pub struct Texture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

impl Texture {
    /// Upload decoded pixels with a full mip chain.
    ///
    /// The sampler repeats in both directions and filters linearly, including
    /// between mip levels.
    pub fn upload(gpu: &GpuContext, data: &TextureData) -> Self {
        let levels = data.mip_chain();
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&data.label),
            size: wgpu::Extent3d {
                width: data.width(),
                height: data.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, img) in levels.iter().enumerate() {
            let (w, h) = img.dimensions();
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                img.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", data.label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Load a texture from disk and upload it, or upload plain white.
    ///
    /// See [`TextureData::load_or_white`].
    pub fn load_or_white(gpu: &GpuContext, path: impl AsRef<Path>) -> Self {
        Self::upload(gpu, &TextureData::load_or_white(path))
    }

    pub(crate) fn release(self) {
        self.texture.destroy();
    }
}
