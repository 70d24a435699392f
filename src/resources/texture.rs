//! Texture loading

use crate::backend::*;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to decode texture: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Texture path is empty")]
    EmptyPath,
}

/// Loaded texture data
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TextureError::EmptyPath);
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_image(img, &name))
    }

    /// Load texture from encoded bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }
}

/// Texture uploaded to the GPU
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub name: String,
}

impl GpuTexture {
    /// Create and upload texture to GPU
    pub fn create(backend: &mut dyn RenderBackend, data: &TextureData) -> BackendResult<Self> {
        let handle = backend.create_texture(
            &TextureDescriptor {
                label: Some(data.name.clone()),
                width: data.width,
                height: data.height,
                format: data.format,
                usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            },
            &data.data,
        )?;

        Ok(Self {
            handle,
            width: data.width,
            height: data.height,
            format: data.format,
            name: data.name.clone(),
        })
    }
}

/// Sampler for a texture with the given addressing, linear filtering
pub fn sampler_descriptor(label: &str, address_u: AddressMode, address_v: AddressMode) -> SamplerDescriptor {
    SamplerDescriptor {
        label: Some(label.to_string()),
        address_mode_u: address_u,
        address_mode_v: address_v,
        anisotropy_clamp: 16,
        ..Default::default()
    }
}
