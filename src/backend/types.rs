//! Common types shared between the bridge and render backends

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Pixel layout of a texture upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        const COPY_DST = 1 << 0;
        const TEXTURE_BINDING = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const COPY_DST = 1 << 0;
        const INDEX = 1 << 1;
        const VERTEX = 1 << 2;
        const UNIFORM = 1 << 3;
    }
}

/// Texture descriptor
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

/// Buffer descriptor
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn vertex(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: Some(label.into()),
            size,
            usage: BufferUsage::VERTEX,
        }
    }

    pub fn index(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: Some(label.into()),
            size,
            usage: BufferUsage::INDEX,
        }
    }

    pub fn uniform(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: Some(label.into()),
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }
    }
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }

    /// Number of f32 components
    pub fn components(&self) -> usize {
        match self {
            VertexFormat::Float32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Float32x4 => 4,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// One per-vertex stream of an input layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// One vertex input a shader can consume.
///
/// The discriminant is both the shader input location and the bit index
/// in [`VertexChannels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexChannel {
    Position = 0,
    Normal = 1,
    Color = 2,
    TexCoord0 = 3,
    TexCoord1 = 4,
    TexCoord2 = 5,
    TexCoord3 = 6,
    Tangent = 7,
    Bitangent = 8,
}

/// Number of texcoord sets a shader may declare
pub const TEXCOORD_SET_COUNT: usize = 4;

impl VertexChannel {
    /// All channels in vertex stream order
    pub const ALL: [VertexChannel; 9] = [
        VertexChannel::Position,
        VertexChannel::Normal,
        VertexChannel::Color,
        VertexChannel::TexCoord0,
        VertexChannel::TexCoord1,
        VertexChannel::TexCoord2,
        VertexChannel::TexCoord3,
        VertexChannel::Tangent,
        VertexChannel::Bitangent,
    ];

    pub fn from_location(location: u32) -> Option<Self> {
        Self::ALL.get(location as usize).copied()
    }

    pub fn location(&self) -> u32 {
        *self as u32
    }

    pub fn texcoord(set: usize) -> Option<Self> {
        match set {
            0 => Some(VertexChannel::TexCoord0),
            1 => Some(VertexChannel::TexCoord1),
            2 => Some(VertexChannel::TexCoord2),
            3 => Some(VertexChannel::TexCoord3),
            _ => None,
        }
    }

    pub fn format(&self) -> VertexFormat {
        match self {
            VertexChannel::Color => VertexFormat::Float32x4,
            VertexChannel::TexCoord0
            | VertexChannel::TexCoord1
            | VertexChannel::TexCoord2
            | VertexChannel::TexCoord3 => VertexFormat::Float32x2,
            _ => VertexFormat::Float32x3,
        }
    }

    pub fn flag(&self) -> VertexChannels {
        VertexChannels::from_bits_truncate(1 << self.location())
    }

    pub fn name(&self) -> &'static str {
        match self {
            VertexChannel::Position => "position",
            VertexChannel::Normal => "normal",
            VertexChannel::Color => "color",
            VertexChannel::TexCoord0 => "texcoord0",
            VertexChannel::TexCoord1 => "texcoord1",
            VertexChannel::TexCoord2 => "texcoord2",
            VertexChannel::TexCoord3 => "texcoord3",
            VertexChannel::Tangent => "tangent",
            VertexChannel::Bitangent => "bitangent",
        }
    }
}

bitflags! {
    /// Set of vertex channels, e.g. the inputs a vertex shader declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexChannels: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const COLOR = 1 << 2;
        const TEXCOORD0 = 1 << 3;
        const TEXCOORD1 = 1 << 4;
        const TEXCOORD2 = 1 << 5;
        const TEXCOORD3 = 1 << 6;
        const TANGENT = 1 << 7;
        const BITANGENT = 1 << 8;
    }
}

impl VertexChannels {
    /// Channels present in this set, in vertex stream order
    pub fn channels(&self) -> impl Iterator<Item = VertexChannel> + '_ {
        VertexChannel::ALL
            .into_iter()
            .filter(move |c| self.contains(c.flag()))
    }

    /// Texcoord sets are consumed contiguously from set 0; a gap ends the run.
    pub fn texcoord_sets(&self) -> usize {
        (0..TEXCOORD_SET_COUNT)
            .take_while(|&set| {
                VertexChannel::texcoord(set)
                    .map(|c| self.contains(c.flag()))
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Per-instance uniform data, bound at constant buffer slot 1.
///
/// `local_to_world` is stored transposed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub local_to_world: Mat4,
}

/// Constant buffer slot the per-instance uniform is bound to
pub const OBJECT_UNIFORM_SLOT: u32 = 1;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Address mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Sampler descriptor. Filtering is always trilinear.
#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub anisotropy_clamp: u16,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            anisotropy_clamp: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_flags_match_locations() {
        for channel in VertexChannel::ALL {
            assert_eq!(channel.flag().bits(), 1 << channel.location());
            assert_eq!(VertexChannel::from_location(channel.location()), Some(channel));
        }
        assert_eq!(VertexChannel::from_location(9), None);
    }

    #[test]
    fn channels_iterate_in_stream_order() {
        let set = VertexChannels::TANGENT | VertexChannels::POSITION | VertexChannels::TEXCOORD0;
        let order: Vec<_> = set.channels().collect();
        assert_eq!(
            order,
            vec![VertexChannel::Position, VertexChannel::TexCoord0, VertexChannel::Tangent]
        );
    }

    #[test]
    fn texcoord_sets_stop_at_gap() {
        let set = VertexChannels::TEXCOORD0 | VertexChannels::TEXCOORD1 | VertexChannels::TEXCOORD3;
        assert_eq!(set.texcoord_sets(), 2);
        assert_eq!(VertexChannels::POSITION.texcoord_sets(), 0);
    }
}
