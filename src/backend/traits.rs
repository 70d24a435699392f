//! Core backend abstraction traits
//!
//! The bridge only needs to create resources from descriptions, bind them
//! and issue indexed draws. Anything API-specific lives behind this trait.

use crate::backend::types::*;
use std::ops::Range;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Render device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create sampler: {0}")]
    SamplerCreationFailed(String),
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("Failed to create input layout: {0}")]
    InputLayoutCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u64);

        impl $name {
            /// Wrap a backend-assigned id
            pub fn from_raw(id: u64) -> Self {
                Self(id)
            }

            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

resource_handle!(
    /// Handle to a GPU buffer (vertex, index or constant)
    BufferHandle
);
resource_handle!(
    /// Handle to a GPU texture
    TextureHandle
);
resource_handle!(
    /// Handle to a sampler
    SamplerHandle
);
resource_handle!(
    /// Handle to a compiled shader stage
    ShaderHandle
);
resource_handle!(
    /// Handle to an input layout binding vertex streams to a vertex shader
    InputLayoutHandle
);

/// Render backend consumed by the bridge
pub trait RenderBackend {
    /// Whether a render device is available. The registry refuses to start without one.
    fn is_ready(&self) -> bool;

    // Resource creation

    /// Create a buffer with initial data
    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    /// Write data to a buffer
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Create a texture with RGBA pixel data
    fn create_texture(&mut self, desc: &TextureDescriptor, data: &[u8])
        -> BackendResult<TextureHandle>;

    /// Create a sampler
    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    /// Compile one shader stage from source
    fn create_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
        entry_point: &str,
    ) -> BackendResult<ShaderHandle>;

    /// Create an input layout for a vertex shader
    fn create_input_layout(
        &mut self,
        vertex_shader: ShaderHandle,
        streams: &[VertexBufferLayout],
    ) -> BackendResult<InputLayoutHandle>;

    // Command recording

    /// Bind a vertex/fragment shader pair
    fn set_shaders(&mut self, vertex: ShaderHandle, fragment: ShaderHandle);

    /// Bind an input layout
    fn set_input_layout(&mut self, layout: InputLayoutHandle);

    /// Set vertex buffer
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, stride: u64);

    /// Bind an index buffer of `u32` triangle-list indices
    fn set_index_buffer(&mut self, buffer: BufferHandle);

    /// Bind a constant buffer to a shader stage
    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle);

    /// Bind a texture to a fragment slot
    fn set_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Bind a sampler to a fragment slot
    fn set_sampler(&mut self, slot: u32, sampler: SamplerHandle);

    /// Draw indexed primitives
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    // Resource cleanup

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn destroy_sampler(&mut self, sampler: SamplerHandle);

    fn destroy_shader(&mut self, shader: ShaderHandle);

    fn destroy_input_layout(&mut self, layout: InputLayoutHandle);
}
