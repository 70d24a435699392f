//! Scene Bridge - mirrors a host scene DAG into a render-ready shadow graph
//!
//! The host application owns the authoritative scene. The bridge listens to
//! its notifications, keeps one shadow node per relevant host node and turns
//! them into GPU resources and draw calls through a render backend.
//!
//! # Layers
//! - [`host`]: the host graph interface, notification types and an in-memory host
//! - [`backend`]: the render backend interface and a recording backend
//! - [`resources`]: shader library, input layout cache and texture loading
//! - [`bridge`]: shadow nodes and the [`GraphRegistry`] driving update and draw

pub mod backend;
pub mod bridge;
pub mod host;
pub mod logging;
pub mod resources;

pub use backend::{RecordingBackend, RenderBackend};
pub use bridge::{BridgeError, DrawStats, GraphRegistry, NodeId, ShadingPath, TopologyError};
pub use host::{HostEvent, HostGraph, HostId, MemoryHost};
pub use logging::init_logging;
pub use resources::ShaderLibrary;

/// Configuration for a scene bridge session
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Technique used when a material's shader cannot be resolved
    pub default_technique: String,
    /// Host shading node type whose attributes select technique and vertex sources
    pub shader_node_type: String,
    /// Host plugin node type mirrored as the viewport settings node
    pub settings_node_type: String,
    /// Shading group that exists before the session starts
    pub default_shading_group: String,
    /// Flip the V texture coordinate of extracted geometry
    pub flip_texcoord_v: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_technique: resources::SIMPLE_MESH.to_string(),
            shader_node_type: "dx11Shader".to_string(),
            settings_node_type: "customViewportGlobals".to_string(),
            default_shading_group: "initialShadingGroup".to_string(),
            flip_texcoord_v: true,
        }
    }
}

impl BridgeConfig {
    pub fn with_default_technique(mut self, technique: impl Into<String>) -> Self {
        self.default_technique = technique.into();
        self
    }

    pub fn with_shader_node_type(mut self, type_name: impl Into<String>) -> Self {
        self.shader_node_type = type_name.into();
        self
    }

    pub fn with_settings_node_type(mut self, type_name: impl Into<String>) -> Self {
        self.settings_node_type = type_name.into();
        self
    }

    pub fn with_default_shading_group(mut self, name: impl Into<String>) -> Self {
        self.default_shading_group = name.into();
        self
    }

    pub fn with_flip_texcoord_v(mut self, flip: bool) -> Self {
        self.flip_texcoord_v = flip;
        self
    }
}
