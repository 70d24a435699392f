//! Common utilities for bridge integration tests.
//!
//! A [`Scene`] couples an in-memory host, a recording backend and a graph
//! registry so tests can mutate the host and run frames the way a render
//! override would.

#![allow(dead_code)]

use glam::Mat4;

use scene_bridge::backend::{ObjectUniform, RecordingBackend};
use scene_bridge::bridge::{MaterialNode, MeshNode, ShadowNode, TransformNode};
use scene_bridge::host::{AttributeValue, HostId, MeshData};
use scene_bridge::{
    BridgeConfig, DrawStats, GraphRegistry, MemoryHost, NodeId, ShaderLibrary, ShadingPath,
};

pub const DEFAULT_SHADING_GROUP: &str = "initialShadingGroup";

/// Tolerance for comparing composed matrices
pub const EPSILON: f32 = 1e-5;

pub struct Scene {
    pub host: MemoryHost,
    pub backend: RecordingBackend,
    pub registry: GraphRegistry,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let host = MemoryHost::with_default_shading_group(DEFAULT_SHADING_GROUP);
        let mut backend = RecordingBackend::new();
        let shaders = ShaderLibrary::with_builtin(&mut backend).expect("built-in shaders compile");
        let registry =
            GraphRegistry::new(config, shaders, &host, &backend).expect("registry creation");
        Self {
            host,
            backend,
            registry,
        }
    }

    /// Deliver every queued host notification
    pub fn sync(&mut self) {
        for event in self.host.take_events() {
            self.registry.handle_event(&self.host, &event);
        }
    }

    /// Sync, update and draw the main path. Commands from earlier frames
    /// are discarded first.
    pub fn frame(&mut self) -> DrawStats {
        self.sync();
        self.backend.clear_commands();
        self.registry.update_all(&self.host, &mut self.backend);
        self.registry.draw_all(&mut self.backend, ShadingPath::Main)
    }

    pub fn id(&self, host: HostId) -> NodeId {
        self.registry
            .find_node(host)
            .unwrap_or_else(|| panic!("host node {} is not mirrored", host))
    }

    pub fn node(&self, host: HostId) -> &ShadowNode {
        let id = self.id(host);
        self.registry.node(id).expect("live shadow node")
    }

    pub fn transform(&self, host: HostId) -> &TransformNode {
        self.node(host).as_transform().expect("transform node")
    }

    pub fn mesh(&self, host: HostId) -> &MeshNode {
        self.node(host).as_mesh().expect("mesh node")
    }

    pub fn material(&self, host: HostId) -> &MaterialNode {
        self.node(host).as_material().expect("material node")
    }

    /// A shading group whose surface shader is a `dx11Shader` running
    /// `technique`. Returns (shading group, shader).
    pub fn create_material(&mut self, name: &str, technique: &str) -> (HostId, HostId) {
        let sg = self.host.create_shading_group(&format!("{name}SG"));
        let shader = self.host.create_shader(name, "dx11Shader");
        self.host.set_attribute_silently(
            shader,
            "technique",
            AttributeValue::String(technique.to_string()),
        );
        self.host.connect_surface_shader(shader, sg);
        (sg, shader)
    }

    /// A plane mesh under a fresh transform, assigned to `sg`. Returns
    /// (transform, mesh).
    pub fn create_mesh_under(&mut self, name: &str, sg: HostId) -> (HostId, HostId) {
        let transform = self.host.create_transform(name);
        let mesh = self
            .host
            .create_mesh(&format!("{name}Shape"), MeshData::plane(1.0, 1.0, 1));
        self.host.parent(mesh, transform);
        self.host.assign_material(mesh, sg);
        (transform, mesh)
    }

    pub fn default_shading_group(&self) -> HostId {
        use scene_bridge::host::HostGraph;
        self.host
            .find_by_name(DEFAULT_SHADING_GROUP)
            .expect("default shading group")
    }

    /// Matrix stored in an instance uniform, un-transposed
    pub fn uniform_matrix(&self, mesh: HostId, transform: HostId) -> Mat4 {
        let instance = self
            .mesh(mesh)
            .instance(self.id(transform))
            .expect("mesh instance");
        let uniform = instance.uniform().expect("instance uniform");
        let bytes = self.backend.buffer_contents(uniform).expect("uniform contents");
        let data: ObjectUniform = bytemuck::pod_read_unaligned(bytes);
        data.local_to_world.transpose()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
