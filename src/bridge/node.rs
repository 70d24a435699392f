//! Shadow node: the common base and the closed set of node kinds
//!
//! Hooks run while the node is moved out of the [`NodeTable`], so they may
//! read every other node. Effects on other nodes are queued as
//! [`GraphCommand`]s and applied by the registry once the hook returns.

use std::collections::{BTreeMap, HashMap};

use super::error::TopologyError;
use super::light::LightNode;
use super::material::MaterialNode;
use super::mesh::MeshNode;
use super::settings::SettingsNode;
use super::table::{NodeId, NodeTable};
use super::texture::TextureNode;
use super::transform::TransformNode;
use crate::backend::{BufferHandle, RenderBackend, SamplerHandle, TextureHandle};
use crate::host::{AttributeChange, HostGraph, HostId, Plug};
use crate::resources::{LayoutCache, ShaderLibrary};
use crate::BridgeConfig;

/// Discriminant of [`NodeKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowKind {
    Transform,
    Mesh,
    Material,
    Texture,
    Light,
    Settings,
}

/// Render path a draw pass belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingPath {
    /// Scene geometry
    #[default]
    Main,
    /// Overlays drawn by the host UI; meshes do not take part
    Ui,
}

/// State shared by every node kind
#[derive(Debug)]
pub struct NodeBase {
    id: NodeId,
    host: HostId,
    name: String,
    /// Connected node -> number of host links between the pair
    connections: BTreeMap<NodeId, u32>,
    isolated: bool,
}

impl NodeBase {
    pub fn new(id: NodeId, host: HostId, name: impl Into<String>) -> Self {
        Self {
            id,
            host,
            name: name.into(),
            connections: BTreeMap::new(),
            isolated: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn host(&self) -> HostId {
        self.host
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    pub(crate) fn set_isolated(&mut self, isolated: bool) {
        self.isolated = isolated;
    }

    /// Add one link to `other`, returning the new count
    pub(crate) fn connect(&mut self, other: NodeId) -> u32 {
        let count = self.connections.entry(other).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop one link to `other`, returning the remaining count
    pub(crate) fn disconnect(&mut self, other: NodeId) -> Result<u32, TopologyError> {
        let Some(count) = self.connections.get_mut(&other) else {
            return Err(TopologyError::NotConnected(self.id, other));
        };
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.connections.remove(&other);
        }
        Ok(remaining)
    }

    /// Forget `other` entirely
    pub(crate) fn sever(&mut self, other: NodeId) -> bool {
        self.connections.remove(&other).is_some()
    }

    pub fn connection_count(&self, other: NodeId) -> u32 {
        self.connections.get(&other).copied().unwrap_or(0)
    }

    pub fn is_connected(&self, other: NodeId) -> bool {
        self.connections.contains_key(&other)
    }

    pub fn connections(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.connections.keys().copied()
    }

    /// Connected node mirroring `host`, if any
    pub fn find_connected(&self, nodes: &NodeTable, host: HostId) -> Option<NodeId> {
        self.connections
            .keys()
            .copied()
            .find(|id| nodes.get(*id).map(|n| n.host() == host).unwrap_or(false))
    }
}

/// Cross-node effect requested from inside a hook
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCommand {
    Connect(NodeId, NodeId),
    Disconnect(NodeId, NodeId),
    /// Fan a dependency change out to every node connected to this one
    NotifyConnected(NodeId),
    /// Route notifications of a host shading node to a material
    Subscribe { material: NodeId, shading_node: HostId },
    Unsubscribe { material: NodeId, shading_node: HostId },
}

/// GPU resources waiting for a backend to be destroyed
#[derive(Debug, Default)]
pub struct ResourceGarbage {
    buffers: Vec<BufferHandle>,
    textures: Vec<TextureHandle>,
    samplers: Vec<SamplerHandle>,
}

impl ResourceGarbage {
    pub fn push_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.push(buffer);
    }

    pub fn push_texture(&mut self, texture: TextureHandle) {
        self.textures.push(texture);
    }

    pub fn push_sampler(&mut self, sampler: SamplerHandle) {
        self.samplers.push(sampler);
    }

    pub fn len(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if self.is_empty() {
            return;
        }
        log::debug!("Releasing {} queued GPU resources", self.len());
        for buffer in self.buffers.drain(..) {
            backend.destroy_buffer(buffer);
        }
        for texture in self.textures.drain(..) {
            backend.destroy_texture(texture);
        }
        for sampler in self.samplers.drain(..) {
            backend.destroy_sampler(sampler);
        }
    }
}

/// Context handed to notification hooks
pub struct HookContext<'a> {
    pub host: &'a dyn HostGraph,
    pub config: &'a BridgeConfig,
    pub shaders: &'a ShaderLibrary,
    pub nodes: &'a NodeTable,
    pub(crate) lookup: &'a HashMap<HostId, NodeId>,
    pub(crate) commands: &'a mut Vec<GraphCommand>,
}

impl HookContext<'_> {
    /// Shadow node mirroring a host node
    pub fn find_node(&self, host: HostId) -> Option<NodeId> {
        self.lookup.get(&host).copied()
    }

    pub fn push(&mut self, command: GraphCommand) {
        self.commands.push(command);
    }
}

/// Context handed to per-frame update
pub struct UpdateContext<'a> {
    pub host: &'a dyn HostGraph,
    pub config: &'a BridgeConfig,
    pub nodes: &'a NodeTable,
    pub backend: &'a mut dyn RenderBackend,
    pub layouts: &'a mut LayoutCache,
    pub time_changed: bool,
}

/// Context handed to draw; graph state is read-only
pub struct DrawContext<'a> {
    pub nodes: &'a NodeTable,
    pub backend: &'a mut dyn RenderBackend,
    pub path: ShadingPath,
    pub filtering: bool,
}

#[derive(Debug)]
pub enum NodeKind {
    Transform(TransformNode),
    Mesh(MeshNode),
    Material(MaterialNode),
    Texture(TextureNode),
    Light(LightNode),
    Settings(SettingsNode),
}

impl NodeKind {
    pub fn kind(&self) -> ShadowKind {
        match self {
            NodeKind::Transform(_) => ShadowKind::Transform,
            NodeKind::Mesh(_) => ShadowKind::Mesh,
            NodeKind::Material(_) => ShadowKind::Material,
            NodeKind::Texture(_) => ShadowKind::Texture,
            NodeKind::Light(_) => ShadowKind::Light,
            NodeKind::Settings(_) => ShadowKind::Settings,
        }
    }
}

/// Mirror of one host node
#[derive(Debug)]
pub struct ShadowNode {
    base: NodeBase,
    kind: NodeKind,
}

macro_rules! kind_accessors {
    ($($variant:ident => $get:ident, $get_mut:ident: $ty:ty;)*) => {
        $(
            pub fn $get(&self) -> Option<&$ty> {
                match &self.kind {
                    NodeKind::$variant(node) => Some(node),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                match &mut self.kind {
                    NodeKind::$variant(node) => Some(node),
                    _ => None,
                }
            }
        )*
    };
}

impl ShadowNode {
    pub fn new(base: NodeBase, kind: NodeKind) -> Self {
        Self { base, kind }
    }

    pub fn id(&self) -> NodeId {
        self.base.id
    }

    pub fn host(&self) -> HostId {
        self.base.host
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn kind(&self) -> ShadowKind {
        self.kind.kind()
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    pub(crate) fn split_mut(&mut self) -> (&NodeBase, &mut NodeKind) {
        (&self.base, &mut self.kind)
    }

    pub fn is_isolated(&self) -> bool {
        self.base.isolated
    }

    kind_accessors! {
        Transform => as_transform, as_transform_mut: TransformNode;
        Mesh => as_mesh, as_mesh_mut: MeshNode;
        Material => as_material, as_material_mut: MaterialNode;
        Texture => as_texture, as_texture_mut: TextureNode;
        Light => as_light, as_light_mut: LightNode;
        Settings => as_settings, as_settings_mut: SettingsNode;
    }

    /// Attribute of the mirrored host node changed
    pub fn on_attribute_changed(&mut self, ctx: &mut HookContext, change: &AttributeChange) {
        let base = &self.base;
        match &mut self.kind {
            NodeKind::Transform(node) => node.on_attribute_changed(change),
            NodeKind::Mesh(node) => node.on_attribute_changed(base, ctx, change),
            NodeKind::Material(node) => node.on_attribute_changed(base, ctx, change),
            NodeKind::Texture(node) => node.on_attribute_changed(base, ctx, change),
            NodeKind::Light(node) => node.on_attribute_changed(ctx, change),
            NodeKind::Settings(node) => node.on_attribute_changed(ctx, change),
        }
    }

    /// Plug of the mirrored host node was dirtied without an attribute event
    pub fn on_dirty(&mut self, ctx: &mut HookContext, plug: &Plug) {
        match &mut self.kind {
            NodeKind::Mesh(node) => node.on_dirty(plug),
            NodeKind::Light(node) => node.on_dirty(ctx, plug),
            NodeKind::Transform(node) => node.on_dirty(plug),
            _ => {}
        }
    }

    /// Notification from a host shading node this material subscribes to
    pub fn on_shading_attribute_changed(&mut self, ctx: &mut HookContext, change: &AttributeChange) {
        let base = &self.base;
        if let NodeKind::Material(node) = &mut self.kind {
            node.on_shading_attribute_changed(base, ctx, change);
        }
    }

    pub fn on_shading_dirty(&mut self, ctx: &mut HookContext, plug: &Plug) {
        let base = &self.base;
        if let NodeKind::Material(node) = &mut self.kind {
            node.on_shading_dirty(base, ctx, plug);
        }
    }

    /// Called by the registry when this node becomes a child of `parent`
    pub fn on_link_parent(&mut self, parent: NodeId) -> Result<(), TopologyError> {
        let id = self.base.id;
        match &mut self.kind {
            NodeKind::Transform(node) => node.link_parent(id, parent),
            NodeKind::Mesh(node) => node.link_parent(id, parent),
            NodeKind::Light(node) => node.link_parent(id, parent),
            _ => Err(TopologyError::NotDagNode(id)),
        }
    }

    pub fn on_unlink_parent(&mut self, parent: NodeId, garbage: &mut ResourceGarbage) {
        let base = &self.base;
        match &mut self.kind {
            NodeKind::Transform(node) => node.unlink_parent(parent),
            NodeKind::Mesh(node) => node.unlink_parent(base, parent, garbage),
            NodeKind::Light(node) => node.unlink_parent(parent),
            _ => {}
        }
    }

    pub fn on_parent_transform_changed(&mut self, parent: NodeId) {
        let base = &self.base;
        match &mut self.kind {
            NodeKind::Transform(node) => node.mark_world_dirty(),
            NodeKind::Mesh(node) => node.parent_transform_changed(base, parent),
            NodeKind::Light(node) => node.mark_dirty(),
            _ => {}
        }
    }

    /// Something a connected node depends on changed
    pub fn on_connection_notify(&mut self, from: NodeId) {
        if let NodeKind::Mesh(node) = &mut self.kind {
            log::trace!("Mesh {} notified by {}", self.base.name, from);
            node.mark_geometry_dirty();
        }
    }

    /// Connected node `other` is being destroyed
    pub fn on_connection_removed(&mut self, other: NodeId) {
        match &mut self.kind {
            NodeKind::Mesh(node) => node.mark_geometry_dirty(),
            NodeKind::Material(node) => node.forget_texture(other),
            _ => {}
        }
    }

    /// Per-frame update for every kind but transforms, which the registry
    /// walks itself
    pub fn update(&mut self, ctx: &mut UpdateContext) {
        let base = &self.base;
        match &mut self.kind {
            NodeKind::Mesh(node) => node.update(base, ctx),
            NodeKind::Texture(node) => node.update(base, ctx),
            NodeKind::Light(node) => node.update(ctx),
            NodeKind::Settings(node) => node.update(base, ctx),
            NodeKind::Transform(_) | NodeKind::Material(_) => {}
        }
    }

    /// Issue draw calls, returning how many
    pub fn draw(&self, ctx: &mut DrawContext) -> u32 {
        match &self.kind {
            NodeKind::Mesh(node) => node.draw(ctx),
            _ => 0,
        }
    }

    /// Hand every GPU resource this node owns to `garbage`
    pub fn release(&mut self, garbage: &mut ResourceGarbage) {
        match &mut self.kind {
            NodeKind::Mesh(node) => node.release(garbage),
            NodeKind::Texture(node) => node.release(garbage),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_base() -> (NodeTable, NodeId, NodeId) {
        let mut table = NodeTable::new();
        let a = table.insert_with(|id| {
            ShadowNode::new(
                NodeBase::new(id, HostId(1), "a"),
                NodeKind::Transform(TransformNode::new()),
            )
        });
        let b = table.insert_with(|id| {
            ShadowNode::new(
                NodeBase::new(id, HostId(2), "b"),
                NodeKind::Transform(TransformNode::new()),
            )
        });
        (table, a, b)
    }

    #[test]
    fn test_connections_are_counted() {
        let (mut table, a, b) = node_base();
        let base = table.get_mut(a).unwrap().base_mut();
        assert_eq!(base.connect(b), 1);
        assert_eq!(base.connect(b), 2);
        assert_eq!(base.disconnect(b), Ok(1));
        assert!(base.is_connected(b));
        assert_eq!(base.disconnect(b), Ok(0));
        assert!(!base.is_connected(b));
        assert_eq!(base.disconnect(b), Err(TopologyError::NotConnected(a, b)));
    }

    #[test]
    fn test_find_connected_by_host() {
        let (mut table, a, b) = node_base();
        table.get_mut(a).unwrap().base_mut().connect(b);
        let base = table.get(a).unwrap().base();
        assert_eq!(base.find_connected(&table, HostId(2)), Some(b));
        assert_eq!(base.find_connected(&table, HostId(3)), None);
    }

    #[test]
    fn test_take_and_restore() {
        let (mut table, a, b) = node_base();
        let node = table.take(a).unwrap();
        assert!(table.get(a).is_none());
        assert!(table.contains(a));
        assert!(table.remove(a).is_none());
        assert_eq!(table.get(b).map(|n| n.name()), Some("b"));
        table.restore(node);
        assert_eq!(table.get(a).map(|n| n.kind()), Some(ShadowKind::Transform));
    }

    #[test]
    fn test_stale_handles_do_not_resolve() {
        let (mut table, a, _) = node_base();
        assert!(table.remove(a).is_some());
        let c = table.insert_with(|id| {
            ShadowNode::new(
                NodeBase::new(id, HostId(3), "c"),
                NodeKind::Transform(TransformNode::new()),
            )
        });
        assert_eq!(c.index(), a.index());
        assert!(table.get(a).is_none());
        assert!(table.get(c).is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_garbage_release() {
        let mut backend = crate::backend::RecordingBackend::new();
        let buffer = backend
            .create_buffer_init(&crate::backend::BufferDescriptor::uniform("u", 64), &[0; 64])
            .unwrap();
        let mut garbage = ResourceGarbage::default();
        garbage.push_buffer(buffer);
        assert_eq!(garbage.len(), 1);
        garbage.release(&mut backend);
        assert!(garbage.is_empty());
        assert_eq!(backend.live_resource_count(), 0);
    }
}
