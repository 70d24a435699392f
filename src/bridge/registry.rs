//! Graph registry: owns every shadow node and drives update and draw

use std::collections::{BTreeSet, HashMap};

use glam::Mat4;

use super::error::{BridgeError, TopologyError};
use super::light::{GpuLightData, LightKind, LightNode};
use super::material::MaterialNode;
use super::mesh::MeshNode;
use super::node::{
    DrawContext, GraphCommand, HookContext, NodeBase, NodeKind, ResourceGarbage, ShadingPath,
    ShadowKind, ShadowNode, UpdateContext,
};
use super::settings::{SettingsNode, ViewportSettings};
use super::table::{NodeId, NodeTable};
use super::texture::TextureNode;
use super::transform::{world_matrix, TransformNode};
use crate::backend::RenderBackend;
use crate::host::{AttributeChange, HostEvent, HostGraph, HostId, HostNodeKind, Plug};
use crate::resources::{LayoutCache, ShaderLibrary};
use crate::BridgeConfig;

/// Deepest host hierarchy walked when building the isolation filter
const MAX_FILTER_DEPTH: usize = 256;

/// What one draw pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawStats {
    /// Nodes visited, in traversal order
    pub visited: Vec<NodeId>,
    pub draw_calls: u32,
}

pub struct GraphRegistry {
    config: BridgeConfig,
    shaders: ShaderLibrary,
    layouts: LayoutCache,
    nodes: NodeTable,
    lookup: HashMap<HostId, NodeId>,
    transforms: Vec<NodeId>,
    meshes: Vec<NodeId>,
    /// Materials and the textures they bind
    materials: Vec<NodeId>,
    lights: Vec<NodeId>,
    settings: Option<NodeId>,
    /// Host shading node -> materials using it as surface shader
    subscriptions: HashMap<HostId, BTreeSet<NodeId>>,
    filter: Vec<NodeId>,
    garbage: ResourceGarbage,
    time_changed: bool,
}

impl GraphRegistry {
    /// Create a registry for a render session.
    ///
    /// Fails if the backend has no device or the shader library lacks the
    /// configured default technique.
    pub fn new(
        config: BridgeConfig,
        shaders: ShaderLibrary,
        host: &dyn HostGraph,
        backend: &dyn RenderBackend,
    ) -> Result<Self, BridgeError> {
        if !backend.is_ready() {
            return Err(BridgeError::DeviceUnavailable);
        }
        if !shaders.contains(&config.default_technique) {
            return Err(BridgeError::MissingDefaultShader(config.default_technique.clone()));
        }

        let mut registry = Self {
            config,
            shaders,
            layouts: LayoutCache::new(),
            nodes: NodeTable::new(),
            lookup: HashMap::new(),
            transforms: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            settings: None,
            subscriptions: HashMap::new(),
            filter: Vec::new(),
            garbage: ResourceGarbage::default(),
            time_changed: false,
        };
        registry.register_default_shading_group(host);
        log::info!(
            "Scene bridge ready ({} shader techniques, default {})",
            registry.shaders.len(),
            registry.config.default_technique
        );
        Ok(registry)
    }

    fn register_default_shading_group(&mut self, host: &dyn HostGraph) {
        let Some(sg) = host.find_by_name(&self.config.default_shading_group) else {
            log::warn!("Default shading group {} not found", self.config.default_shading_group);
            return;
        };
        if host.kind(sg) != Some(HostNodeKind::ShadingGroup) {
            log::warn!("{} is not a shading group", self.config.default_shading_group);
            return;
        }
        let Some(material) = self.node_added(host, sg) else {
            return;
        };
        if let Some(shader) = host.incoming(sg, "surfaceShader").first() {
            if let Err(e) = self.connect_surface_shader(host, material, shader.node) {
                log::warn!("{}", e);
            }
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn layouts(&self) -> &LayoutCache {
        &self.layouts
    }

    pub fn node(&self, id: NodeId) -> Option<&ShadowNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn transforms(&self) -> &[NodeId] {
        &self.transforms
    }

    pub fn meshes(&self) -> &[NodeId] {
        &self.meshes
    }

    pub fn materials(&self) -> &[NodeId] {
        &self.materials
    }

    pub fn lights(&self) -> &[NodeId] {
        &self.lights
    }

    pub fn filter(&self) -> &[NodeId] {
        &self.filter
    }

    pub fn is_filtering(&self) -> bool {
        !self.filter.is_empty()
    }

    pub fn time_changed(&self) -> bool {
        self.time_changed
    }

    /// Resources waiting for the next update to be destroyed
    pub fn pending_releases(&self) -> usize {
        self.garbage.len()
    }

    /// Materials subscribed to a host shading node
    pub fn subscribers(&self, shading_node: HostId) -> impl Iterator<Item = NodeId> + '_ {
        self.subscriptions
            .get(&shading_node)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Shadow node mirroring a host node
    pub fn find_node(&self, host: HostId) -> Option<NodeId> {
        self.lookup.get(&host).copied()
    }

    /// Node connected to `node` that mirrors `host`
    pub fn find_connected(&self, node: NodeId, host: HostId) -> Option<NodeId> {
        self.nodes.get(node)?.base().find_connected(&self.nodes, host)
    }

    // Notifications

    /// Dispatch one host notification
    pub fn handle_event(&mut self, host: &dyn HostGraph, event: &HostEvent) {
        match event {
            HostEvent::NodeAdded(node) => {
                self.node_added(host, *node);
            }
            HostEvent::NodeRemoved(node) => {
                self.node_removed(host, *node);
            }
            HostEvent::ChildAdded { parent, child } => self.host_child_added(*parent, *child),
            HostEvent::ChildRemoved { parent, child } => self.host_child_removed(*parent, *child),
            HostEvent::AttributeChanged(change) => self.attribute_changed(host, change),
            HostEvent::DirtyPlug(plug) => self.dirty_plug(host, plug),
            HostEvent::TimeChanged => self.time_changed = true,
        }
    }

    /// Mirror a newly added host node. Returns the new node, or the existing
    /// one if the host node is already mirrored.
    pub fn node_added(&mut self, host: &dyn HostGraph, node: HostId) -> Option<NodeId> {
        if let Some(existing) = self.lookup.get(&node) {
            log::warn!("Host node {} is already mirrored", node);
            return Some(*existing);
        }
        let Some(host_kind) = host.kind(node) else {
            log::warn!("Added host node {} cannot be resolved", node);
            return None;
        };

        let kind = match host_kind {
            HostNodeKind::Transform => NodeKind::Transform(TransformNode::new()),
            HostNodeKind::Mesh => NodeKind::Mesh(MeshNode::new()),
            HostNodeKind::ShadingGroup => {
                NodeKind::Material(MaterialNode::new(self.shaders.find(&self.config.default_technique)))
            }
            HostNodeKind::FileTexture => NodeKind::Texture(TextureNode::new()),
            HostNodeKind::DirectionalLight => NodeKind::Light(LightNode::new(LightKind::Directional)),
            HostNodeKind::PointLight => NodeKind::Light(LightNode::new(LightKind::Point)),
            HostNodeKind::Plugin if self.is_settings_node(host, node) => {
                NodeKind::Settings(SettingsNode::new())
            }
            _ => return None,
        };
        let shadow_kind = kind.kind();
        let name = host.name(node).unwrap_or_default().to_string();

        let id = self
            .nodes
            .insert_with(|id| ShadowNode::new(NodeBase::new(id, node, name), kind));
        self.lookup.insert(node, id);
        match shadow_kind {
            ShadowKind::Transform => self.transforms.push(id),
            ShadowKind::Mesh => self.meshes.push(id),
            ShadowKind::Material | ShadowKind::Texture => self.materials.push(id),
            ShadowKind::Light => self.lights.push(id),
            ShadowKind::Settings => self.settings = Some(id),
        }
        log::debug!(
            "Added {:?} node {} for {} ({})",
            shadow_kind,
            id,
            node,
            host.name(node).unwrap_or_default()
        );
        Some(id)
    }

    fn is_settings_node(&self, host: &dyn HostGraph, node: HostId) -> bool {
        self.settings.is_none()
            && host.type_name(node) == Some(self.config.settings_node_type.as_str())
            && host.namespace(node).map(str::is_empty).unwrap_or(false)
    }

    /// Destroy the mirror of a removed host node. A removed surface shader
    /// that is not mirrored itself drops its subscribers back to the default
    /// technique.
    pub fn node_removed(&mut self, host: &dyn HostGraph, node: HostId) -> bool {
        let Some(id) = self.lookup.get(&node).copied() else {
            self.shading_node_removed(host, node);
            return false;
        };
        self.destroy_node(id);
        true
    }

    fn shading_node_removed(&mut self, host: &dyn HostGraph, node: HostId) {
        let Some(materials) = self.subscriptions.remove(&node) else {
            return;
        };
        for material in materials {
            let result = self.material_hook(host, material, |m, base, ctx| {
                if m.surface_shader() == Some(node) {
                    m.drop_surface_shader(base, ctx);
                }
            });
            if let Err(e) = result {
                log::warn!("{}", e);
            }
        }
        log::debug!("Surface shader {} removed", node);
    }

    fn destroy_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let host = node.host();
        let kind = node.kind();
        let connections: Vec<NodeId> = node.base().connections().collect();
        let (parents, children) = match node_links(node) {
            Some(links) => links,
            None => (Vec::new(), Vec::new()),
        };

        for parent in parents {
            self.remove_child(parent, id);
        }
        for child in children {
            self.remove_child(id, child);
        }
        for other in connections {
            if let Some(other) = self.nodes.get_mut(other) {
                other.base_mut().sever(id);
                other.on_connection_removed(id);
            }
        }
        self.subscriptions.retain(|_, materials| {
            materials.remove(&id);
            !materials.is_empty()
        });
        self.filter.retain(|f| *f != id);

        let list = match kind {
            ShadowKind::Transform => Some(&mut self.transforms),
            ShadowKind::Mesh => Some(&mut self.meshes),
            ShadowKind::Material | ShadowKind::Texture => Some(&mut self.materials),
            ShadowKind::Light => Some(&mut self.lights),
            ShadowKind::Settings => None,
        };
        match list {
            Some(list) => list.retain(|n| *n != id),
            None => self.settings = None,
        }
        self.lookup.remove(&host);

        if let Some(mut node) = self.nodes.remove(id) {
            node.release(&mut self.garbage);
            log::debug!("Removed {:?} node {} for {}", kind, id, host);
        }
    }

    fn host_child_added(&mut self, parent: HostId, child: HostId) {
        let (Some(parent_id), Some(child_id)) = (self.find_node(parent), self.find_node(child)) else {
            log::trace!("Ignoring child {} of {}: not mirrored", child, parent);
            return;
        };
        if let Err(e) = self.add_child(parent_id, child_id) {
            log::error!("{}", e);
        }
    }

    fn host_child_removed(&mut self, parent: HostId, child: HostId) {
        if let (Some(parent_id), Some(child_id)) = (self.find_node(parent), self.find_node(child)) {
            self.remove_child(parent_id, child_id);
        }
    }

    fn attribute_changed(&mut self, host: &dyn HostGraph, change: &AttributeChange) {
        let node = change.plug.node;
        if let Some(id) = self.find_node(node) {
            self.with_hook(host, id, |n, ctx| n.on_attribute_changed(ctx, change));
        }
        for material in self.subscribers(node).collect::<Vec<_>>() {
            self.with_hook(host, material, |n, ctx| {
                n.on_shading_attribute_changed(ctx, change)
            });
        }
    }

    fn dirty_plug(&mut self, host: &dyn HostGraph, plug: &Plug) {
        if let Some(id) = self.find_node(plug.node) {
            self.with_hook(host, id, |n, ctx| n.on_dirty(ctx, plug));
        }
        for material in self.subscribers(plug.node).collect::<Vec<_>>() {
            self.with_hook(host, material, |n, ctx| n.on_shading_dirty(ctx, plug));
        }
    }

    /// Run a hook with the node moved out of the table, then apply the
    /// commands it queued
    fn with_hook<R>(
        &mut self,
        host: &dyn HostGraph,
        id: NodeId,
        hook: impl FnOnce(&mut ShadowNode, &mut HookContext) -> R,
    ) -> Option<R> {
        let mut node = self.nodes.take(id)?;
        let mut commands = Vec::new();
        let result = {
            let mut ctx = HookContext {
                host,
                config: &self.config,
                shaders: &self.shaders,
                nodes: &self.nodes,
                lookup: &self.lookup,
                commands: &mut commands,
            };
            hook(&mut node, &mut ctx)
        };
        self.nodes.restore(node);
        self.apply(commands);
        Some(result)
    }

    fn apply(&mut self, commands: Vec<GraphCommand>) {
        for command in commands {
            match command {
                GraphCommand::Connect(a, b) => {
                    if let Err(e) = self.connect(a, b) {
                        log::warn!("{}", e);
                    }
                }
                GraphCommand::Disconnect(a, b) => {
                    if let Err(e) = self.disconnect(a, b) {
                        log::warn!("{}", e);
                    }
                }
                GraphCommand::NotifyConnected(from) => self.notify_connected_all(from),
                GraphCommand::Subscribe {
                    material,
                    shading_node,
                } => {
                    self.subscriptions
                        .entry(shading_node)
                        .or_default()
                        .insert(material);
                }
                GraphCommand::Unsubscribe {
                    material,
                    shading_node,
                } => {
                    if let Some(materials) = self.subscriptions.get_mut(&shading_node) {
                        materials.remove(&material);
                        if materials.is_empty() {
                            self.subscriptions.remove(&shading_node);
                        }
                    }
                }
            }
        }
    }

    // Topology

    /// Parent `child` under the transform `parent`. Returns false if the
    /// child was already present.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, TopologyError> {
        if parent == child {
            return Err(TopologyError::Cycle { parent, child });
        }
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or(TopologyError::StaleNode(parent))?
            .as_transform()
            .ok_or(TopologyError::WrongKind {
                node: parent,
                expected: ShadowKind::Transform,
            })?;
        if parent_node.has_child(child) {
            return Ok(false);
        }
        if !self.nodes.contains(child) {
            return Err(TopologyError::StaleNode(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(TopologyError::Cycle { parent, child });
        }

        self.nodes
            .get_mut(child)
            .ok_or(TopologyError::StaleNode(child))?
            .on_link_parent(parent)?;
        if let Some(transform) = self.nodes.get_mut(parent).and_then(|n| n.as_transform_mut()) {
            transform.add_child(child);
        }
        log::debug!("Parented {} under {}", child, parent);
        Ok(true)
    }

    /// Whether `ancestor` is `node` or above it in the transform chain
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut depth = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            depth += 1;
            if depth > self.transforms.len() {
                return true;
            }
            current = self
                .nodes
                .get(id)
                .and_then(|n| n.as_transform())
                .and_then(|t| t.parent());
        }
        false
    }

    /// Unparent `child`. Returns false if it was not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(parent)
            .and_then(|n| n.as_transform_mut())
            .map(|t| t.remove_child(child))
            .unwrap_or(false);
        if !removed {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.on_unlink_parent(parent, &mut self.garbage);
        }
        log::debug!("Unparented {} from {}", child, parent);
        true
    }

    /// Add one link between two nodes, returning the new count
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<u32, TopologyError> {
        if a == b {
            return Err(TopologyError::SelfConnection(a));
        }
        for id in [a, b] {
            if self.nodes.get(id).is_none() {
                return Err(TopologyError::StaleNode(id));
            }
        }
        let mut count = 0;
        if let Some(node) = self.nodes.get_mut(a) {
            count = node.base_mut().connect(b);
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.base_mut().connect(a);
        }
        log::debug!("Connected {} <-> {} ({})", a, b, count);
        Ok(count)
    }

    /// Drop one link between two nodes, returning the remaining count.
    /// Disconnecting an unconnected pair changes nothing.
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> Result<u32, TopologyError> {
        let connected = self
            .nodes
            .get(a)
            .map(|n| n.base().is_connected(b))
            .unwrap_or(false);
        if !connected {
            return Err(TopologyError::NotConnected(a, b));
        }
        let mut remaining = 0;
        if let Some(node) = self.nodes.get_mut(a) {
            remaining = node.base_mut().disconnect(b)?;
        }
        if let Some(node) = self.nodes.get_mut(b) {
            if let Err(e) = node.base_mut().disconnect(a) {
                log::error!("Asymmetric connection: {}", e);
            }
        }
        log::debug!("Disconnected {} <-> {} ({} left)", a, b, remaining);
        Ok(remaining)
    }

    /// Tell every node connected to `from` that something it depends on
    /// changed
    pub fn notify_connected_all(&mut self, from: NodeId) {
        let Some(connected) = self
            .nodes
            .get(from)
            .map(|n| n.base().connections().collect::<Vec<_>>())
        else {
            return;
        };
        for id in connected {
            if let Some(node) = self.nodes.get_mut(id) {
                node.on_connection_notify(from);
            }
        }
    }

    fn material_hook(
        &mut self,
        host: &dyn HostGraph,
        material: NodeId,
        hook: impl FnOnce(&mut MaterialNode, &NodeBase, &mut HookContext),
    ) -> Result<(), TopologyError> {
        match self.nodes.get(material) {
            None => return Err(TopologyError::StaleNode(material)),
            Some(node) if node.as_material().is_none() => {
                return Err(TopologyError::WrongKind {
                    node: material,
                    expected: ShadowKind::Material,
                })
            }
            Some(_) => {}
        }
        self.with_hook(host, material, |node, ctx| {
            let (base, kind) = node.split_mut();
            if let NodeKind::Material(m) = kind {
                hook(m, base, ctx);
            }
        });
        Ok(())
    }

    pub fn connect_surface_shader(
        &mut self,
        host: &dyn HostGraph,
        material: NodeId,
        shader: HostId,
    ) -> Result<(), TopologyError> {
        self.material_hook(host, material, |m, base, ctx| {
            m.connect_surface_shader(base, ctx, shader)
        })
    }

    pub fn disconnect_surface_shader(&mut self, host: &dyn HostGraph, material: NodeId) -> Result<(), TopologyError> {
        self.material_hook(host, material, |m, base, ctx| m.drop_surface_shader(base, ctx))
    }

    /// Bind a texture to the slot named by `attribute`; unknown slot names
    /// are ignored
    pub fn connect_texture(
        &mut self,
        host: &dyn HostGraph,
        material: NodeId,
        attribute: &str,
        texture: HostId,
    ) -> Result<(), TopologyError> {
        self.material_hook(host, material, |m, base, ctx| {
            m.connect_texture(base, ctx, attribute, texture)
        })
    }

    pub fn disconnect_texture(
        &mut self,
        host: &dyn HostGraph,
        material: NodeId,
        attribute: &str,
    ) -> Result<(), TopologyError> {
        self.material_hook(host, material, |m, base, ctx| {
            m.disconnect_texture(base, ctx, attribute)
        })
    }

    // Isolation filter

    /// Restrict drawing to the mirrors of `roots` and their host
    /// descendants, replacing any previous filter
    pub fn set_filter(&mut self, host: &dyn HostGraph, roots: &[HostId]) {
        self.clear_filter();
        for root in roots {
            self.add_to_filter(host, *root, 0);
        }
        log::debug!("Isolation filter holds {} nodes", self.filter.len());
    }

    fn add_to_filter(&mut self, host: &dyn HostGraph, node: HostId, depth: usize) {
        if depth > MAX_FILTER_DEPTH {
            log::warn!("Isolation filter stops at depth {} below {}", depth, node);
            return;
        }
        if let Some(id) = self.find_node(node) {
            if let Some(shadow) = self.nodes.get_mut(id) {
                shadow.base_mut().set_isolated(true);
                if !self.filter.contains(&id) {
                    self.filter.push(id);
                }
            }
        }
        for child in host.children(node) {
            self.add_to_filter(host, child, depth + 1);
        }
    }

    pub fn clear_filter(&mut self) {
        for id in self.filter.drain(..) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.base_mut().set_isolated(false);
            }
        }
    }

    // Frame

    /// Bring every node up to date for the coming draw
    pub fn update_all(&mut self, host: &dyn HostGraph, backend: &mut dyn RenderBackend) {
        self.garbage.release(backend);

        self.initialize_transforms(host);
        self.update_transforms(host);

        if let Some(settings) = self.settings {
            self.update_node(host, backend, settings);
        }
        for i in 0..self.materials.len() {
            let id = self.materials[i];
            self.update_node(host, backend, id);
        }
        for i in 0..self.meshes.len() {
            let id = self.meshes[i];
            self.update_node(host, backend, id);
        }
        for i in 0..self.lights.len() {
            let id = self.lights[i];
            self.update_node(host, backend, id);
        }
        self.time_changed = false;
    }

    /// Pick up host children that existed before their parent was mirrored
    fn initialize_transforms(&mut self, host: &dyn HostGraph) {
        for i in 0..self.transforms.len() {
            let id = self.transforms[i];
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let host_id = node.host();
            match node.as_transform_mut() {
                Some(transform) if !transform.is_initialized() => transform.mark_initialized(),
                _ => continue,
            }
            for child in host.children(host_id) {
                if let Some(child_id) = self.find_node(child) {
                    if let Err(e) = self.add_child(id, child_id) {
                        log::error!("{}", e);
                    }
                }
            }
        }
    }

    /// Depth-first, parents before children
    fn update_transforms(&mut self, host: &dyn HostGraph) {
        let mut stack: Vec<NodeId> = self
            .transforms
            .iter()
            .rev()
            .copied()
            .filter(|id| {
                self.nodes
                    .get(*id)
                    .and_then(|n| n.as_transform())
                    .map(|t| t.parent().is_none())
                    .unwrap_or(false)
            })
            .collect();

        while let Some(id) = stack.pop() {
            let parent_world: Option<Mat4> = self
                .nodes
                .get(id)
                .and_then(|n| n.as_transform())
                .and_then(|t| t.parent())
                .and_then(|p| world_matrix(&self.nodes, p));
            let time_changed = self.time_changed;
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let host_id = node.host();
            let Some(transform) = node.as_transform_mut() else {
                continue;
            };
            let changed = transform.refresh(host, host_id, parent_world, time_changed);
            let children = transform.children().to_vec();

            if changed {
                for child in &children {
                    if let Some(child) = self.nodes.get_mut(*child) {
                        child.on_parent_transform_changed(id);
                    }
                }
            }
            for child in children.iter().rev() {
                if self.nodes.get(*child).map(|n| n.as_transform().is_some()).unwrap_or(false) {
                    stack.push(*child);
                }
            }
        }
    }

    fn update_node(&mut self, host: &dyn HostGraph, backend: &mut dyn RenderBackend, id: NodeId) {
        let Some(mut node) = self.nodes.take(id) else {
            return;
        };
        {
            let mut ctx = UpdateContext {
                host,
                config: &self.config,
                nodes: &self.nodes,
                backend: &mut *backend,
                layouts: &mut self.layouts,
                time_changed: self.time_changed,
            };
            node.update(&mut ctx);
        }
        self.nodes.restore(node);
    }

    /// Issue the draw calls for one render path. Graph state is not touched.
    pub fn draw_all(&self, backend: &mut dyn RenderBackend, path: ShadingPath) -> DrawStats {
        let filtering = self.is_filtering();
        let order: Vec<NodeId> = if filtering {
            self.filter.clone()
        } else {
            self.meshes.iter().chain(self.lights.iter()).copied().collect()
        };

        let mut ctx = DrawContext {
            nodes: &self.nodes,
            backend,
            path,
            filtering,
        };
        let mut stats = DrawStats::default();
        for id in order {
            if let Some(node) = self.nodes.get(id) {
                stats.visited.push(id);
                stats.draw_calls += node.draw(&mut ctx);
            }
        }
        stats
    }

    /// Records of the lights parented under visible transforms
    pub fn light_data(&self) -> Vec<GpuLightData> {
        self.lights
            .iter()
            .filter_map(|id| self.nodes.get(*id).and_then(|n| n.as_light()))
            .filter(|light| light.is_visible(&self.nodes))
            .map(LightNode::to_gpu_data)
            .collect()
    }

    pub fn settings(&self) -> ViewportSettings {
        self.settings
            .and_then(|id| self.nodes.get(id))
            .and_then(|n| n.as_settings())
            .map(SettingsNode::settings)
            .unwrap_or_default()
    }

    /// Swap in a new shader library. Materials re-resolve their techniques
    /// and every mesh rebuilds on the next update.
    pub fn reload_shaders(
        &mut self,
        backend: &mut dyn RenderBackend,
        mut shaders: ShaderLibrary,
    ) -> Result<(), BridgeError> {
        if !shaders.contains(&self.config.default_technique) {
            shaders.destroy_all(backend);
            return Err(BridgeError::MissingDefaultShader(
                self.config.default_technique.clone(),
            ));
        }

        for id in &self.meshes {
            if let Some(mesh) = self.nodes.get_mut(*id).and_then(|n| n.as_mesh_mut()) {
                mesh.discard_geometry(backend);
            }
        }
        self.layouts.clear(backend);
        let mut previous = std::mem::replace(&mut self.shaders, shaders);
        previous.destroy_all(backend);

        for id in &self.materials {
            if let Some(material) = self.nodes.get_mut(*id).and_then(|n| n.as_material_mut()) {
                material.reresolve(&self.shaders, &self.config);
            }
        }
        log::info!("Reloaded {} shader techniques", self.shaders.len());
        Ok(())
    }

    /// Release every GPU resource the graph owns
    pub fn shutdown(mut self, backend: &mut dyn RenderBackend) {
        self.clear_filter();
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id()).collect();
        for id in ids {
            if let Some(mut node) = self.nodes.remove(id) {
                node.release(&mut self.garbage);
            }
        }
        self.garbage.release(backend);
        self.layouts.clear(backend);
        self.shaders.destroy_all(backend);
        log::info!("Scene bridge shut down");
    }
}

/// Parents and children of a node in the transform hierarchy
fn node_links(node: &ShadowNode) -> Option<(Vec<NodeId>, Vec<NodeId>)> {
    if let Some(transform) = node.as_transform() {
        return Some((transform.parent().into_iter().collect(), transform.children().to_vec()));
    }
    if let Some(mesh) = node.as_mesh() {
        return Some((mesh.instances().map(|(t, _)| t).collect(), Vec::new()));
    }
    node.as_light()
        .map(|light| (light.parent().into_iter().collect(), Vec::new()))
}
