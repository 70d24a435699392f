//! Transform node: local/world matrices, visibility and DAG children

use glam::Mat4;

use super::error::TopologyError;
use super::table::{NodeId, NodeTable};
use crate::host::{AttributeChange, AttributeMessage, HostGraph, HostId, LocalTransform, Plug};

/// Attributes that feed the local matrix
const TRANSFORM_ATTRIBUTES: [&str; 12] = [
    "t", "r", "s", "tx", "ty", "tz", "rx", "ry", "rz", "sx", "sy", "sz",
];

/// Deepest hierarchy walked when resolving visibility
const MAX_DEPTH: usize = 1024;

fn is_transform_attribute(plug: &Plug) -> bool {
    TRANSFORM_ATTRIBUTES.iter().any(|name| plug.is(name))
}

#[derive(Debug)]
pub struct TransformNode {
    local: LocalTransform,
    world: Mat4,
    visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local_dirty: bool,
    world_dirty: bool,
    initialized: bool,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformNode {
    pub fn new() -> Self {
        Self {
            local: LocalTransform::default(),
            world: Mat4::IDENTITY,
            visible: true,
            parent: None,
            children: Vec::new(),
            local_dirty: true,
            world_dirty: true,
            initialized: false,
        }
    }

    pub fn local(&self) -> &LocalTransform {
        &self.local
    }

    pub fn world(&self) -> Mat4 {
        self.world
    }

    /// Own visibility, ignoring ancestors
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_child(&self, child: NodeId) -> bool {
        self.children.contains(&child)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dirty(&self) -> bool {
        self.local_dirty || self.world_dirty
    }

    pub(crate) fn on_attribute_changed(&mut self, change: &AttributeChange) {
        if change.has(AttributeMessage::ATTRIBUTE_SET) && is_transform_attribute(&change.plug) {
            self.local_dirty = true;
        }
    }

    pub(crate) fn on_dirty(&mut self, plug: &Plug) {
        if is_transform_attribute(plug) {
            self.local_dirty = true;
        }
    }

    pub(crate) fn link_parent(&mut self, id: NodeId, parent: NodeId) -> Result<(), TopologyError> {
        match self.parent {
            Some(existing) if existing != parent => Err(TopologyError::SecondParent {
                child: id,
                existing,
            }),
            _ => {
                self.parent = Some(parent);
                self.world_dirty = true;
                Ok(())
            }
        }
    }

    pub(crate) fn unlink_parent(&mut self, parent: NodeId) {
        if self.parent == Some(parent) {
            self.parent = None;
            self.world_dirty = true;
        }
    }

    pub(crate) fn mark_world_dirty(&mut self) {
        self.world_dirty = true;
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Returns false if already present
    pub(crate) fn add_child(&mut self, child: NodeId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| *c != child);
        self.children.len() != before
    }

    /// Pull host state and recompute the world matrix. Returns true when the
    /// world matrix changed and children must be told.
    pub(crate) fn refresh(
        &mut self,
        host: &dyn HostGraph,
        node: HostId,
        parent_world: Option<Mat4>,
        time_changed: bool,
    ) -> bool {
        match host.is_visible(node) {
            Some(visible) => self.visible = visible,
            None => log::warn!("Failed to read visibility of {}", node),
        }

        if self.local_dirty || time_changed {
            match host.local_transform(node) {
                Some(local) => {
                    if local != self.local {
                        self.local = local;
                        self.world_dirty = true;
                    }
                }
                None => log::warn!("Failed to read local transform of {}", node),
            }
            self.local_dirty = false;
        }

        if !self.world_dirty {
            return false;
        }
        self.world_dirty = false;
        let world = parent_world.unwrap_or(Mat4::IDENTITY) * self.local.matrix();
        if world == self.world {
            return false;
        }
        self.world = world;
        true
    }
}

/// Own visibility AND every ancestor's. Missing transforms count as hidden.
pub fn effective_visibility(nodes: &NodeTable, transform: NodeId) -> bool {
    let mut current = Some(transform);
    let mut depth = 0;
    while let Some(id) = current {
        let Some(node) = nodes.get(id).and_then(|n| n.as_transform()) else {
            return false;
        };
        if !node.visible {
            return false;
        }
        depth += 1;
        if depth > MAX_DEPTH {
            log::error!("Transform hierarchy above {} is deeper than {}", transform, MAX_DEPTH);
            return false;
        }
        current = node.parent;
    }
    true
}

/// World matrix of a transform, or None if `id` is not a live transform
pub fn world_matrix(nodes: &NodeTable, id: NodeId) -> Option<Mat4> {
    nodes.get(id).and_then(|n| n.as_transform()).map(|t| t.world)
}
