//! Light node: packs host light attributes and the parent transform into
//! GPU light records

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use super::error::TopologyError;
use super::node::{HookContext, UpdateContext};
use super::table::{NodeId, NodeTable};
use super::transform::{effective_visibility, world_matrix};
use crate::host::{AttributeChange, AttributeMessage, HostGraph, HostId, Plug};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
}

/// GPU-friendly light data structure
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLightData {
    /// xyz = position, w = range (infinite for directional)
    pub position: Vec4,
    /// xyz = color, w = intensity
    pub color_intensity: Vec4,
    /// xyz = direction, w = light type (0=point, 2=directional)
    pub direction_type: Vec4,
}

#[derive(Debug)]
pub struct LightNode {
    kind: LightKind,
    parent: Option<NodeId>,
    color: Vec3,
    intensity: f32,
    range: f32,
    position: Vec3,
    direction: Vec3,
    dirty: bool,
}

impl LightNode {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            parent: None,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 0.0,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            dirty: true,
        }
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Lit only while parented under a visible transform
    pub fn is_visible(&self, nodes: &NodeTable) -> bool {
        self.parent
            .map(|p| effective_visibility(nodes, p))
            .unwrap_or(false)
    }

    pub fn to_gpu_data(&self) -> GpuLightData {
        let color_intensity = self.color.extend(self.intensity);
        match self.kind {
            LightKind::Point => GpuLightData {
                position: self.position.extend(self.range),
                color_intensity,
                direction_type: Vec4::ZERO,
            },
            LightKind::Directional => GpuLightData {
                position: Vec4::new(0.0, 0.0, 0.0, f32::INFINITY),
                color_intensity,
                direction_type: self.direction.extend(2.0),
            },
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read one light attribute; returns false for attributes lights ignore
    fn read(&mut self, host: &dyn HostGraph, node: HostId, attribute: &str) -> bool {
        let value = host.attribute(node, attribute);
        match attribute {
            "cl" | "color" => match value.as_ref().and_then(|v| v.as_vec3()) {
                Some(color) => self.color = color,
                None => log::warn!("Light {}: cannot read color", node),
            },
            "in" | "intensity" => match value.as_ref().and_then(|v| v.as_float()) {
                Some(intensity) => self.intensity = intensity,
                None => log::warn!("Light {}: cannot read intensity", node),
            },
            "ra" | "range" => match value.as_ref().and_then(|v| v.as_float()) {
                Some(range) => self.range = range,
                None => log::warn!("Light {}: cannot read range", node),
            },
            _ => return false,
        }
        true
    }

    fn read_plug(&mut self, host: &dyn HostGraph, plug: &Plug) {
        let handled = self.read(host, plug.node, &plug.short_name) || self.read(host, plug.node, &plug.attribute);
        if handled {
            self.dirty = true;
        }
    }

    pub(crate) fn on_attribute_changed(&mut self, ctx: &mut HookContext, change: &AttributeChange) {
        if change.has(AttributeMessage::CONNECTION_MADE | AttributeMessage::OTHER_PLUG_SET) {
            for attribute in ["cl", "in", "ra"] {
                self.read(ctx.host, change.plug.node, attribute);
            }
            self.dirty = true;
        } else if change.has(AttributeMessage::ATTRIBUTE_SET) {
            self.read_plug(ctx.host, &change.plug);
        }
    }

    pub(crate) fn on_dirty(&mut self, ctx: &mut HookContext, plug: &Plug) {
        self.read_plug(ctx.host, plug);
    }

    pub(crate) fn link_parent(&mut self, id: NodeId, parent: NodeId) -> Result<(), TopologyError> {
        match self.parent {
            Some(existing) if existing != parent => Err(TopologyError::SecondParent {
                child: id,
                existing,
            }),
            _ => {
                self.parent = Some(parent);
                self.dirty = true;
                Ok(())
            }
        }
    }

    pub(crate) fn unlink_parent(&mut self, parent: NodeId) {
        if self.parent == Some(parent) {
            self.parent = None;
        }
    }

    pub(crate) fn update(&mut self, ctx: &mut UpdateContext) {
        if !self.dirty {
            return;
        }
        let Some(world) = self.parent.and_then(|p| world_matrix(ctx.nodes, p)) else {
            return;
        };
        self.position = world.w_axis.truncate();
        self.direction = (-world.z_axis.truncate()).normalize_or_zero();
        self.dirty = false;
    }
}
