//! Types describing the host scene graph and the notifications it delivers

use std::collections::HashMap;

use bitflags::bitflags;
use glam::{EulerRot, Mat4, Quat, Vec3};
use thiserror::Error;

use crate::backend::{VertexChannel, VertexChannels, TEXCOORD_SET_COUNT};

/// Opaque identity of a host node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub u64);

impl std::fmt::Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Class of a host node as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostNodeKind {
    Transform,
    Mesh,
    ShadingGroup,
    FileTexture,
    DirectionalLight,
    PointLight,
    MaterialInfo,
    /// Surface shader or any other shading network node
    ShadingNode,
    /// Plugin-defined dependency node
    Plugin,
    Other,
}

impl HostNodeKind {
    pub fn is_light(&self) -> bool {
        matches!(self, HostNodeKind::DirectionalLight | HostNodeKind::PointLight)
    }
}

bitflags! {
    /// Attribute-change message kinds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeMessage: u32 {
        const CONNECTION_MADE = 1 << 0;
        const CONNECTION_BROKEN = 1 << 1;
        const ATTRIBUTE_EVAL = 1 << 2;
        const ATTRIBUTE_SET = 1 << 3;
        /// The `other` plug of the change is valid
        const OTHER_PLUG_SET = 1 << 4;
        /// The changed plug is the destination of the connection
        const INCOMING_DIRECTION = 1 << 5;
    }
}

/// A node attribute, named by its long and short names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plug {
    pub node: HostId,
    pub attribute: String,
    pub short_name: String,
}

impl Plug {
    pub fn new(node: HostId, attribute: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            node,
            attribute: attribute.into(),
            short_name: short_name.into(),
        }
    }

    /// True if either name matches
    pub fn is(&self, name: &str) -> bool {
        self.attribute == name || self.short_name == name
    }
}

/// Attribute value read from the host
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float3(Vec3),
    String(String),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f32),
            AttributeValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            AttributeValue::Float3(v) => Some(*v),
            AttributeValue::Float(v) => Some(Vec3::splat(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Payload of an attribute-changed notification
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub message: AttributeMessage,
    pub plug: Plug,
    /// Other endpoint of a connection made or broken
    pub other: Option<Plug>,
}

impl AttributeChange {
    pub fn set(plug: Plug) -> Self {
        Self {
            message: AttributeMessage::ATTRIBUTE_SET,
            plug,
            other: None,
        }
    }

    pub fn connection_made(plug: Plug, other: Plug) -> Self {
        Self {
            message: AttributeMessage::CONNECTION_MADE | AttributeMessage::OTHER_PLUG_SET,
            plug,
            other: Some(other),
        }
    }

    pub fn connection_broken(plug: Plug, other: Plug) -> Self {
        Self {
            message: AttributeMessage::CONNECTION_BROKEN | AttributeMessage::OTHER_PLUG_SET,
            plug,
            other: Some(other),
        }
    }

    pub fn has(&self, message: AttributeMessage) -> bool {
        self.message.contains(message)
    }
}

/// Notification delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    NodeAdded(HostId),
    NodeRemoved(HostId),
    ChildAdded { parent: HostId, child: HostId },
    ChildRemoved { parent: HostId, child: HostId },
    AttributeChanged(AttributeChange),
    /// Deformation-style update that bypasses attribute-changed
    DirtyPlug(Plug),
    TimeChanged,
}

/// Local transform components as stored by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    /// Euler angles in radians, XYZ order
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

/// Shading groups a mesh is assigned to, and which polygons use each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialAssignment {
    pub shading_groups: Vec<HostId>,
    /// Per polygon index into `shading_groups`, -1 when unassigned
    pub polygon_groups: Vec<i32>,
}

impl MaterialAssignment {
    /// Polygons bound to the group at `group`
    pub fn polygons_for(&self, group: usize) -> Vec<u32> {
        self.polygon_groups
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == group as i32)
            .map(|(i, _)| i as u32)
            .collect()
    }
}

/// Named vertex data sets a material wants geometry extracted from.
/// An empty name selects the host's default set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexSources {
    pub color: String,
    pub tangent: String,
    pub bitangent: String,
    pub texcoords: [String; TEXCOORD_SET_COUNT],
}

/// Request for the triangles and vertex channels of a subset of polygons
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRequest {
    pub polygons: Vec<u32>,
    pub channels: VertexChannels,
    pub sources: VertexSources,
}

/// Geometry extracted by the host
#[derive(Debug, Clone, Default)]
pub struct ExtractedGeometry {
    pub vertex_count: u32,
    pub indices: Vec<u32>,
    /// Flat f32 data per channel; a channel the host could not provide is absent
    pub streams: HashMap<VertexChannel, Vec<f32>>,
}

impl ExtractedGeometry {
    pub fn stream(&self, channel: VertexChannel) -> Option<&[f32]> {
        self.streams.get(&channel).map(Vec::as_slice)
    }
}

/// Host lookup failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Unknown host node {0}")]
    UnknownNode(HostId),
    #[error("Host node {0} is not a mesh")]
    NotAMesh(HostId),
    #[error("Failed to query connected shaders of {0}")]
    ShaderQueryFailed(HostId),
    #[error("Failed to extract indices of {0}")]
    IndexExtractionFailed(HostId),
    #[error("Failed to extract positions of {0}")]
    PositionExtractionFailed(HostId),
}
