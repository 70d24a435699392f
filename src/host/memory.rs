//! In-memory host scene graph
//!
//! Stores nodes, attributes, connections and DAG links, and queues the
//! notifications a live host would deliver for every mutation. Used by the
//! tests and by tools that drive the bridge without a DCC application.

use std::collections::{BTreeMap, VecDeque};

use glam::{Vec2, Vec3, Vec4};

use super::graph::HostGraph;
use super::types::*;
use crate::backend::VertexChannel;

/// Long and short names of the attributes the bridge reads
const ATTRIBUTE_NAMES: &[(&str, &str)] = &[
    ("translate", "t"),
    ("rotate", "r"),
    ("scale", "s"),
    ("translateX", "tx"),
    ("translateY", "ty"),
    ("translateZ", "tz"),
    ("rotateX", "rx"),
    ("rotateY", "ry"),
    ("rotateZ", "rz"),
    ("scaleX", "sx"),
    ("scaleY", "sy"),
    ("scaleZ", "sz"),
    ("visibility", "v"),
    ("color", "cl"),
    ("intensity", "in"),
    ("range", "ra"),
    ("fileTextureName", "ftn"),
    ("outColor", "oc"),
    ("mirrorU", "mu"),
    ("mirrorV", "mv"),
    ("wrapU", "wu"),
    ("wrapV", "wv"),
    ("fxaaEnable", "fae"),
    ("inMesh", "i"),
    ("surfaceShader", "ss"),
    ("dagSetMembers", "dsm"),
    ("instObjGroups", "iog"),
    ("message", "msg"),
];

/// Short name of an attribute; attributes without one use the long name
pub fn short_name(long: &str) -> &str {
    ATTRIBUTE_NAMES
        .iter()
        .find(|(l, _)| *l == long)
        .map(|(_, s)| *s)
        .unwrap_or(long)
}

fn long_name(name: &str) -> &str {
    ATTRIBUTE_NAMES
        .iter()
        .find(|(_, s)| *s == name)
        .map(|(l, _)| *l)
        .unwrap_or(name)
}

/// Build a plug naming an attribute by its long name
pub fn plug(node: HostId, attribute: &str) -> Plug {
    Plug::new(node, attribute, short_name(attribute))
}

/// Polygon mesh stored by the in-memory host
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub color_sets: Vec<(String, Vec<Vec4>)>,
    pub uv_sets: Vec<(String, Vec<Vec2>)>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
    /// Vertex indices per polygon
    pub polygons: Vec<Vec<u32>>,
}

impl MeshData {
    /// Create a plane mesh in the XZ plane built from quads
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let subdivisions = subdivisions.max(1);
        let half_width = width / 2.0;
        let half_depth = depth / 2.0;
        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                positions.push(Vec3::new(
                    -half_width + x as f32 * step_x,
                    0.0,
                    -half_depth + z as f32 * step_z,
                ));
                uvs.push(Vec2::new(
                    x as f32 / subdivisions as f32,
                    z as f32 / subdivisions as f32,
                ));
            }
        }

        let mut polygons = Vec::new();
        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;
                polygons.push(vec![current, next, next + 1, current + 1]);
            }
        }

        let count = positions.len();
        Self {
            positions,
            normals: Some(vec![Vec3::Y; count]),
            color_sets: Vec::new(),
            uv_sets: vec![("map1".to_string(), uvs)],
            tangents: Some(vec![Vec3::X; count]),
            bitangents: None,
            polygons,
        }
    }

    /// A single triangle with positions and normals only
    pub fn triangle() -> Self {
        Self {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: Some(vec![Vec3::Z; 3]),
            polygons: vec![vec![0, 1, 2]],
            ..Default::default()
        }
    }

    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn named_set<'a, T>(sets: &'a [(String, Vec<T>)], name: &str, index: usize) -> Option<&'a [T]> {
        if name.is_empty() {
            sets.get(index).map(|(_, data)| data.as_slice())
        } else {
            sets.iter()
                .find(|(n, _)| n == name)
                .map(|(_, data)| data.as_slice())
        }
    }

    fn stream(&self, channel: VertexChannel, sources: &VertexSources) -> Option<Vec<f32>> {
        let flat3 = |v: &[Vec3]| v.iter().flat_map(|p| p.to_array()).collect::<Vec<f32>>();
        let data = match channel {
            VertexChannel::Position => Some(flat3(&self.positions)),
            VertexChannel::Normal => self.normals.as_deref().map(flat3),
            VertexChannel::Tangent => self.tangents.as_deref().map(flat3),
            VertexChannel::Bitangent => self.bitangents.as_deref().map(flat3),
            VertexChannel::Color => Self::named_set(&self.color_sets, &sources.color, 0)
                .map(|c| c.iter().flat_map(|v| v.to_array()).collect()),
            VertexChannel::TexCoord0
            | VertexChannel::TexCoord1
            | VertexChannel::TexCoord2
            | VertexChannel::TexCoord3 => {
                let set = (channel.location() - VertexChannel::TexCoord0.location()) as usize;
                Self::named_set(&self.uv_sets, &sources.texcoords[set], set)
                    .map(|uv| uv.iter().flat_map(|v| v.to_array()).collect())
            }
        }?;
        let expected = self.vertex_count() * channel.format().components();
        (data.len() == expected).then_some(data)
    }
}

#[derive(Debug, Clone)]
struct HostNode {
    kind: HostNodeKind,
    type_name: String,
    name: String,
    namespace: String,
    attributes: BTreeMap<String, AttributeValue>,
    children: Vec<HostId>,
    parents: Vec<HostId>,
    layer_hidden: bool,
    mesh: Option<MeshData>,
    /// Shading group per polygon
    face_groups: Vec<Option<HostId>>,
    geometry_broken: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Connection {
    source: Plug,
    destination: Plug,
}

/// In-memory host scene graph
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: BTreeMap<HostId, HostNode>,
    connections: Vec<Connection>,
    events: VecDeque<HostEvent>,
    next_id: u64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// A host holding the pre-existing default shading group wired to a
    /// `lambert1` surface shader. Neither node produces an add event.
    pub fn with_default_shading_group(name: &str) -> Self {
        let mut host = Self::new();
        let sg = host.insert(HostNodeKind::ShadingGroup, "shadingEngine", name, "");
        let lambert = host.insert(HostNodeKind::ShadingNode, "lambert", "lambert1", "");
        host.connections.push(Connection {
            source: plug(lambert, "outColor"),
            destination: plug(sg, "surfaceShader"),
        });
        host
    }

    fn insert(&mut self, kind: HostNodeKind, type_name: &str, name: &str, namespace: &str) -> HostId {
        let id = HostId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.nodes.insert(
            id,
            HostNode {
                kind,
                type_name: type_name.to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
                attributes: BTreeMap::new(),
                children: Vec::new(),
                parents: Vec::new(),
                layer_hidden: false,
                mesh: None,
                face_groups: Vec::new(),
                geometry_broken: false,
            },
        );
        id
    }

    fn emit(&mut self, event: HostEvent) {
        log::trace!("MemoryHost: {:?}", event);
        self.events.push_back(event);
    }

    /// Drain the notifications queued since the last call
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // Node creation

    /// Create a node of any kind and announce it
    pub fn create_node(
        &mut self,
        kind: HostNodeKind,
        type_name: &str,
        name: &str,
        namespace: &str,
    ) -> HostId {
        let id = self.insert(kind, type_name, name, namespace);
        self.emit(HostEvent::NodeAdded(id));
        id
    }

    pub fn create_transform(&mut self, name: &str) -> HostId {
        let id = self.insert(HostNodeKind::Transform, "transform", name, "");
        self.init_attributes(
            id,
            [
                ("translate", AttributeValue::Float3(Vec3::ZERO)),
                ("rotate", AttributeValue::Float3(Vec3::ZERO)),
                ("scale", AttributeValue::Float3(Vec3::ONE)),
                ("visibility", AttributeValue::Bool(true)),
            ],
        );
        self.emit(HostEvent::NodeAdded(id));
        id
    }

    pub fn create_mesh(&mut self, name: &str, data: MeshData) -> HostId {
        let id = self.insert(HostNodeKind::Mesh, "mesh", name, "");
        if let Some(node) = self.nodes.get_mut(&id) {
            node.face_groups = vec![None; data.polygons.len()];
            node.mesh = Some(data);
        }
        self.emit(HostEvent::NodeAdded(id));
        id
    }

    pub fn create_shading_group(&mut self, name: &str) -> HostId {
        self.create_node(HostNodeKind::ShadingGroup, "shadingEngine", name, "")
    }

    /// Create a surface shader of the given host type
    pub fn create_shader(&mut self, name: &str, type_name: &str) -> HostId {
        self.create_node(HostNodeKind::ShadingNode, type_name, name, "")
    }

    pub fn create_material_info(&mut self, name: &str) -> HostId {
        self.create_node(HostNodeKind::MaterialInfo, "materialInfo", name, "")
    }

    pub fn create_file_texture(&mut self, name: &str) -> HostId {
        let id = self.insert(HostNodeKind::FileTexture, "file", name, "");
        self.init_attributes(
            id,
            [
                ("fileTextureName", AttributeValue::String(String::new())),
                ("outColor", AttributeValue::Float3(Vec3::ZERO)),
                ("mirrorU", AttributeValue::Bool(false)),
                ("mirrorV", AttributeValue::Bool(false)),
                ("wrapU", AttributeValue::Bool(true)),
                ("wrapV", AttributeValue::Bool(true)),
            ],
        );
        self.emit(HostEvent::NodeAdded(id));
        id
    }

    pub fn create_light(&mut self, name: &str, kind: HostNodeKind) -> HostId {
        let type_name = match kind {
            HostNodeKind::DirectionalLight => "directionalLight",
            _ => "pointLight",
        };
        let id = self.insert(kind, type_name, name, "");
        self.init_attributes(
            id,
            [
                ("color", AttributeValue::Float3(Vec3::ONE)),
                ("intensity", AttributeValue::Float(1.0)),
                ("range", AttributeValue::Float(0.0)),
            ],
        );
        self.emit(HostEvent::NodeAdded(id));
        id
    }

    fn init_attributes<const N: usize>(&mut self, node: HostId, values: [(&str, AttributeValue); N]) {
        if let Some(node) = self.nodes.get_mut(&node) {
            for (name, value) in values {
                node.attributes.insert(name.to_string(), value);
            }
        }
    }

    /// Delete a node, breaking its connections and DAG links first
    pub fn delete_node(&mut self, node: HostId) -> bool {
        let Some(host_node) = self.nodes.get(&node).cloned() else {
            return false;
        };

        let attached: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.source.node == node || c.destination.node == node)
            .cloned()
            .collect();
        for connection in attached {
            self.disconnect_plugs(&connection.source, &connection.destination);
        }
        for parent in host_node.parents {
            self.unparent(node, parent);
        }
        for child in host_node.children {
            self.unparent(child, node);
        }
        // Face assignments that referenced a deleted shading group
        for other in self.nodes.values_mut() {
            for group in other.face_groups.iter_mut() {
                if *group == Some(node) {
                    *group = None;
                }
            }
        }

        self.emit(HostEvent::NodeRemoved(node));
        self.nodes.remove(&node);
        true
    }

    // Attributes

    /// Set an attribute and notify
    pub fn set_attribute(&mut self, node: HostId, attribute: &str, value: AttributeValue) {
        let long = long_name(attribute).to_string();
        self.set_attribute_silently(node, &long, value);
        self.emit(HostEvent::AttributeChanged(AttributeChange::set(plug(node, &long))));
    }

    /// Set an attribute without any notification, as animation playback does
    pub fn set_attribute_silently(&mut self, node: HostId, attribute: &str, value: AttributeValue) {
        let long = long_name(attribute).to_string();
        if let Some(node) = self.nodes.get_mut(&node) {
            node.attributes.insert(long, value);
        }
    }

    pub fn set_translation(&mut self, node: HostId, translation: Vec3) {
        self.set_attribute(node, "translate", AttributeValue::Float3(translation));
    }

    pub fn set_rotation(&mut self, node: HostId, rotation: Vec3) {
        self.set_attribute(node, "rotate", AttributeValue::Float3(rotation));
    }

    pub fn set_scale(&mut self, node: HostId, scale: Vec3) {
        self.set_attribute(node, "scale", AttributeValue::Float3(scale));
    }

    pub fn set_visibility(&mut self, node: HostId, visible: bool) {
        self.set_attribute(node, "visibility", AttributeValue::Bool(visible));
    }

    /// Hide a node through a display layer. No notification is delivered.
    pub fn set_layer_hidden(&mut self, node: HostId, hidden: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.layer_hidden = hidden;
        }
    }

    /// Report an attribute as evaluated
    pub fn evaluate(&mut self, node: HostId, attribute: &str) {
        let long = long_name(attribute).to_string();
        self.emit(HostEvent::AttributeChanged(AttributeChange {
            message: AttributeMessage::ATTRIBUTE_EVAL,
            plug: plug(node, &long),
            other: None,
        }));
    }

    /// Deliver a dirty-plug notification
    pub fn mark_dirty(&mut self, node: HostId, attribute: &str) {
        let long = long_name(attribute).to_string();
        self.emit(HostEvent::DirtyPlug(plug(node, &long)));
    }

    /// Replace mesh geometry as a deformer would and send the dirty notification
    pub fn deform_mesh(&mut self, mesh: HostId, positions: Vec<Vec3>) {
        if let Some(data) = self.nodes.get_mut(&mesh).and_then(|n| n.mesh.as_mut()) {
            data.positions = positions;
        }
        self.mark_dirty(mesh, "inMesh");
    }

    /// Make geometry extraction of a mesh fail
    pub fn break_geometry(&mut self, mesh: HostId, broken: bool) {
        if let Some(node) = self.nodes.get_mut(&mesh) {
            node.geometry_broken = broken;
        }
    }

    pub fn advance_time(&mut self) {
        self.emit(HostEvent::TimeChanged);
    }

    // Connections

    /// Connect `source.source_attr` into `destination.destination_attr`
    pub fn connect(
        &mut self,
        source: HostId,
        source_attr: &str,
        destination: HostId,
        destination_attr: &str,
    ) -> bool {
        let connection = Connection {
            source: plug(source, source_attr),
            destination: plug(destination, destination_attr),
        };
        if self.connections.contains(&connection) {
            return false;
        }
        self.connections.push(connection.clone());

        self.emit(HostEvent::AttributeChanged(AttributeChange::connection_made(
            connection.source.clone(),
            connection.destination.clone(),
        )));
        let mut incoming = AttributeChange::connection_made(connection.destination, connection.source);
        incoming.message |= AttributeMessage::INCOMING_DIRECTION;
        self.emit(HostEvent::AttributeChanged(incoming));
        true
    }

    pub fn disconnect(
        &mut self,
        source: HostId,
        source_attr: &str,
        destination: HostId,
        destination_attr: &str,
    ) -> bool {
        self.disconnect_plugs(&plug(source, source_attr), &plug(destination, destination_attr))
    }

    fn disconnect_plugs(&mut self, source: &Plug, destination: &Plug) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.source == *source && c.destination == *destination));
        if self.connections.len() == before {
            return false;
        }

        self.emit(HostEvent::AttributeChanged(AttributeChange::connection_broken(
            source.clone(),
            destination.clone(),
        )));
        let mut incoming = AttributeChange::connection_broken(destination.clone(), source.clone());
        incoming.message |= AttributeMessage::INCOMING_DIRECTION;
        self.emit(HostEvent::AttributeChanged(incoming));
        true
    }

    /// Wire a surface shader into a shading group
    pub fn connect_surface_shader(&mut self, shader: HostId, shading_group: HostId) -> bool {
        self.connect(shader, "outColor", shading_group, "surfaceShader")
    }

    /// Assign every polygon of a mesh to a shading group
    pub fn assign_material(&mut self, mesh: HostId, shading_group: HostId) {
        let count = self
            .nodes
            .get(&mesh)
            .map(|n| n.face_groups.len())
            .unwrap_or(0);
        let faces: Vec<u32> = (0..count as u32).collect();
        self.assign_faces(mesh, shading_group, &faces);
    }

    /// Assign some polygons of a mesh to a shading group, updating the
    /// mesh/shading-group set membership connections
    pub fn assign_faces(&mut self, mesh: HostId, shading_group: HostId, faces: &[u32]) {
        let Some(node) = self.nodes.get_mut(&mesh) else {
            return;
        };
        let before: Vec<HostId> = node.face_groups.iter().flatten().copied().collect();
        for &face in faces {
            if let Some(group) = node.face_groups.get_mut(face as usize) {
                *group = Some(shading_group);
            }
        }
        let after: Vec<HostId> = node.face_groups.iter().flatten().copied().collect();

        let mut dropped: Vec<HostId> = before.iter().filter(|g| !after.contains(g)).copied().collect();
        dropped.sort();
        dropped.dedup();
        for group in dropped {
            self.disconnect(mesh, "instObjGroups", group, "dagSetMembers");
        }
        if !before.contains(&shading_group) {
            self.connect(mesh, "instObjGroups", shading_group, "dagSetMembers");
        }
    }

    // DAG

    /// Add `child` under `parent`. A mesh already parented elsewhere becomes
    /// an instance.
    pub fn parent(&mut self, child: HostId, parent: HostId) -> bool {
        if !self.nodes.contains_key(&child) {
            return false;
        }
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        if parent_node.children.contains(&child) {
            return false;
        }
        parent_node.children.push(child);
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parents.push(parent);
        }
        self.emit(HostEvent::ChildAdded { parent, child });
        true
    }

    pub fn unparent(&mut self, child: HostId, parent: HostId) -> bool {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let before = parent_node.children.len();
        parent_node.children.retain(|c| *c != child);
        if parent_node.children.len() == before {
            return false;
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parents.retain(|p| *p != parent);
        }
        self.emit(HostEvent::ChildRemoved { parent, child });
        true
    }

    /// Move `child` from all of its parents to `parent`
    pub fn reparent(&mut self, child: HostId, parent: HostId) {
        let parents = self
            .nodes
            .get(&child)
            .map(|n| n.parents.clone())
            .unwrap_or_default();
        for old in parents {
            self.unparent(child, old);
        }
        self.parent(child, parent);
    }

    pub fn parents(&self, node: HostId) -> Vec<HostId> {
        self.nodes
            .get(&node)
            .map(|n| n.parents.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, node: HostId) -> bool {
        self.nodes.contains_key(&node)
    }
}

impl HostGraph for MemoryHost {
    fn kind(&self, node: HostId) -> Option<HostNodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    fn type_name(&self, node: HostId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.type_name.as_str())
    }

    fn name(&self, node: HostId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    fn namespace(&self, node: HostId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.namespace.as_str())
    }

    fn find_by_name(&self, name: &str) -> Option<HostId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| *id)
    }

    fn attribute(&self, node: HostId, attribute: &str) -> Option<AttributeValue> {
        let node = self.nodes.get(&node)?;
        node.attributes.get(long_name(attribute)).cloned()
    }

    fn attribute_names(&self, node: HostId) -> Vec<String> {
        self.nodes
            .get(&node)
            .map(|n| n.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn incoming_connections(&self, node: HostId) -> Vec<(Plug, Plug)> {
        self.connections
            .iter()
            .filter(|c| c.destination.node == node)
            .map(|c| (c.destination.clone(), c.source.clone()))
            .collect()
    }

    fn children(&self, node: HostId) -> Vec<HostId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_visible(&self, node: HostId) -> Option<bool> {
        let node = self.nodes.get(&node)?;
        let own = node
            .attributes
            .get("visibility")
            .and_then(AttributeValue::as_bool)
            .unwrap_or(true);
        Some(own && !node.layer_hidden)
    }

    fn local_transform(&self, node: HostId) -> Option<LocalTransform> {
        let node = self.nodes.get(&node)?;
        if node.kind != HostNodeKind::Transform {
            return None;
        }
        let read = |name: &str, default: Vec3| {
            node.attributes
                .get(name)
                .and_then(AttributeValue::as_vec3)
                .unwrap_or(default)
        };
        Some(LocalTransform {
            translation: read("translate", Vec3::ZERO),
            rotation: read("rotate", Vec3::ZERO),
            scale: read("scale", Vec3::ONE),
        })
    }

    fn material_assignment(&self, mesh: HostId) -> Result<MaterialAssignment, HostError> {
        let node = self.nodes.get(&mesh).ok_or(HostError::UnknownNode(mesh))?;
        if node.mesh.is_none() {
            return Err(HostError::NotAMesh(mesh));
        }
        let mut assignment = MaterialAssignment::default();
        for group in &node.face_groups {
            let index = match group {
                Some(sg) => match assignment.shading_groups.iter().position(|g| g == sg) {
                    Some(i) => i as i32,
                    None => {
                        assignment.shading_groups.push(*sg);
                        (assignment.shading_groups.len() - 1) as i32
                    }
                },
                None => -1,
            };
            assignment.polygon_groups.push(index);
        }
        Ok(assignment)
    }

    fn extract_geometry(
        &self,
        mesh: HostId,
        request: &GeometryRequest,
    ) -> Result<ExtractedGeometry, HostError> {
        let node = self.nodes.get(&mesh).ok_or(HostError::UnknownNode(mesh))?;
        let data = node.mesh.as_ref().ok_or(HostError::NotAMesh(mesh))?;
        if node.geometry_broken {
            return Err(HostError::IndexExtractionFailed(mesh));
        }
        if data.positions.is_empty() {
            return Err(HostError::PositionExtractionFailed(mesh));
        }

        let vertex_count = data.vertex_count() as u32;
        let mut indices = Vec::new();
        for &polygon in &request.polygons {
            let face = data
                .polygons
                .get(polygon as usize)
                .ok_or(HostError::IndexExtractionFailed(mesh))?;
            if face.iter().any(|&i| i >= vertex_count) {
                return Err(HostError::IndexExtractionFailed(mesh));
            }
            for i in 1..face.len().saturating_sub(1) {
                indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
            }
        }

        let mut geometry = ExtractedGeometry {
            vertex_count,
            indices,
            ..Default::default()
        };
        for channel in request.channels.channels() {
            if let Some(stream) = data.stream(channel, &request.sources) {
                geometry.streams.insert(channel, stream);
            }
        }
        Ok(geometry)
    }
}
