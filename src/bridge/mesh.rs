//! Mesh node: per-material GPU geometry and one uniform per instance
//!
//! Geometry and instance uniforms carry separate dirty flags, so moving a
//! transform never rebuilds vertex data.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Mat4;
use thiserror::Error;

use super::error::TopologyError;
use super::node::{DrawContext, GraphCommand, HookContext, NodeBase, ResourceGarbage, ShadingPath, UpdateContext};
use super::table::NodeId;
use super::transform::{effective_visibility, world_matrix};
use crate::backend::{
    BackendError, BufferDescriptor, BufferHandle, InputLayoutHandle, ObjectUniform, RenderBackend,
    ShaderStage, VertexChannel, VertexChannels, OBJECT_UNIFORM_SLOT,
};
use crate::host::{
    AttributeChange, AttributeMessage, ExtractedGeometry, GeometryRequest, HostError, HostId,
    HostNodeKind, MaterialAssignment, Plug,
};
use crate::resources::ShaderProgram;

/// Reason a geometry rebuild was abandoned
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("shading group {0} has no mirrored material")]
    NoMaterial(HostId),
    #[error("material of shading group {0} resolves to no shader")]
    NoShader(HostId),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Channels a shader needs extracted: position always, the optional
/// attributes it declares, and texcoord sets contiguous from set 0
pub fn required_channels(declared: VertexChannels) -> VertexChannels {
    let mut channels = VertexChannels::POSITION
        | (declared
            & (VertexChannels::NORMAL
                | VertexChannels::COLOR
                | VertexChannels::TANGENT
                | VertexChannels::BITANGENT));
    for set in 0..declared.texcoord_sets() {
        if let Some(channel) = VertexChannel::texcoord(set) {
            channels |= channel.flag();
        }
    }
    channels
}

/// GPU geometry for the polygons of one material group
#[derive(Debug)]
pub struct Submesh {
    material: NodeId,
    shader: Arc<ShaderProgram>,
    channels: VertexChannels,
    vertex_buffers: Vec<(VertexChannel, BufferHandle)>,
    index_buffer: BufferHandle,
    index_count: u32,
    layout: InputLayoutHandle,
}

impl Submesh {
    pub fn material(&self) -> NodeId {
        self.material
    }

    pub fn channels(&self) -> VertexChannels {
        self.channels
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn shader(&self) -> &Arc<ShaderProgram> {
        &self.shader
    }

    fn buffers(&self) -> impl Iterator<Item = BufferHandle> + '_ {
        self.vertex_buffers
            .iter()
            .map(|(_, b)| *b)
            .chain(std::iter::once(self.index_buffer))
    }
}

/// Uniform of one (mesh, transform) pairing
#[derive(Debug, Default)]
pub struct MeshInstance {
    uniform: Option<BufferHandle>,
    local_to_world: Mat4,
    dirty: bool,
}

impl MeshInstance {
    pub fn uniform(&self) -> Option<BufferHandle> {
        self.uniform
    }

    pub fn local_to_world(&self) -> Mat4 {
        self.local_to_world
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug)]
pub struct MeshNode {
    submeshes: Vec<Submesh>,
    instances: BTreeMap<NodeId, MeshInstance>,
    geometry_dirty: bool,
    rebuilds: u32,
}

impl Default for MeshNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshNode {
    pub fn new() -> Self {
        Self {
            submeshes: Vec::new(),
            instances: BTreeMap::new(),
            geometry_dirty: true,
            rebuilds: 0,
        }
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    pub fn instances(&self) -> impl Iterator<Item = (NodeId, &MeshInstance)> + '_ {
        self.instances.iter().map(|(t, i)| (*t, i))
    }

    pub fn instance(&self, transform: NodeId) -> Option<&MeshInstance> {
        self.instances.get(&transform)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_geometry_dirty(&self) -> bool {
        self.geometry_dirty
    }

    /// Number of rebuild attempts so far
    pub fn rebuild_count(&self) -> u32 {
        self.rebuilds
    }

    pub(crate) fn mark_geometry_dirty(&mut self) {
        self.geometry_dirty = true;
    }

    pub(crate) fn on_attribute_changed(&mut self, base: &NodeBase, ctx: &mut HookContext, change: &AttributeChange) {
        if let Some(other) = change.other.as_ref() {
            let made = change.has(AttributeMessage::CONNECTION_MADE);
            let broken = change.has(AttributeMessage::CONNECTION_BROKEN);
            if (made || broken)
                && other.is("dagSetMembers")
                && ctx.host.kind(other.node) == Some(HostNodeKind::ShadingGroup)
            {
                match ctx.find_node(other.node) {
                    Some(material) if made => ctx.push(GraphCommand::Connect(base.id(), material)),
                    Some(material) => ctx.push(GraphCommand::Disconnect(base.id(), material)),
                    None => log::warn!("Mesh {}: shading group {} is not mirrored", base.name(), other.node),
                }
            }
        }
        self.geometry_dirty = true;
    }

    pub(crate) fn on_dirty(&mut self, plug: &Plug) {
        if plug.is("inMesh") {
            self.geometry_dirty = true;
        }
    }

    pub(crate) fn link_parent(&mut self, id: NodeId, transform: NodeId) -> Result<(), TopologyError> {
        if self.instances.contains_key(&transform) {
            return Err(TopologyError::DuplicateInstance {
                mesh: id,
                transform,
            });
        }
        self.instances.insert(
            transform,
            MeshInstance {
                dirty: true,
                ..Default::default()
            },
        );
        Ok(())
    }

    pub(crate) fn unlink_parent(&mut self, base: &NodeBase, transform: NodeId, garbage: &mut ResourceGarbage) {
        match self.instances.remove(&transform) {
            Some(instance) => {
                if let Some(uniform) = instance.uniform {
                    garbage.push_buffer(uniform);
                }
            }
            None => log::warn!("Mesh {} has no instance under {}", base.name(), transform),
        }
    }

    pub(crate) fn parent_transform_changed(&mut self, base: &NodeBase, transform: NodeId) {
        match self.instances.get_mut(&transform) {
            Some(instance) => instance.dirty = true,
            None => log::warn!("Mesh {} has no instance under {}", base.name(), transform),
        }
    }

    pub(crate) fn update(&mut self, base: &NodeBase, ctx: &mut UpdateContext) {
        let any_visible = self
            .instances
            .keys()
            .any(|t| effective_visibility(ctx.nodes, *t));

        if self.geometry_dirty && any_visible {
            self.geometry_dirty = false;
            self.rebuild(base, ctx);
        }

        for (transform, instance) in self.instances.iter_mut() {
            if !instance.dirty || !effective_visibility(ctx.nodes, *transform) {
                continue;
            }
            let Some(world) = world_matrix(ctx.nodes, *transform) else {
                continue;
            };
            let data = ObjectUniform {
                local_to_world: world.transpose(),
            };
            let bytes = bytemuck::bytes_of(&data);
            match instance.uniform {
                Some(uniform) => ctx.backend.write_buffer(uniform, 0, bytes),
                None => {
                    let desc = BufferDescriptor::uniform(
                        format!("{} instance {}", base.name(), transform),
                        bytes.len() as u64,
                    );
                    match ctx.backend.create_buffer_init(&desc, bytes) {
                        Ok(uniform) => instance.uniform = Some(uniform),
                        Err(e) => {
                            log::error!("Mesh {}: failed to create instance uniform: {}", base.name(), e);
                            continue;
                        }
                    }
                }
            }
            instance.local_to_world = world;
            instance.dirty = false;
        }
    }

    fn rebuild(&mut self, base: &NodeBase, ctx: &mut UpdateContext) {
        self.destroy_submeshes(ctx.backend);
        self.rebuilds += 1;

        let assignment = match ctx.host.material_assignment(base.host()) {
            Ok(assignment) => assignment,
            Err(e) => {
                log::error!("Mesh {}: {}", base.name(), e);
                return;
            }
        };

        let mut built = Vec::new();
        for (group, shading_group) in assignment.shading_groups.iter().enumerate() {
            match build_submesh(base, ctx, &assignment, group, *shading_group) {
                Ok(Some(submesh)) => built.push(submesh),
                Ok(None) => {}
                Err(e) => {
                    log::error!(
                        "Mesh {}: {}; discarding {} built groups",
                        base.name(),
                        e,
                        built.len()
                    );
                    for submesh in &built {
                        destroy_submesh(ctx.backend, submesh);
                    }
                    return;
                }
            }
        }
        log::debug!("Mesh {} rebuilt with {} groups", base.name(), built.len());
        self.submeshes = built;
    }

    fn destroy_submeshes(&mut self, backend: &mut dyn RenderBackend) {
        for submesh in self.submeshes.drain(..) {
            destroy_submesh(backend, &submesh);
        }
    }

    /// Drop geometry built against shaders that are going away
    pub(crate) fn discard_geometry(&mut self, backend: &mut dyn RenderBackend) {
        self.destroy_submeshes(backend);
        self.geometry_dirty = true;
    }

    pub(crate) fn draw(&self, ctx: &mut DrawContext) -> u32 {
        if ctx.path != ShadingPath::Main || self.geometry_dirty {
            return 0;
        }
        let visible: Vec<BufferHandle> = self
            .instances
            .iter()
            .filter(|(transform, instance)| {
                !instance.dirty && Self::instance_visible(ctx, **transform)
            })
            .filter_map(|(_, instance)| instance.uniform)
            .collect();
        if visible.is_empty() {
            return 0;
        }

        let mut calls = 0;
        for submesh in &self.submeshes {
            let Some(material) = ctx.nodes.get(submesh.material).and_then(|n| n.as_material()) else {
                continue;
            };
            if material.shader().is_none() {
                continue;
            }

            let backend = &mut *ctx.backend;
            backend.set_shaders(submesh.shader.vertex, submesh.shader.fragment);
            backend.set_input_layout(submesh.layout);
            for (slot, (channel, buffer)) in submesh.vertex_buffers.iter().enumerate() {
                backend.set_vertex_buffer(slot as u32, *buffer, channel.format().size());
            }
            backend.set_index_buffer(submesh.index_buffer);

            for (slot, texture) in material.texture_slots() {
                let Some(texture) = ctx.nodes.get(texture).and_then(|n| n.as_texture()) else {
                    continue;
                };
                if let (Some(handle), Some(sampler)) = (texture.texture(), texture.sampler()) {
                    backend.set_texture(slot, handle.handle);
                    backend.set_sampler(slot, sampler);
                }
            }

            for uniform in &visible {
                backend.set_constant_buffer(ShaderStage::Vertex, OBJECT_UNIFORM_SLOT, *uniform);
                backend.draw_indexed(0..submesh.index_count, 0, 0..1);
                calls += 1;
            }
        }
        calls
    }

    /// An instance draws when its transform is visible and, while a filter
    /// is active, isolated
    fn instance_visible(ctx: &DrawContext, transform: NodeId) -> bool {
        if !effective_visibility(ctx.nodes, transform) {
            return false;
        }
        !ctx.filtering || ctx.nodes.get(transform).map(|t| t.is_isolated()).unwrap_or(false)
    }

    pub(crate) fn release(&mut self, garbage: &mut ResourceGarbage) {
        for submesh in self.submeshes.drain(..) {
            for buffer in submesh.buffers() {
                garbage.push_buffer(buffer);
            }
        }
        for instance in self.instances.values_mut() {
            if let Some(uniform) = instance.uniform.take() {
                garbage.push_buffer(uniform);
            }
        }
    }
}

fn destroy_submesh(backend: &mut dyn RenderBackend, submesh: &Submesh) {
    for buffer in submesh.buffers() {
        backend.destroy_buffer(buffer);
    }
}

fn build_submesh(
    base: &NodeBase,
    ctx: &mut UpdateContext,
    assignment: &MaterialAssignment,
    group: usize,
    shading_group: HostId,
) -> Result<Option<Submesh>, GeometryError> {
    let nodes = ctx.nodes;
    let material_id = base
        .find_connected(nodes, shading_group)
        .ok_or(GeometryError::NoMaterial(shading_group))?;
    let material = nodes
        .get(material_id)
        .and_then(|n| n.as_material())
        .ok_or(GeometryError::NoMaterial(shading_group))?;
    let shader = material
        .shader()
        .cloned()
        .ok_or(GeometryError::NoShader(shading_group))?;

    let channels = required_channels(shader.channels);
    let request = GeometryRequest {
        polygons: assignment.polygons_for(group),
        channels,
        sources: material.sources().clone(),
    };
    let geometry = ctx.host.extract_geometry(base.host(), &request)?;
    if geometry.indices.is_empty() {
        log::debug!("Mesh {}: group {} has no triangles", base.name(), group);
        return Ok(None);
    }
    if !has_stream(&geometry, VertexChannel::Position) {
        return Err(HostError::PositionExtractionFailed(base.host()).into());
    }

    let mut created = Vec::new();
    let result = upload(base, ctx, &geometry, &shader, channels, &mut created);
    match result {
        Ok((vertex_buffers, index_buffer, layout)) => Ok(Some(Submesh {
            material: material_id,
            shader,
            channels,
            vertex_buffers,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            layout,
        })),
        Err(e) => {
            for buffer in created {
                ctx.backend.destroy_buffer(buffer);
            }
            Err(e)
        }
    }
}

type Uploaded = (Vec<(VertexChannel, BufferHandle)>, BufferHandle, InputLayoutHandle);

/// Create one buffer per channel plus the index buffer, recording every
/// buffer in `created` so a failure can release them
fn upload(
    base: &NodeBase,
    ctx: &mut UpdateContext,
    geometry: &ExtractedGeometry,
    shader: &ShaderProgram,
    channels: VertexChannels,
    created: &mut Vec<BufferHandle>,
) -> Result<Uploaded, GeometryError> {
    let mut vertex_buffers = Vec::new();
    for channel in channels.channels() {
        let data = channel_data(base, geometry, channel, ctx.config.flip_texcoord_v);
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let desc = BufferDescriptor::vertex(format!("{} {}", base.name(), channel.name()), bytes.len() as u64);
        let buffer = ctx.backend.create_buffer_init(&desc, bytes)?;
        created.push(buffer);
        vertex_buffers.push((channel, buffer));
    }

    let bytes: &[u8] = bytemuck::cast_slice(&geometry.indices);
    let desc = BufferDescriptor::index(format!("{} indices", base.name()), bytes.len() as u64);
    let index_buffer = ctx.backend.create_buffer_init(&desc, bytes)?;
    created.push(index_buffer);

    let layout = ctx.layouts.get_or_create(ctx.backend, shader.vertex, channels)?;
    Ok((vertex_buffers, index_buffer, layout))
}

fn has_stream(geometry: &ExtractedGeometry, channel: VertexChannel) -> bool {
    let expected = geometry.vertex_count as usize * channel.format().components();
    geometry
        .stream(channel)
        .map(|s| s.len() == expected)
        .unwrap_or(false)
}

/// Stream data for `channel`, zero filled when the host could not provide it
fn channel_data(
    base: &NodeBase,
    geometry: &ExtractedGeometry,
    channel: VertexChannel,
    flip_v: bool,
) -> Vec<f32> {
    let components = channel.format().components();
    if !has_stream(geometry, channel) {
        log::warn!(
            "Mesh {}: no {} data, using zeros",
            base.name(),
            channel.name()
        );
        return vec![0.0; geometry.vertex_count as usize * components];
    }
    let mut data = geometry.stream(channel).map(<[f32]>::to_vec).unwrap_or_default();
    let is_texcoord = (0..crate::backend::TEXCOORD_SET_COUNT)
        .any(|set| VertexChannel::texcoord(set) == Some(channel));
    if flip_v && is_texcoord {
        for uv in data.chunks_exact_mut(2) {
            uv[1] = 1.0 - uv[1];
        }
    }
    data
}
