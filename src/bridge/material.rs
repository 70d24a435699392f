//! Material node: a host shading group and the shading node wired into it
//!
//! The material subscribes to its surface shader so technique, vertex
//! source and texture slot edits arrive here without walking the host graph.

use std::sync::Arc;

use super::node::{GraphCommand, HookContext, NodeBase};
use super::table::NodeId;
use crate::backend::TEXCOORD_SET_COUNT;
use crate::host::{AttributeChange, AttributeMessage, AttributeValue, HostId, HostNodeKind, Plug, VertexSources};
use crate::resources::{ShaderLibrary, ShaderProgram};
use crate::BridgeConfig;

pub const TEXTURE_SLOT_COUNT: usize = 9;

const TEXTURE_SLOTS: [&str; TEXTURE_SLOT_COUNT] = [
    "Texture0", "Texture1", "Texture2", "Texture3", "Texture4", "Texture5", "Texture6",
    "Texture7", "Texture8",
];

const TEXCOORD_SOURCES: [&str; TEXCOORD_SET_COUNT] = [
    "TexCoord0_Source",
    "TexCoord1_Source",
    "TexCoord2_Source",
    "TexCoord3_Source",
];

/// Texture slot bound by a shading-node attribute, exact match only
pub fn texture_slot(attribute: &str) -> Option<usize> {
    TEXTURE_SLOTS.iter().position(|slot| *slot == attribute)
}

/// Vertex source attributes hold `kind:name`; only the set name is kept
pub fn vertex_source_name(value: &str) -> &str {
    value.rsplit(':').next().unwrap_or(value)
}

#[derive(Debug)]
pub struct MaterialNode {
    surface_shader: Option<HostId>,
    technique: String,
    shader: Option<Arc<ShaderProgram>>,
    textures: [Option<NodeId>; TEXTURE_SLOT_COUNT],
    sources: VertexSources,
}

impl MaterialNode {
    /// New material resolved to the default shader until a surface shader
    /// says otherwise
    pub fn new(default_shader: Option<Arc<ShaderProgram>>) -> Self {
        Self {
            surface_shader: None,
            technique: String::new(),
            shader: default_shader,
            textures: [None; TEXTURE_SLOT_COUNT],
            sources: VertexSources::default(),
        }
    }

    pub fn surface_shader(&self) -> Option<HostId> {
        self.surface_shader
    }

    pub fn technique(&self) -> &str {
        &self.technique
    }

    pub fn shader(&self) -> Option<&Arc<ShaderProgram>> {
        self.shader.as_ref()
    }

    pub fn sources(&self) -> &VertexSources {
        &self.sources
    }

    pub fn texture(&self, slot: usize) -> Option<NodeId> {
        self.textures.get(slot).copied().flatten()
    }

    /// Occupied texture slots
    pub fn texture_slots(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.textures
            .iter()
            .enumerate()
            .filter_map(|(slot, texture)| texture.map(|t| (slot as u32, t)))
    }

    fn use_default_shader(&mut self, shaders: &ShaderLibrary, config: &BridgeConfig) {
        self.shader = shaders.find(&config.default_technique);
        if self.shader.is_none() {
            log::error!("Default technique {} is not loaded", config.default_technique);
        }
    }

    fn set_technique(&mut self, shaders: &ShaderLibrary, config: &BridgeConfig, technique: &str) {
        self.technique = technique.to_string();
        match shaders.find(technique) {
            Some(shader) => self.shader = Some(shader),
            None => {
                log::warn!(
                    "Unknown technique {}, falling back to {}",
                    technique,
                    config.default_technique
                );
                self.use_default_shader(shaders, config);
            }
        }
    }

    /// Re-resolve the technique against a new shader library
    pub(crate) fn reresolve(&mut self, shaders: &ShaderLibrary, config: &BridgeConfig) {
        if self.technique.is_empty() {
            self.use_default_shader(shaders, config);
        } else {
            let technique = self.technique.clone();
            self.set_technique(shaders, config, &technique);
        }
    }

    /// Apply one shading-node attribute. Returns true if anything meshes
    /// depend on changed.
    fn apply_parameter(&mut self, ctx: &HookContext, attribute: &str, value: &AttributeValue) -> bool {
        let Some(text) = value.as_str() else {
            return false;
        };
        if attribute == "technique" {
            if text.is_empty() || text == self.technique {
                return false;
            }
            self.set_technique(ctx.shaders, ctx.config, text);
            return true;
        }

        let name = vertex_source_name(text);
        let source = match attribute {
            "Color0_Source" => &mut self.sources.color,
            "Tangent0_Source" => &mut self.sources.tangent,
            "Binormal0_Source" => &mut self.sources.bitangent,
            _ => match TEXCOORD_SOURCES.iter().position(|a| *a == attribute) {
                Some(set) => &mut self.sources.texcoords[set],
                None => return false,
            },
        };
        if source.as_str() == name {
            return false;
        }
        *source = name.to_string();
        true
    }

    fn set_parameter(&mut self, base: &NodeBase, ctx: &mut HookContext, attribute: &str, value: &AttributeValue) {
        if self.apply_parameter(ctx, attribute, value) {
            log::debug!("Material {}: {} changed", base.name(), attribute);
            ctx.push(GraphCommand::NotifyConnected(base.id()));
        }
    }

    /// Wire `shader` as this material's surface shader
    pub(crate) fn connect_surface_shader(&mut self, base: &NodeBase, ctx: &mut HookContext, shader: HostId) {
        self.disconnect_surface_shader(base, ctx);
        ctx.push(GraphCommand::Subscribe {
            material: base.id(),
            shading_node: shader,
        });
        self.surface_shader = Some(shader);
        self.technique.clear();
        self.shader = None;

        if ctx.host.type_name(shader) == Some(ctx.config.shader_node_type.as_str()) {
            for attribute in ctx.host.attribute_names(shader) {
                if let Some(value) = ctx.host.attribute(shader, &attribute) {
                    self.apply_parameter(ctx, &attribute, &value);
                }
            }
            for (own, source) in ctx.host.incoming_connections(shader) {
                if ctx.host.kind(source.node) == Some(HostNodeKind::FileTexture) {
                    self.connect_texture(base, ctx, &own.attribute, source.node);
                }
            }
        }
        if self.shader.is_none() {
            self.use_default_shader(ctx.shaders, ctx.config);
        }

        log::debug!(
            "Material {} uses surface shader {} ({})",
            base.name(),
            shader,
            self.shader.as_ref().map(|s| s.name.as_str()).unwrap_or("none")
        );
        ctx.push(GraphCommand::NotifyConnected(base.id()));
    }

    /// Drop the current surface shader subscription and its texture slots
    pub(crate) fn disconnect_surface_shader(&mut self, base: &NodeBase, ctx: &mut HookContext) {
        let Some(previous) = self.surface_shader.take() else {
            return;
        };
        ctx.push(GraphCommand::Unsubscribe {
            material: base.id(),
            shading_node: previous,
        });
        for slot in self.textures.iter_mut() {
            if let Some(texture) = slot.take() {
                ctx.push(GraphCommand::Disconnect(base.id(), texture));
            }
        }
        self.technique.clear();
        self.sources = VertexSources::default();
    }

    /// Detach the surface shader and fall back to the default technique
    pub(crate) fn drop_surface_shader(&mut self, base: &NodeBase, ctx: &mut HookContext) {
        if self.surface_shader.is_none() {
            return;
        }
        self.disconnect_surface_shader(base, ctx);
        self.use_default_shader(ctx.shaders, ctx.config);
        ctx.push(GraphCommand::NotifyConnected(base.id()));
    }

    pub(crate) fn connect_texture(&mut self, base: &NodeBase, ctx: &mut HookContext, attribute: &str, texture: HostId) {
        let Some(slot) = texture_slot(attribute) else {
            return;
        };
        let node = ctx
            .find_node(texture)
            .filter(|id| ctx.nodes.get(*id).and_then(|n| n.as_texture()).is_some());
        let Some(node) = node else {
            log::warn!("Material {}: texture {} is not mirrored", base.name(), texture);
            return;
        };
        if self.textures[slot] == Some(node) {
            return;
        }
        if let Some(previous) = self.textures[slot].replace(node) {
            ctx.push(GraphCommand::Disconnect(base.id(), previous));
        }
        ctx.push(GraphCommand::Connect(base.id(), node));
        log::debug!("Material {}: {} -> slot {}", base.name(), texture, slot);
    }

    pub(crate) fn disconnect_texture(&mut self, base: &NodeBase, ctx: &mut HookContext, attribute: &str) {
        let Some(slot) = texture_slot(attribute) else {
            return;
        };
        if let Some(texture) = self.textures[slot].take() {
            ctx.push(GraphCommand::Disconnect(base.id(), texture));
        }
    }

    /// Connected texture node is going away
    pub(crate) fn forget_texture(&mut self, texture: NodeId) {
        for slot in self.textures.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    pub(crate) fn on_attribute_changed(&mut self, base: &NodeBase, ctx: &mut HookContext, change: &AttributeChange) {
        if !change.plug.is("surfaceShader") {
            return;
        }
        let Some(other) = change.other.as_ref() else {
            return;
        };
        if change.has(AttributeMessage::CONNECTION_MADE) {
            self.connect_surface_shader(base, ctx, other.node);
        } else if change.has(AttributeMessage::CONNECTION_BROKEN)
            && self.surface_shader == Some(other.node)
        {
            self.drop_surface_shader(base, ctx);
        }
    }

    /// Notification on the subscribed shading node
    pub(crate) fn on_shading_attribute_changed(
        &mut self,
        base: &NodeBase,
        ctx: &mut HookContext,
        change: &AttributeChange,
    ) {
        let other_kind = change.other.as_ref().and_then(|p| ctx.host.kind(p.node));
        if change.has(AttributeMessage::CONNECTION_MADE | AttributeMessage::OTHER_PLUG_SET) {
            match (other_kind, change.other.as_ref()) {
                (Some(HostNodeKind::MaterialInfo), _) => self.rescan_textures(base, ctx),
                (Some(HostNodeKind::FileTexture), Some(other)) => {
                    self.connect_texture(base, ctx, &change.plug.attribute, other.node)
                }
                _ => {}
            }
        } else if change.has(AttributeMessage::CONNECTION_BROKEN) {
            if other_kind == Some(HostNodeKind::FileTexture) {
                self.disconnect_texture(base, ctx, &change.plug.attribute);
            }
        } else if change.has(AttributeMessage::ATTRIBUTE_SET) {
            self.refresh_parameter(base, ctx, &change.plug);
        }
    }

    pub(crate) fn on_shading_dirty(&mut self, base: &NodeBase, ctx: &mut HookContext, plug: &Plug) {
        self.refresh_parameter(base, ctx, plug);
    }

    fn refresh_parameter(&mut self, base: &NodeBase, ctx: &mut HookContext, plug: &Plug) {
        if ctx.host.type_name(plug.node) != Some(ctx.config.shader_node_type.as_str()) {
            return;
        }
        match ctx.host.attribute(plug.node, &plug.attribute) {
            Some(value) => self.set_parameter(base, ctx, &plug.attribute, &value),
            None => log::warn!("Material {}: cannot read {}", base.name(), plug.attribute),
        }
    }

    /// Bind every texture already wired into the surface shader's slots
    fn rescan_textures(&mut self, base: &NodeBase, ctx: &mut HookContext) {
        let Some(shader) = self.surface_shader else {
            return;
        };
        for (own, source) in ctx.host.incoming_connections(shader) {
            if ctx.host.kind(source.node) == Some(HostNodeKind::FileTexture) {
                self.connect_texture(base, ctx, &own.attribute, source.node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_slots_match_exactly() {
        assert_eq!(texture_slot("Texture0"), Some(0));
        assert_eq!(texture_slot("Texture8"), Some(8));
        assert_eq!(texture_slot("Texture9"), None);
        assert_eq!(texture_slot("texture0"), None);
        assert_eq!(texture_slot("DiffuseTexture"), None);
    }

    #[test]
    fn test_vertex_source_name() {
        assert_eq!(vertex_source_name("uv:map1"), "map1");
        assert_eq!(vertex_source_name("color:a:b"), "b");
        assert_eq!(vertex_source_name("map2"), "map2");
        assert_eq!(vertex_source_name(""), "");
    }

    #[test]
    fn test_new_material_starts_empty() {
        let material = MaterialNode::new(None);
        assert!(material.shader().is_none());
        assert_eq!(material.texture_slots().count(), 0);
        assert!(material.texture(12).is_none());
    }
}
