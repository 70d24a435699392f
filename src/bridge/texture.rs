//! Texture node: a host file texture loaded into a GPU texture and sampler

use super::node::{HookContext, NodeBase, ResourceGarbage, UpdateContext};
use crate::backend::{AddressMode, RenderBackend, SamplerHandle};
use crate::host::{AttributeChange, AttributeMessage, HostGraph, HostId};
use crate::resources::{sampler_descriptor, GpuTexture, TextureData};

const ADDRESSING_ATTRIBUTES: [&str; 4] = ["mu", "mv", "wu", "wv"];

/// Addressing for one axis: mirroring wins over wrapping
pub fn address_mode(mirror: bool, wrap: bool) -> AddressMode {
    if mirror {
        AddressMode::MirrorRepeat
    } else if wrap {
        AddressMode::Repeat
    } else {
        AddressMode::ClampToEdge
    }
}

fn read_bool(host: &dyn HostGraph, node: HostId, attribute: &str, default: bool) -> bool {
    host.attribute(node, attribute)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

#[derive(Debug, Default)]
pub struct TextureNode {
    path: String,
    texture: Option<GpuTexture>,
    sampler: Option<SamplerHandle>,
    address: (AddressMode, AddressMode),
    initialized: bool,
    texture_dirty: bool,
    sampler_dirty: bool,
}

impl TextureNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn texture(&self) -> Option<&GpuTexture> {
        self.texture.as_ref()
    }

    pub fn sampler(&self) -> Option<SamplerHandle> {
        self.sampler
    }

    /// (u, v) addressing of the current sampler
    pub fn address(&self) -> (AddressMode, AddressMode) {
        self.address
    }

    pub(crate) fn on_attribute_changed(&mut self, base: &NodeBase, ctx: &mut HookContext, change: &AttributeChange) {
        let plug = &change.plug;
        if change.has(AttributeMessage::ATTRIBUTE_SET) && plug.is("ftn") {
            match ctx.host.attribute(plug.node, "ftn").as_ref().and_then(|v| v.as_str()) {
                Some(path) => {
                    log::debug!("Texture {}: file {}", base.name(), path);
                    self.path = path.to_string();
                    self.texture_dirty = true;
                }
                None => log::warn!("Texture {}: cannot read file name", base.name()),
            }
        } else if change.has(AttributeMessage::ATTRIBUTE_EVAL) && plug.is("oc") {
            self.sampler_dirty = true;
        } else if (change.has(AttributeMessage::ATTRIBUTE_SET) || change.has(AttributeMessage::OTHER_PLUG_SET))
            && ADDRESSING_ATTRIBUTES.iter().any(|a| plug.is(a))
        {
            self.sampler_dirty = true;
        }
    }

    pub(crate) fn update(&mut self, base: &NodeBase, ctx: &mut UpdateContext) {
        if !self.initialized {
            self.initialized = true;
            if let Some(path) = ctx.host.attribute(base.host(), "ftn").as_ref().and_then(|v| v.as_str()) {
                if !path.is_empty() && self.path.is_empty() {
                    self.path = path.to_string();
                    self.texture_dirty = true;
                }
            }
        }

        if self.texture_dirty {
            self.texture_dirty = false;
            self.load(base, ctx.backend);
        }

        if self.sampler_dirty && self.texture.is_some() {
            self.sampler_dirty = false;
            let host = base.host();
            let u = address_mode(
                read_bool(ctx.host, host, "mu", false),
                read_bool(ctx.host, host, "wu", true),
            );
            let v = address_mode(
                read_bool(ctx.host, host, "mv", false),
                read_bool(ctx.host, host, "wv", true),
            );
            if let Some(old) = self.sampler.take() {
                ctx.backend.destroy_sampler(old);
            }
            match ctx.backend.create_sampler(&sampler_descriptor(base.name(), u, v)) {
                Ok(sampler) => {
                    self.sampler = Some(sampler);
                    self.address = (u, v);
                }
                Err(e) => log::error!("Texture {}: {}", base.name(), e),
            }
        }
    }

    fn load(&mut self, base: &NodeBase, backend: &mut dyn RenderBackend) {
        if let Some(old) = self.texture.take() {
            backend.destroy_texture(old.handle);
        }
        if self.path.is_empty() {
            return;
        }
        let data = match TextureData::from_file(&self.path) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Texture {}: {}", base.name(), e);
                return;
            }
        };
        match GpuTexture::create(backend, &data) {
            Ok(texture) => {
                log::debug!(
                    "Texture {}: loaded {}x{} from {}",
                    base.name(),
                    texture.width,
                    texture.height,
                    self.path
                );
                self.texture = Some(texture);
                self.sampler_dirty = true;
            }
            Err(e) => log::error!("Texture {}: {}", base.name(), e),
        }
    }

    pub(crate) fn release(&mut self, garbage: &mut ResourceGarbage) {
        if let Some(texture) = self.texture.take() {
            garbage.push_texture(texture.handle);
        }
        if let Some(sampler) = self.sampler.take() {
            garbage.push_sampler(sampler);
        }
    }
}
