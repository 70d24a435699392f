//! Settings node: viewport-wide toggles read from a host plugin node

use super::node::{HookContext, NodeBase, UpdateContext};
use crate::host::{AttributeChange, AttributeMessage, AttributeValue};

/// Global toggles consumed by the render operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSettings {
    pub fxaa_enable: bool,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self { fxaa_enable: true }
    }
}

#[derive(Debug, Default)]
pub struct SettingsNode {
    settings: ViewportSettings,
    initialized: bool,
}

impl SettingsNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> ViewportSettings {
        self.settings
    }

    fn set_parameter(&mut self, attribute: &str, value: &AttributeValue) {
        if let "fxaaEnable" | "fae" = attribute {
            match value.as_bool() {
                Some(enable) => self.settings.fxaa_enable = enable,
                None => log::warn!("Settings: {} is not a bool", attribute),
            }
        }
    }

    pub(crate) fn on_attribute_changed(&mut self, ctx: &mut HookContext, change: &AttributeChange) {
        if !change.has(AttributeMessage::ATTRIBUTE_SET) {
            return;
        }
        if let Some(value) = ctx.host.attribute(change.plug.node, &change.plug.attribute) {
            self.set_parameter(&change.plug.attribute, &value);
        }
    }

    pub(crate) fn update(&mut self, base: &NodeBase, ctx: &mut UpdateContext) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        for attribute in ctx.host.attribute_names(base.host()) {
            if let Some(value) = ctx.host.attribute(base.host(), &attribute) {
                self.set_parameter(&attribute, &value);
            }
        }
        log::debug!("Settings {}: {:?}", base.name(), self.settings);
    }
}
