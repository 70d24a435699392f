//! Input layout cache
//!
//! Meshes lay every vertex channel out as its own stream, so one input
//! layout exists per (vertex shader, channel set).

use std::collections::HashMap;

use crate::backend::{
    BackendResult, InputLayoutHandle, RenderBackend, ShaderHandle, VertexAttribute,
    VertexBufferLayout, VertexChannels,
};

/// Vertex streams for a channel set, one per channel in stream order
pub fn stream_layouts(channels: VertexChannels) -> Vec<VertexBufferLayout> {
    channels
        .channels()
        .map(|channel| VertexBufferLayout {
            array_stride: channel.format().size(),
            attributes: vec![VertexAttribute {
                location: channel.location(),
                format: channel.format(),
                offset: 0,
            }],
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct LayoutCache {
    layouts: HashMap<(ShaderHandle, VertexChannels), InputLayoutHandle>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        backend: &mut dyn RenderBackend,
        vertex_shader: ShaderHandle,
        channels: VertexChannels,
    ) -> BackendResult<InputLayoutHandle> {
        if let Some(layout) = self.layouts.get(&(vertex_shader, channels)) {
            return Ok(*layout);
        }
        let layout = backend.create_input_layout(vertex_shader, &stream_layouts(channels))?;
        log::debug!(
            "Created input layout for shader {} ({:?})",
            vertex_shader.raw(),
            channels
        );
        self.layouts.insert((vertex_shader, channels), layout);
        Ok(layout)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Destroy every cached layout
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, layout) in self.layouts.drain() {
            backend.destroy_input_layout(layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, ResourceKind, ShaderStage, VertexFormat};

    #[test]
    fn test_one_stream_per_channel() {
        let layouts = stream_layouts(
            VertexChannels::POSITION | VertexChannels::TEXCOORD1 | VertexChannels::COLOR,
        );
        assert_eq!(layouts.len(), 3);
        assert_eq!(layouts[0].attributes[0].location, 0);
        assert_eq!(layouts[1].attributes[0].format, VertexFormat::Float32x4);
        assert_eq!(layouts[1].array_stride, 16);
        assert_eq!(layouts[2].attributes[0].location, 4);
        assert_eq!(layouts[2].array_stride, 8);
    }

    #[test]
    fn test_layouts_are_cached() {
        let mut backend = RecordingBackend::new();
        let vs = backend
            .create_shader(ShaderStage::Vertex, "vs", "source", "vs_main")
            .unwrap();
        let mut cache = LayoutCache::new();

        let a = cache
            .get_or_create(&mut backend, vs, VertexChannels::POSITION)
            .unwrap();
        let b = cache
            .get_or_create(&mut backend, vs, VertexChannels::POSITION)
            .unwrap();
        let c = cache
            .get_or_create(&mut backend, vs, VertexChannels::POSITION | VertexChannels::NORMAL)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(backend.live_count(ResourceKind::InputLayout), 2);
        assert_eq!(backend.input_layout_streams(c).map(|s| s.len()), Some(2));

        cache.clear(&mut backend);
        assert!(cache.is_empty());
        assert_eq!(backend.live_count(ResourceKind::InputLayout), 0);
    }
}
