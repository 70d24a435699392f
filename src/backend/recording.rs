//! Recording backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It hands out handles, keeps buffer
//! contents and input layouts around, and records every bind and draw
//! command so tests can inspect what the bridge issued.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use super::traits::*;
use super::types::*;

/// Kind of backend resource, used for live resource accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Sampler,
    Shader,
    InputLayout,
}

/// A command recorded by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    SetShaders {
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    },
    SetInputLayout(InputLayoutHandle),
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        stride: u64,
    },
    SetIndexBuffer(BufferHandle),
    SetConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: BufferHandle,
    },
    SetTexture {
        slot: u32,
        texture: TextureHandle,
    },
    SetSampler {
        slot: u32,
        sampler: SamplerHandle,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

/// Bind state captured at the moment of one draw call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawRecord {
    pub shaders: Option<(ShaderHandle, ShaderHandle)>,
    pub input_layout: Option<InputLayoutHandle>,
    pub vertex_buffers: BTreeMap<u32, BufferHandle>,
    pub index_buffer: Option<BufferHandle>,
    pub object_uniform: Option<BufferHandle>,
    pub textures: BTreeMap<u32, TextureHandle>,
    pub index_count: u32,
}

/// Recording backend.
#[derive(Debug)]
pub struct RecordingBackend {
    ready: bool,
    next_id: u64,
    live: HashMap<(ResourceKind, u64), String>,
    created: HashMap<ResourceKind, usize>,
    buffers: HashMap<u64, Vec<u8>>,
    layouts: HashMap<u64, Vec<VertexBufferLayout>>,
    commands: Vec<RecordedCommand>,
    invalid_destroys: usize,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// Create a new recording backend with a usable device.
    pub fn new() -> Self {
        Self {
            ready: true,
            next_id: 1,
            live: HashMap::new(),
            created: HashMap::new(),
            buffers: HashMap::new(),
            layouts: HashMap::new(),
            commands: Vec::new(),
            invalid_destroys: 0,
        }
    }

    /// Create a backend that reports no render device.
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Recording Backend"
    }

    fn allocate(&mut self, kind: ResourceKind, label: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert((kind, id), label.to_string());
        *self.created.entry(kind).or_insert(0) += 1;
        id
    }

    fn release(&mut self, kind: ResourceKind, id: u64) {
        if self.live.remove(&(kind, id)).is_none() {
            log::warn!("RecordingBackend: destroying unknown {:?} {}", kind, id);
            self.invalid_destroys += 1;
        }
    }

    /// Commands recorded since the last [`clear_commands`](Self::clear_commands)
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of draw calls recorded
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::DrawIndexed { .. }))
            .count()
    }

    /// Replay the recorded commands and capture bind state at each draw
    pub fn draws(&self) -> Vec<DrawRecord> {
        let mut state = DrawRecord::default();
        let mut draws = Vec::new();
        for command in &self.commands {
            match command {
                RecordedCommand::SetShaders { vertex, fragment } => {
                    state.shaders = Some((*vertex, *fragment))
                }
                RecordedCommand::SetInputLayout(layout) => state.input_layout = Some(*layout),
                RecordedCommand::SetVertexBuffer { slot, buffer, .. } => {
                    state.vertex_buffers.insert(*slot, *buffer);
                }
                RecordedCommand::SetIndexBuffer(buffer) => state.index_buffer = Some(*buffer),
                RecordedCommand::SetConstantBuffer { slot, buffer, .. } => {
                    if *slot == OBJECT_UNIFORM_SLOT {
                        state.object_uniform = Some(*buffer);
                    }
                }
                RecordedCommand::SetTexture { slot, texture } => {
                    state.textures.insert(*slot, *texture);
                }
                RecordedCommand::SetSampler { .. } => {}
                RecordedCommand::DrawIndexed { indices, .. } => {
                    let mut record = state.clone();
                    record.index_count = indices.end - indices.start;
                    draws.push(record);
                }
            }
        }
        draws
    }

    /// Total number of live resources of every kind
    pub fn live_resource_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live.keys().filter(|(k, _)| *k == kind).count()
    }

    /// Number of resources of a kind created over the backend's lifetime
    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    /// Destroy calls for handles that were not live
    pub fn invalid_destroys(&self) -> usize {
        self.invalid_destroys
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.live
            .get(&(ResourceKind::Buffer, buffer.0))
            .map(String::as_str)
    }

    pub fn input_layout_streams(&self, layout: InputLayoutHandle) -> Option<&[VertexBufferLayout]> {
        self.layouts.get(&layout.0).map(Vec::as_slice)
    }
}

impl RenderBackend for RecordingBackend {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "RecordingBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        if data.len() as u64 > desc.size {
            return Err(BackendError::BufferCreationFailed(format!(
                "{} bytes of data for a {} byte buffer",
                data.len(),
                desc.size
            )));
        }
        let id = self.allocate(ResourceKind::Buffer, desc.label.as_deref().unwrap_or(""));
        let mut contents = vec![0u8; desc.size as usize];
        contents[..data.len()].copy_from_slice(data);
        self.buffers.insert(id, contents);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        log::trace!("RecordingBackend: writing {} bytes to buffer {}", data.len(), buffer.0);
        let Some(contents) = self.buffers.get_mut(&buffer.0) else {
            log::warn!("RecordingBackend: write to unknown buffer {}", buffer.0);
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[start..end].copy_from_slice(data);
    }

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> BackendResult<TextureHandle> {
        log::trace!(
            "RecordingBackend: creating texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
        if desc.width == 0 || desc.height == 0 || data.len() != expected {
            return Err(BackendError::TextureCreationFailed(format!(
                "{}x{} texture with {} bytes of data",
                desc.width,
                desc.height,
                data.len()
            )));
        }
        let id = self.allocate(ResourceKind::Texture, desc.label.as_deref().unwrap_or(""));
        Ok(TextureHandle(id))
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("RecordingBackend: creating sampler {:?}", desc.label);
        let id = self.allocate(ResourceKind::Sampler, desc.label.as_deref().unwrap_or(""));
        Ok(SamplerHandle(id))
    }

    fn create_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
        entry_point: &str,
    ) -> BackendResult<ShaderHandle> {
        log::trace!(
            "RecordingBackend: creating {:?} shader {} ({})",
            stage,
            label,
            entry_point
        );
        if source.is_empty() {
            return Err(BackendError::ShaderCreationFailed(format!(
                "{label}: empty source"
            )));
        }
        let id = self.allocate(ResourceKind::Shader, label);
        Ok(ShaderHandle(id))
    }

    fn create_input_layout(
        &mut self,
        vertex_shader: ShaderHandle,
        streams: &[VertexBufferLayout],
    ) -> BackendResult<InputLayoutHandle> {
        log::trace!(
            "RecordingBackend: creating input layout for shader {} ({} streams)",
            vertex_shader.0,
            streams.len()
        );
        if !self.live.contains_key(&(ResourceKind::Shader, vertex_shader.0)) {
            return Err(BackendError::InputLayoutCreationFailed(format!(
                "unknown vertex shader {}",
                vertex_shader.0
            )));
        }
        let id = self.allocate(ResourceKind::InputLayout, "input layout");
        self.layouts.insert(id, streams.to_vec());
        Ok(InputLayoutHandle(id))
    }

    fn set_shaders(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) {
        self.commands
            .push(RecordedCommand::SetShaders { vertex, fragment });
    }

    fn set_input_layout(&mut self, layout: InputLayoutHandle) {
        self.commands.push(RecordedCommand::SetInputLayout(layout));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, stride: u64) {
        self.commands.push(RecordedCommand::SetVertexBuffer {
            slot,
            buffer,
            stride,
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(RecordedCommand::SetIndexBuffer(buffer));
    }

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        self.commands.push(RecordedCommand::SetConstantBuffer {
            stage,
            slot,
            buffer,
        });
    }

    fn set_texture(&mut self, slot: u32, texture: TextureHandle) {
        self.commands
            .push(RecordedCommand::SetTexture { slot, texture });
    }

    fn set_sampler(&mut self, slot: u32, sampler: SamplerHandle) {
        self.commands
            .push(RecordedCommand::SetSampler { slot, sampler });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        log::trace!("RecordingBackend: draw_indexed {:?}", indices);
        self.commands.push(RecordedCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.release(ResourceKind::Buffer, buffer.0);
        self.buffers.remove(&buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.release(ResourceKind::Texture, texture.0);
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.release(ResourceKind::Sampler, sampler.0);
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        self.release(ResourceKind::Shader, shader.0);
    }

    fn destroy_input_layout(&mut self, layout: InputLayoutHandle) {
        self.release(ResourceKind::InputLayout, layout.0);
        self.layouts.remove(&layout.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_lifecycle() {
        let mut backend = RecordingBackend::new();
        let buffer = backend
            .create_buffer_init(&BufferDescriptor::uniform("object", 8), &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(backend.buffer_contents(buffer), Some(&[1, 2, 3, 4, 0, 0, 0, 0][..]));

        backend.write_buffer(buffer, 4, &[9, 9]);
        assert_eq!(backend.buffer_contents(buffer), Some(&[1, 2, 3, 4, 9, 9, 0, 0][..]));

        backend.destroy_buffer(buffer);
        assert_eq!(backend.live_resource_count(), 0);
        backend.destroy_buffer(buffer);
        assert_eq!(backend.invalid_destroys(), 1);
    }

    #[test]
    fn test_texture_size_mismatch() {
        let mut backend = RecordingBackend::new();
        let desc = TextureDescriptor {
            width: 2,
            height: 2,
            ..Default::default()
        };
        assert!(backend.create_texture(&desc, &[0; 4]).is_err());
        assert!(backend.create_texture(&desc, &[0; 16]).is_ok());
        assert_eq!(backend.live_count(ResourceKind::Texture), 1);
    }

    #[test]
    fn test_draws_capture_bind_state() {
        let mut backend = RecordingBackend::new();
        let vs = backend
            .create_shader(ShaderStage::Vertex, "vs", "src", "vs_main")
            .unwrap();
        let fs = backend
            .create_shader(ShaderStage::Fragment, "fs", "src", "fs_main")
            .unwrap();
        let ub = backend
            .create_buffer_init(&BufferDescriptor::uniform("ub", 64), &[])
            .unwrap();

        let ib = backend
            .create_buffer_init(&BufferDescriptor::index("ib", 24), &[0; 24])
            .unwrap();

        backend.set_shaders(vs, fs);
        backend.set_index_buffer(ib);
        backend.set_constant_buffer(ShaderStage::Vertex, OBJECT_UNIFORM_SLOT, ub);
        backend.draw_indexed(0..6, 0, 0..1);
        backend.draw_indexed(0..3, 0, 0..1);

        let draws = backend.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].shaders, Some((vs, fs)));
        assert_eq!(draws[0].object_uniform, Some(ub));
        assert_eq!(draws[0].index_buffer, Some(ib));
        assert_eq!(draws[0].index_count, 6);
        assert_eq!(draws[1].index_count, 3);
    }

    #[test]
    fn test_unavailable_device() {
        assert!(!RecordingBackend::unavailable().is_ready());
        assert!(RecordingBackend::new().is_ready());
    }
}
