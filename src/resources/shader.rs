//! Render-engine shader registry
//!
//! Resolves technique names to compiled vertex/fragment pairs. Vertex
//! inputs are reflected from WGSL with naga: `@location(n)` maps to
//! [`VertexChannel`] `n`, so a shader declares the channels it consumes
//! just by the locations it reads.

use std::collections::HashMap;
use std::sync::Arc;

use naga::{Binding, EntryPoint, Handle, Module, Type, TypeInner};
use thiserror::Error;

use crate::backend::{
    BackendError, RenderBackend, ShaderHandle, ShaderStage, VertexChannel, VertexChannels,
};

/// Name of the fallback technique
pub const SIMPLE_MESH: &str = "SimpleMesh";
/// Name of the built-in textured technique
pub const TEXTURED_MESH: &str = "TexturedMesh";

const SIMPLE_MESH_SOURCE: &str = include_str!("shaders/simple_mesh.wgsl");
const TEXTURED_MESH_SOURCE: &str = include_str!("shaders/textured_mesh.wgsl");

/// Shader compilation error
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to parse shader {name}: {message}")]
    Parse { name: String, message: String },
    #[error("Shader {name} has no {stage:?} entry point")]
    MissingEntryPoint { name: String, stage: ShaderStage },
    #[error("Vertex shader of {0} does not read a position")]
    MissingPosition(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Compiled vertex/fragment pair and the vertex channels it consumes
#[derive(Debug, PartialEq)]
pub struct ShaderProgram {
    pub name: String,
    pub vertex: ShaderHandle,
    pub fragment: ShaderHandle,
    pub channels: VertexChannels,
}

impl ShaderProgram {
    pub fn new(
        name: impl Into<String>,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        channels: VertexChannels,
    ) -> Self {
        Self {
            name: name.into(),
            vertex,
            fragment,
            channels: channels | VertexChannels::POSITION,
        }
    }

    pub fn declares(&self, channel: VertexChannel) -> bool {
        self.channels.contains(channel.flag())
    }
}

/// Vertex inputs and entry point names reflected from a WGSL module
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderReflection {
    pub channels: VertexChannels,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

/// Parse WGSL and reflect the vertex entry point's inputs
pub fn reflect_wgsl(name: &str, source: &str) -> Result<ShaderReflection, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        name: name.to_string(),
        message: e.emit_to_string(source),
    })?;

    let vertex = find_entry_point(&module, name, ShaderStage::Vertex)?;
    let fragment = find_entry_point(&module, name, ShaderStage::Fragment)?;

    let mut channels = VertexChannels::empty();
    for argument in &vertex.function.arguments {
        collect_locations(&module, argument.binding.as_ref(), argument.ty, name, &mut channels);
    }
    if !channels.contains(VertexChannels::POSITION) {
        return Err(ShaderError::MissingPosition(name.to_string()));
    }

    Ok(ShaderReflection {
        channels,
        vertex_entry: vertex.name.clone(),
        fragment_entry: fragment.name.clone(),
    })
}

fn find_entry_point<'m>(
    module: &'m Module,
    name: &str,
    stage: ShaderStage,
) -> Result<&'m EntryPoint, ShaderError> {
    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| ShaderError::MissingEntryPoint {
            name: name.to_string(),
            stage,
        })
}

fn collect_locations(
    module: &Module,
    binding: Option<&Binding>,
    ty: Handle<Type>,
    name: &str,
    channels: &mut VertexChannels,
) {
    match binding {
        Some(Binding::Location { location, .. }) => match VertexChannel::from_location(*location) {
            Some(channel) => *channels |= channel.flag(),
            None => log::warn!("Shader {}: ignoring vertex input @location({})", name, location),
        },
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.binding.as_ref(), member.ty, name, channels);
                }
            }
        }
    }
}

/// Technique name → compiled shader program
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    programs: HashMap<String, Arc<ShaderProgram>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding the built-in techniques
    pub fn with_builtin(backend: &mut dyn RenderBackend) -> Result<Self, ShaderError> {
        let mut library = Self::new();
        library.compile_wgsl(backend, SIMPLE_MESH, SIMPLE_MESH_SOURCE)?;
        library.compile_wgsl(backend, TEXTURED_MESH, TEXTURED_MESH_SOURCE)?;
        Ok(library)
    }

    /// Add a program, returning the one it replaced
    pub fn register(&mut self, program: ShaderProgram) -> Option<Arc<ShaderProgram>> {
        self.insert(Arc::new(program))
    }

    fn insert(&mut self, program: Arc<ShaderProgram>) -> Option<Arc<ShaderProgram>> {
        log::debug!(
            "Registered shader {} ({:?})",
            program.name,
            program.channels
        );
        self.programs.insert(program.name.clone(), program)
    }

    pub fn find(&self, name: &str) -> Option<Arc<ShaderProgram>> {
        self.programs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }

    /// Compile a WGSL technique and register it under `name`.
    ///
    /// A program previously registered under the same name is destroyed;
    /// holders of it must re-resolve.
    pub fn compile_wgsl(
        &mut self,
        backend: &mut dyn RenderBackend,
        name: &str,
        source: &str,
    ) -> Result<Arc<ShaderProgram>, ShaderError> {
        let reflection = reflect_wgsl(name, source)?;

        let vertex = backend.create_shader(
            ShaderStage::Vertex,
            &format!("{name}.vs"),
            source,
            &reflection.vertex_entry,
        )?;
        let fragment = match backend.create_shader(
            ShaderStage::Fragment,
            &format!("{name}.fs"),
            source,
            &reflection.fragment_entry,
        ) {
            Ok(fragment) => fragment,
            Err(e) => {
                backend.destroy_shader(vertex);
                return Err(e.into());
            }
        };

        let program = Arc::new(ShaderProgram::new(
            name,
            vertex,
            fragment,
            reflection.channels,
        ));
        if let Some(old) = self.insert(program.clone()) {
            log::warn!("Shader {} replaced", name);
            backend.destroy_shader(old.vertex);
            backend.destroy_shader(old.fragment);
        }
        Ok(program)
    }

    /// Destroy every program's shaders and empty the library
    pub fn destroy_all(&mut self, backend: &mut dyn RenderBackend) {
        for (_, program) in self.programs.drain() {
            backend.destroy_shader(program.vertex);
            backend.destroy_shader(program.fragment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, ResourceKind};

    const TEXCOORD_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn main_vs(
    @location(0) position: vec3<f32>,
    @location(3) uv: vec2<f32>,
    @location(7) tangent: vec3<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position + tangent * 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn main_fs(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.uv, 0.0, 1.0);
}
"#;

    #[test]
    fn test_reflect_builtin_shaders() {
        let simple = reflect_wgsl(SIMPLE_MESH, SIMPLE_MESH_SOURCE).unwrap();
        assert_eq!(simple.channels, VertexChannels::POSITION | VertexChannels::NORMAL);
        assert_eq!(simple.vertex_entry, "vs_main");
        assert_eq!(simple.fragment_entry, "fs_main");

        let textured = reflect_wgsl(TEXTURED_MESH, TEXTURED_MESH_SOURCE).unwrap();
        assert_eq!(
            textured.channels,
            VertexChannels::POSITION | VertexChannels::NORMAL | VertexChannels::TEXCOORD0
        );
    }

    #[test]
    fn test_reflect_argument_locations() {
        let reflection = reflect_wgsl("custom", TEXCOORD_SHADER).unwrap();
        assert_eq!(
            reflection.channels,
            VertexChannels::POSITION | VertexChannels::TEXCOORD0 | VertexChannels::TANGENT
        );
        assert_eq!(reflection.vertex_entry, "main_vs");
    }

    #[test]
    fn test_parse_error() {
        let err = reflect_wgsl("broken", "fn vs_main( {").unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }));
    }

    #[test]
    fn test_missing_fragment_entry() {
        let source = "@vertex fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 1.0); }";
        let err = reflect_wgsl("vs_only", source).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::MissingEntryPoint {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn test_library_compile_and_replace() {
        let mut backend = RecordingBackend::new();
        let mut library = ShaderLibrary::with_builtin(&mut backend).unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.find(SIMPLE_MESH).is_some());
        assert!(library.find("Unknown").is_none());
        assert_eq!(backend.live_count(ResourceKind::Shader), 4);

        library
            .compile_wgsl(&mut backend, SIMPLE_MESH, SIMPLE_MESH_SOURCE)
            .unwrap();
        assert_eq!(backend.live_count(ResourceKind::Shader), 4);

        library.destroy_all(&mut backend);
        assert!(library.is_empty());
        assert_eq!(backend.live_count(ResourceKind::Shader), 0);
        assert_eq!(backend.invalid_destroys(), 0);
    }
}
