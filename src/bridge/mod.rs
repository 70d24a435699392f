//! Shadow scene graph
//!
//! One [`ShadowNode`] mirrors each host node the renderer cares about. The
//! [`GraphRegistry`] owns them all, dispatches host notifications to them
//! and runs the per-frame update and draw passes.

mod error;
mod light;
mod material;
mod mesh;
mod node;
mod registry;
mod settings;
mod table;
mod texture;
mod transform;

pub use error::{BridgeError, TopologyError};
pub use light::{GpuLightData, LightKind, LightNode};
pub use material::{texture_slot, vertex_source_name, MaterialNode, TEXTURE_SLOT_COUNT};
pub use mesh::{required_channels, GeometryError, MeshInstance, MeshNode, Submesh};
pub use node::{
    DrawContext, GraphCommand, HookContext, NodeBase, NodeKind, ResourceGarbage, ShadingPath,
    ShadowKind, ShadowNode, UpdateContext,
};
pub use registry::{DrawStats, GraphRegistry};
pub use settings::{SettingsNode, ViewportSettings};
pub use table::{NodeId, NodeTable};
pub use texture::{address_mode, TextureNode};
pub use transform::{effective_visibility, world_matrix, TransformNode};
