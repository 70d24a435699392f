//! Host scene graph interface
//!
//! The bridge reads the host through [`HostGraph`] and is driven by the
//! [`HostEvent`]s the host delivers.

pub mod graph;
pub mod memory;
pub mod types;

pub use graph::HostGraph;
pub use memory::{MemoryHost, MeshData};
pub use types::*;
