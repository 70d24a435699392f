//! Resource management
//!
//! Shader programs, input layouts and textures the bridge creates through
//! the render backend.

mod layout;
mod shader;
mod texture;

pub use layout::*;
pub use shader::*;
pub use texture::*;
