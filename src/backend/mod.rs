//! Backend abstraction layer
//!
//! Provides the resource/draw interface the bridge renders through, plus a
//! recording implementation that needs no GPU.

pub mod recording;
pub mod traits;
pub mod types;

pub use recording::{DrawRecord, RecordedCommand, RecordingBackend, ResourceKind};
pub use traits::*;
pub use types::*;
