//! Target-independent core of the geoc host: guest memory marshaling, handle
//! tables and the GL resource layer, scene registration, the transform
//! scheduler and the render loop. The browser bindings live in `geoc-web`.

pub mod config;
pub mod controller;
pub mod error;
pub mod gl;
pub mod handle;
pub mod interval;
pub mod math;
pub mod memory;
pub mod render;
pub mod resources;
pub mod scene;
pub mod scheduler;
pub mod selection;
pub mod shadow;

#[cfg(test)]
mod testing;

pub use config::HostConfig;
pub use controller::{Outcome, SceneController};
pub use error::{GeocError, Result};
pub use handle::{Handle, ResourceTable};
pub use resources::GlResources;
pub use scene::{Guest, Operation, SceneRef, ShapeKind};
pub use scheduler::{RunId, TransformScheduler};
pub use selection::SelectionSet;
