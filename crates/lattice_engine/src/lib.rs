//! # Lattice Engine
//!
//! Concurrent scene-state core for a real-time rendering engine.
//!
//! Worker threads build scene state (entities, hierarchical transforms,
//! resource requests) while a single render thread consumes it without
//! stalling:
//!
//! - **ECS core**: entity identity with FIFO id recycling, plus a paged,
//!   per-page-locked hierarchical transform store.
//! - **Task plumbing**: a generic thread-safe FIFO and a persistent
//!   worker pool built on top of it.
//! - **Resource lifecycle**: name-memoized GPU resource registries with
//!   asynchronous construction. Device calls are confined to the one
//!   thread that owns the [`render::DeviceExecutor`].
//! - **Render jobs**: a shader → material → mesh → entity batching tree
//!   emitting capped instanced draw calls, skipping anything not yet
//!   constructed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lattice_engine::prelude::*;
//!
//! fn main() {
//!     lattice_engine::foundation::logging::init();
//!
//!     let device = HeadlessDevice::new();
//!     let (mut engine, mut executor) = Engine::new(EngineConfig::default(), Box::new(device));
//!
//!     // Any thread may request resources; construction happens later,
//!     // on whichever thread drives the executor.
//!     let program = engine.resources().create_program(
//!         "basic",
//!         ProgramDescriptor::new("// vs", "// fs"),
//!     );
//!
//!     // Render thread, once per frame:
//!     executor.drain();
//!     assert!(engine.resources().is_ready(program));
//!
//!     engine.shutdown();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod engine;
pub mod foundation;
pub mod render;
pub mod tasks;

/// Commonly used types, re-exported for convenient glob import.
pub mod prelude {
    pub use crate::config::{Config, EngineConfig};
    pub use crate::ecs::{Entity, EntityManager, Parent, TransformComponentManager};
    pub use crate::engine::{Engine, EngineError};
    pub use crate::foundation::math::{Mat4, Quat, Vec3};
    pub use crate::render::device::{
        BufferDescriptor, BufferUsage, DeviceError, DeviceHandle, DrawCall, MeshDescriptor,
        ProgramDescriptor, RenderDevice, TextureDescriptor, TextureFormat,
    };
    pub use crate::render::executor::DeviceExecutor;
    pub use crate::render::headless::HeadlessDevice;
    pub use crate::render::jobs::RenderJobManager;
    pub use crate::render::material::{Material, MaterialId};
    pub use crate::render::resources::{ResourceId, ResourceManager, ResourceState};
    pub use crate::tasks::{MtQueue, TaskScheduler};
}
