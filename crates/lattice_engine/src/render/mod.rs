//! Render-side managers
//!
//! Everything here runs on the CPU. Device work is expressed as
//! closures over the [`device::RenderDevice`] trait and executed only
//! by the [`executor::DeviceExecutor`], which a single render thread
//! owns. Any other thread may request resources through
//! [`resources::ResourceManager`] without blocking on device work.

pub mod device;
pub mod executor;
pub mod headless;
pub mod jobs;
pub mod material;
pub mod resources;

pub use device::{DeviceError, DeviceHandle, DrawCall, RenderDevice};
pub use executor::DeviceExecutor;
pub use jobs::RenderJobManager;
pub use material::{Material, MaterialId};
pub use resources::{ResourceId, ResourceManager, ResourceState};
