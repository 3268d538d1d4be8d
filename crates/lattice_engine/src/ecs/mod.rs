//! Entity-Component core
//!
//! Entity identity with FIFO id recycling, plus the paged hierarchical
//! transform component store. Component managers are independent of the
//! entity manager: destroying an entity does not remove its components;
//! each manager's callers clean up its records.

pub mod entity;
pub mod transform;

pub use entity::{Entity, EntityManager};
pub use transform::{Parent, TransformComponentManager};
