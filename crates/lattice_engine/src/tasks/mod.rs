//! Task plumbing
//!
//! A generic thread-safe FIFO ([`MtQueue`]) and the persistent worker
//! pool built on top of it ([`TaskScheduler`]). Both are used across
//! the engine: background work goes through the scheduler, and the
//! render-thread task queue in [`crate::render`] is an `MtQueue` of
//! device closures.

pub mod queue;
pub mod scheduler;

pub use queue::MtQueue;
pub use scheduler::TaskScheduler;
