//! Engine façade
//!
//! Wires the managers together from an [`EngineConfig`] and owns the
//! background worker pool. The [`DeviceExecutor`] is returned
//! separately so the caller can hand it to whichever thread owns the
//! graphics context.

use std::sync::Arc;

use crate::config::{Config, ConfigError, EngineConfig};
use crate::ecs::{EntityManager, TransformComponentManager};
use crate::render::device::{DeviceError, RenderDevice};
use crate::render::executor::DeviceExecutor;
use crate::render::jobs::RenderJobManager;
use crate::render::resources::ResourceManager;
use crate::tasks::TaskScheduler;

/// Engine-level errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be loaded or parsed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The device backend reported a failure
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

/// Owns the scene-state managers and the worker pool.
pub struct Engine {
    entities: Arc<EntityManager>,
    transforms: Arc<TransformComponentManager>,
    resources: Arc<ResourceManager>,
    jobs: RenderJobManager,
    scheduler: TaskScheduler,
}

impl Engine {
    /// Build an engine from `config`, wiring resource construction to
    /// `device`. Worker threads start immediately.
    #[must_use]
    pub fn new(config: EngineConfig, device: Box<dyn RenderDevice>) -> (Self, DeviceExecutor) {
        let (resources, executor) = ResourceManager::with_device(device);
        let mut scheduler = TaskScheduler::new();
        scheduler.run(config.worker_threads);

        log::info!(
            "engine up: {} workers, {} instances per draw",
            config.worker_threads,
            config.max_instances_per_draw
        );

        let engine = Self {
            entities: Arc::new(EntityManager::with_reuse_threshold(
                config.entity_reuse_threshold,
            )),
            transforms: Arc::new(TransformComponentManager::new()),
            resources,
            jobs: RenderJobManager::with_max_instances(config.max_instances_per_draw),
            scheduler,
        };
        (engine, executor)
    }

    /// Build an engine from a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_config_file(
        path: &str,
        device: Box<dyn RenderDevice>,
    ) -> Result<(Self, DeviceExecutor), EngineError> {
        let config = EngineConfig::load_from_file(path)?;
        Ok(Self::new(config, device))
    }

    /// Entity manager, shareable across threads.
    #[must_use]
    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.entities
    }

    /// Transform store, shareable across threads.
    #[must_use]
    pub fn transforms(&self) -> &Arc<TransformComponentManager> {
        &self.transforms
    }

    /// Resource manager, shareable across threads.
    #[must_use]
    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// Background worker pool.
    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Render job tree (read side).
    #[must_use]
    pub fn jobs(&self) -> &RenderJobManager {
        &self.jobs
    }

    /// Render job tree (mutation side). Must not race the render
    /// thread's traversal.
    pub fn jobs_mut(&mut self) -> &mut RenderJobManager {
        &mut self.jobs
    }

    /// Stop the worker pool. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
    }
}
