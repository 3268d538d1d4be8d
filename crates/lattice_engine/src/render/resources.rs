//! GPU resource registry and asynchronous lifecycle
//!
//! Any thread may request a resource by name; the call allocates a
//! record immediately and defers construction to the render thread.
//! "Allocate now, construct later": no caller ever blocks on device
//! work. Requests are memoized by name, so a second request for an
//! existing name returns the existing id without enqueuing anything —
//! content identity is assumed, never verified.
//!
//! A record's payload is written exactly once, by the render thread,
//! after construction succeeds. Construction failure is logged and the
//! record stays [`ResourceState::Pending`] forever: no retry, no
//! rollback. Consumers must check readiness and skip, never wait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::render::device::{
    BufferDescriptor, DeviceError, DeviceHandle, MeshDescriptor, ProgramDescriptor, RenderDevice,
    TextureDescriptor,
};
use crate::render::executor::DeviceExecutor;
use crate::tasks::MtQueue;

/// A deferred device operation, run by the executor's owning thread.
pub type RenderTask = Box<dyn FnOnce(&mut dyn RenderDevice) + Send + 'static>;

/// Identifier of a registered resource. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// The raw id value.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Readiness of a resource's device payload.
///
/// The transition is monotonic: `Pending` → `Ready`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Construction has been requested but has not completed.
    Pending,
    /// The device payload exists and is safe to use.
    Ready,
}

#[derive(Debug)]
struct ResourceRecord {
    name: String,
    state: ResourceState,
    payload: Option<DeviceHandle>,
}

#[derive(Debug, Default)]
struct Registry {
    by_name: HashMap<String, ResourceId>,
    records: HashMap<ResourceId, ResourceRecord>,
}

type SharedRegistry = Arc<RwLock<Registry>>;

/// Registry of GPU resources with asynchronous creation.
///
/// Four resource categories (buffers, meshes, shader programs,
/// textures), each behind its own reader/writer lock: shared for
/// lookup, exclusive for insertion. Nothing is globally locked.
///
/// The manager holds only the pushing side of the render-task queue;
/// the device itself lives in the [`DeviceExecutor`].
pub struct ResourceManager {
    next_id: AtomicU64,
    buffers: SharedRegistry,
    meshes: SharedRegistry,
    programs: SharedRegistry,
    textures: SharedRegistry,
    tasks: MtQueue<RenderTask>,
}

impl ResourceManager {
    /// Create a manager wired to `device`, returning the executor that
    /// owns the device. Hand the executor to the render thread.
    #[must_use]
    pub fn with_device(device: Box<dyn RenderDevice>) -> (Arc<Self>, DeviceExecutor) {
        let tasks: MtQueue<RenderTask> = MtQueue::new();
        let manager = Arc::new(Self {
            next_id: AtomicU64::new(1),
            buffers: SharedRegistry::default(),
            meshes: SharedRegistry::default(),
            programs: SharedRegistry::default(),
            textures: SharedRegistry::default(),
            tasks: tasks.clone(),
        });
        (manager, DeviceExecutor::new(device, tasks))
    }

    /// Request a raw buffer. Returns immediately; construction happens
    /// when the render thread drains its queue.
    pub fn create_buffer(&self, name: &str, desc: BufferDescriptor) -> ResourceId {
        self.create_in(&self.buffers, name, desc, |device, desc| {
            device.create_buffer(&desc)
        })
    }

    /// Request a mesh.
    pub fn create_mesh(&self, name: &str, desc: MeshDescriptor) -> ResourceId {
        self.create_in(&self.meshes, name, desc, |device, desc| {
            device.create_mesh(&desc)
        })
    }

    /// Request a shader program.
    pub fn create_program(&self, name: &str, desc: ProgramDescriptor) -> ResourceId {
        self.create_in(&self.programs, name, desc, |device, desc| {
            device.create_program(&desc)
        })
    }

    /// Request a texture.
    pub fn create_texture(&self, name: &str, desc: TextureDescriptor) -> ResourceId {
        self.create_in(&self.textures, name, desc, |device, desc| {
            device.create_texture(&desc)
        })
    }

    fn create_in<D, F>(
        &self,
        registry: &SharedRegistry,
        name: &str,
        desc: D,
        construct: F,
    ) -> ResourceId
    where
        D: Send + 'static,
        F: FnOnce(&mut dyn RenderDevice, D) -> Result<DeviceHandle, DeviceError> + Send + 'static,
    {
        // Fast path: shared lock for the memoized lookup.
        if let Some(&id) = registry.read().unwrap().by_name.get(name) {
            log::trace!("resource '{name}' already registered as {id:?}");
            return id;
        }

        let id = {
            let mut reg = registry.write().unwrap();
            // A racing creator may have won between the two locks; the
            // record insertion below is what guarantees exactly one
            // construction task per name.
            if let Some(&id) = reg.by_name.get(name) {
                return id;
            }
            let id = ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
            reg.by_name.insert(name.to_owned(), id);
            reg.records.insert(
                id,
                ResourceRecord {
                    name: name.to_owned(),
                    state: ResourceState::Pending,
                    payload: None,
                },
            );
            id
        };

        let registry = Arc::clone(registry);
        let task_name = name.to_owned();
        self.tasks.push(Box::new(move |device| {
            match construct(device, desc) {
                Ok(handle) => {
                    let mut reg = registry.write().unwrap();
                    if let Some(record) = reg.records.get_mut(&id) {
                        record.payload = Some(handle);
                        record.state = ResourceState::Ready;
                        log::debug!("resource '{task_name}' ready as {handle:?}");
                    } else {
                        // Registry was cleared while this was in flight.
                        device.destroy(handle);
                        log::debug!("resource '{task_name}' constructed after clear, released");
                    }
                }
                // The record stays Pending forever; a stalled resource
                // shows up as missing geometry or shading, nothing more.
                Err(err) => log::error!("construction of '{task_name}' failed: {err}"),
            }
        }));

        log::trace!("resource '{name}' registered as {id:?}, construction queued");
        id
    }

    fn registries(&self) -> [&SharedRegistry; 4] {
        [&self.buffers, &self.meshes, &self.programs, &self.textures]
    }

    /// Readiness state of `id`, or `None` for an unknown id.
    #[must_use]
    pub fn state(&self, id: ResourceId) -> Option<ResourceState> {
        self.registries()
            .iter()
            .find_map(|reg| reg.read().unwrap().records.get(&id).map(|r| r.state))
    }

    /// Device payload of `id`, available only once the resource is
    /// [`ResourceState::Ready`].
    #[must_use]
    pub fn payload(&self, id: ResourceId) -> Option<DeviceHandle> {
        self.registries()
            .iter()
            .find_map(|reg| reg.read().unwrap().records.get(&id).and_then(|r| r.payload))
    }

    /// `true` once `id`'s payload has been constructed.
    #[must_use]
    pub fn is_ready(&self, id: ResourceId) -> bool {
        self.state(id) == Some(ResourceState::Ready)
    }

    /// Id of the buffer registered under `name`, if any.
    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<ResourceId> {
        self.buffers.read().unwrap().by_name.get(name).copied()
    }

    /// Id of the mesh registered under `name`, if any.
    #[must_use]
    pub fn mesh(&self, name: &str) -> Option<ResourceId> {
        self.meshes.read().unwrap().by_name.get(name).copied()
    }

    /// Id of the shader program registered under `name`, if any.
    #[must_use]
    pub fn program(&self, name: &str) -> Option<ResourceId> {
        self.programs.read().unwrap().by_name.get(name).copied()
    }

    /// Id of the texture registered under `name`, if any.
    #[must_use]
    pub fn texture(&self, name: &str) -> Option<ResourceId> {
        self.textures.read().unwrap().by_name.get(name).copied()
    }

    /// Number of records still waiting for construction.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.registries()
            .iter()
            .map(|reg| {
                reg.read()
                    .unwrap()
                    .records
                    .values()
                    .filter(|r| r.state == ResourceState::Pending)
                    .count()
            })
            .sum()
    }

    /// Release every registry.
    ///
    /// Device handles of ready resources are queued for destruction on
    /// the render thread; ids handed out earlier become unknown.
    pub fn clear_all_resources(&self) {
        let mut handles = Vec::new();
        for registry in self.registries() {
            let mut reg = registry.write().unwrap();
            handles.extend(reg.records.values().filter_map(|r| r.payload));
            reg.by_name.clear();
            reg.records.clear();
        }
        if handles.is_empty() {
            return;
        }
        log::info!("clearing {} constructed resources", handles.len());
        self.tasks.push(Box::new(move |device| {
            for handle in handles {
                device.destroy(handle);
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::TextureFormat;
    use crate::render::headless::HeadlessDevice;

    fn texture_desc() -> TextureDescriptor {
        TextureDescriptor {
            width: 2,
            height: 2,
            format: TextureFormat::Rgba8,
            pixels: vec![0; 16],
        }
    }

    #[test]
    fn same_name_returns_same_id_and_enqueues_once() {
        let device = HeadlessDevice::new();
        let stats = device.stats();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        let a = resources.create_texture("brick.tex", texture_desc());
        let b = resources.create_texture("brick.tex", texture_desc());
        assert_eq!(a, b);

        executor.drain();
        assert_eq!(stats.textures_created(), 1);
    }

    #[test]
    fn state_is_pending_until_drained_then_ready_forever() {
        let device = HeadlessDevice::new();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        let id = resources.create_program("basic", ProgramDescriptor::new("vs", "fs"));
        assert_eq!(resources.state(id), Some(ResourceState::Pending));
        assert_eq!(resources.payload(id), None);

        executor.drain();
        assert_eq!(resources.state(id), Some(ResourceState::Ready));
        assert!(resources.payload(id).is_some());

        // Further drains leave it Ready.
        executor.drain();
        assert_eq!(resources.state(id), Some(ResourceState::Ready));
    }

    #[test]
    fn ids_are_monotonic_across_categories() {
        let device = HeadlessDevice::new();
        let (resources, _executor) = ResourceManager::with_device(Box::new(device));

        let a = resources.create_program("p", ProgramDescriptor::new("vs", "fs"));
        let b = resources.create_texture("t", texture_desc());
        let c = resources.create_mesh(
            "m",
            MeshDescriptor {
                vertex_data: vec![0; 12],
                vertex_stride: 12,
                indices: vec![0, 1, 2],
            },
        );
        assert!(a < b && b < c);
    }

    #[test]
    fn failed_construction_leaves_record_pending() {
        let device = HeadlessDevice::with_program_rejection("#broken");
        let stats = device.stats();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        let id = resources.create_program("bad", ProgramDescriptor::new("#broken", "fs"));
        executor.drain();

        assert_eq!(resources.state(id), Some(ResourceState::Pending));
        assert_eq!(resources.payload(id), None);
        assert_eq!(stats.programs_created(), 0);
        assert_eq!(resources.pending_count(), 1);
    }

    #[test]
    fn name_lookup_finds_registered_resources() {
        let device = HeadlessDevice::new();
        let (resources, _executor) = ResourceManager::with_device(Box::new(device));

        let id = resources.create_texture("brick.tex", texture_desc());
        assert_eq!(resources.texture("brick.tex"), Some(id));
        assert_eq!(resources.texture("unknown.tex"), None);
        assert_eq!(resources.buffer("brick.tex"), None);
    }

    #[test]
    fn clear_releases_constructed_payloads() {
        let device = HeadlessDevice::new();
        let stats = device.stats();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        let id = resources.create_texture("brick.tex", texture_desc());
        executor.drain();
        assert!(resources.is_ready(id));

        resources.clear_all_resources();
        executor.drain();

        assert_eq!(resources.state(id), None);
        assert_eq!(stats.destroyed(), 1);

        // The name can be registered again under a fresh id.
        let id2 = resources.create_texture("brick.tex", texture_desc());
        assert_ne!(id, id2);
    }

    #[test]
    fn construction_completing_after_clear_releases_the_handle() {
        let device = HeadlessDevice::new();
        let stats = device.stats();
        let (resources, mut executor) = ResourceManager::with_device(Box::new(device));

        let _id = resources.create_texture("brick.tex", texture_desc());
        // Clear before the render thread ever drained the queue.
        resources.clear_all_resources();
        executor.drain();

        assert_eq!(stats.textures_created(), 1);
        assert_eq!(stats.destroyed(), 1);
    }
}
