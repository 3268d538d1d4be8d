//! Headless device backend
//!
//! A [`RenderDevice`] that constructs nothing: it mints handles, counts
//! what it was asked to do, and records submitted draw calls. Used by
//! the test suite and the demo app; it is the only backend in-tree.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::render::device::{
    BufferDescriptor, DeviceError, DeviceHandle, DrawCall, MeshDescriptor, ProgramDescriptor,
    RenderDevice, TextureDescriptor,
};

#[derive(Debug, Default)]
struct StatsInner {
    buffers: AtomicUsize,
    meshes: AtomicUsize,
    programs: AtomicUsize,
    textures: AtomicUsize,
    destroyed: AtomicUsize,
    draws: Mutex<Vec<DrawCall>>,
}

/// Shared view of what a [`HeadlessDevice`] has done.
///
/// Clone this before boxing the device; the executor owns the device
/// afterwards, so this handle is the only way to observe it.
#[derive(Debug, Clone, Default)]
pub struct DeviceStats {
    inner: Arc<StatsInner>,
}

impl DeviceStats {
    /// Buffers constructed so far.
    #[must_use]
    pub fn buffers_created(&self) -> usize {
        self.inner.buffers.load(Ordering::Acquire)
    }

    /// Meshes constructed so far.
    #[must_use]
    pub fn meshes_created(&self) -> usize {
        self.inner.meshes.load(Ordering::Acquire)
    }

    /// Programs successfully compiled so far.
    #[must_use]
    pub fn programs_created(&self) -> usize {
        self.inner.programs.load(Ordering::Acquire)
    }

    /// Textures constructed so far.
    #[must_use]
    pub fn textures_created(&self) -> usize {
        self.inner.textures.load(Ordering::Acquire)
    }

    /// Total constructions across all categories.
    #[must_use]
    pub fn creations(&self) -> usize {
        self.buffers_created()
            + self.meshes_created()
            + self.programs_created()
            + self.textures_created()
    }

    /// Handles released via `destroy`.
    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Snapshot of every draw call submitted so far.
    #[must_use]
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.inner.draws.lock().unwrap().clone()
    }
}

/// Counting, recording device backend with no GPU behind it.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u64,
    reject_marker: Option<String>,
    stats: DeviceStats,
}

impl HeadlessDevice {
    /// Create a headless device that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any program whose source contains `marker`, to exercise
    /// construction-failure paths.
    #[must_use]
    pub fn with_program_rejection(marker: impl Into<String>) -> Self {
        Self {
            reject_marker: Some(marker.into()),
            ..Self::default()
        }
    }

    /// Shared stats handle; clone before boxing the device.
    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        self.stats.clone()
    }

    fn mint(&mut self) -> DeviceHandle {
        self.next_handle += 1;
        DeviceHandle::new(self.next_handle)
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<DeviceHandle, DeviceError> {
        if desc.stride == 0 {
            return Err(DeviceError::InvalidDescriptor(
                "buffer stride must be non-zero".to_owned(),
            ));
        }
        self.stats.inner.buffers.fetch_add(1, Ordering::AcqRel);
        Ok(self.mint())
    }

    fn create_mesh(&mut self, desc: &MeshDescriptor) -> Result<DeviceHandle, DeviceError> {
        if desc.vertex_stride == 0 {
            return Err(DeviceError::InvalidDescriptor(
                "vertex stride must be non-zero".to_owned(),
            ));
        }
        self.stats.inner.meshes.fetch_add(1, Ordering::AcqRel);
        Ok(self.mint())
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> Result<DeviceHandle, DeviceError> {
        if let Some(marker) = &self.reject_marker {
            if desc.vertex_source.contains(marker.as_str())
                || desc.fragment_source.contains(marker.as_str())
            {
                return Err(DeviceError::ShaderCompile(format!(
                    "source contains '{marker}'"
                )));
            }
        }
        self.stats.inner.programs.fetch_add(1, Ordering::AcqRel);
        Ok(self.mint())
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle, DeviceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::InvalidDescriptor(
                "texture dimensions must be non-zero".to_owned(),
            ));
        }
        self.stats.inner.textures.fetch_add(1, Ordering::AcqRel);
        Ok(self.mint())
    }

    fn submit(&mut self, call: &DrawCall) -> Result<(), DeviceError> {
        self.stats.inner.draws.lock().unwrap().push(call.clone());
        Ok(())
    }

    fn destroy(&mut self, _handle: DeviceHandle) {
        self.stats.inner.destroyed.fetch_add(1, Ordering::AcqRel);
    }
}
