//! Device boundary
//!
//! The engine core never talks to a graphics API directly. Device
//! object construction and draw submission are expressed through the
//! [`RenderDevice`] trait; a concrete backend (Vulkan, GL, the in-tree
//! headless device) lives behind it. Descriptors are plain data: byte
//! payloads plus the layout information a backend needs.

use crate::foundation::math::Mat4;
use thiserror::Error;

/// Opaque handle to an object that lives on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    /// Wrap a backend-assigned raw handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-assigned raw value.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Errors reported by a device backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Shader source was rejected by the backend compiler.
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// The backend could not allocate device memory.
    #[error("device allocation failed: {0}")]
    Allocation(String),

    /// A descriptor field combination the backend cannot express.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A handle that the backend does not recognize.
    #[error("unknown device handle {0:?}")]
    UnknownHandle(DeviceHandle),
}

/// Intended use of a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Per-vertex attribute data.
    Vertex,
    /// Index data.
    Index,
    /// Shader-visible constant data.
    Uniform,
}

/// Raw device buffer construction request.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// How the buffer will be bound.
    pub usage: BufferUsage,
    /// Raw contents.
    pub data: Vec<u8>,
    /// Size of one element in bytes.
    pub stride: usize,
}

/// Mesh construction request: interleaved vertices plus indices.
#[derive(Debug, Clone)]
pub struct MeshDescriptor {
    /// Interleaved vertex bytes.
    pub vertex_data: Vec<u8>,
    /// Size of one vertex in bytes.
    pub vertex_stride: usize,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

/// Shader program construction request.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    /// Vertex stage source.
    pub vertex_source: String,
    /// Fragment stage source.
    pub fragment_source: String,
}

impl ProgramDescriptor {
    /// Build a descriptor from the two stage sources.
    #[must_use]
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
        }
    }
}

/// Pixel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear.
    Rgba8,
    /// 8-bit RGBA, sRGB-encoded.
    Rgba8Srgb,
    /// Single 8-bit channel.
    R8,
}

/// Texture construction request.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Pixel layout of `pixels`.
    pub format: TextureFormat,
    /// Raw texel bytes, tightly packed rows.
    pub pixels: Vec<u8>,
}

/// One instanced draw: a mesh rendered with a program (and optional
/// texture) once per instance transform.
#[derive(Debug, Clone)]
pub struct DrawCall {
    /// Shader program to bind.
    pub program: DeviceHandle,
    /// Mesh to draw.
    pub mesh: DeviceHandle,
    /// Texture to bind, if the material has one.
    pub texture: Option<DeviceHandle>,
    /// World matrix per instance.
    pub instance_transforms: Vec<Mat4>,
}

impl DrawCall {
    /// Number of instances in this call.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instance_transforms.len()
    }
}

/// Construction and submission primitives of a graphics backend.
///
/// Implementations are not required to be thread-safe: the engine
/// confines every call to the single thread driving the
/// [`DeviceExecutor`](crate::render::executor::DeviceExecutor). `Send`
/// is required only so the executor can be handed to that thread.
pub trait RenderDevice: Send {
    /// Construct a raw buffer on the device.
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<DeviceHandle, DeviceError>;

    /// Construct vertex/index buffers for a mesh on the device.
    fn create_mesh(&mut self, desc: &MeshDescriptor) -> Result<DeviceHandle, DeviceError>;

    /// Compile and link a shader program on the device.
    fn create_program(&mut self, desc: &ProgramDescriptor) -> Result<DeviceHandle, DeviceError>;

    /// Upload a texture to the device.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle, DeviceError>;

    /// Submit one instanced draw call.
    fn submit(&mut self, call: &DrawCall) -> Result<(), DeviceError>;

    /// Release a device object. Unknown handles are ignored.
    fn destroy(&mut self, handle: DeviceHandle);
}
