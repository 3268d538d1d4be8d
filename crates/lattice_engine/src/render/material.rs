//! Material description
//!
//! Materials are CPU-side: a shader program reference, an optional
//! texture reference and a tint. They are not device resources and
//! have no readiness state of their own; the resources they reference
//! do.

use crate::render::resources::ResourceId;

/// Identifier distinguishing materials in the render-job tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Surface description binding a shader program, an optional texture
/// and a base color.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: MaterialId,
    program: ResourceId,
    texture: Option<ResourceId>,
    base_color: [f32; 4],
}

impl Material {
    /// Create a material drawing with `program`.
    #[must_use]
    pub fn new(id: MaterialId, program: ResourceId) -> Self {
        Self {
            id,
            program,
            texture: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Set the texture
    #[must_use]
    pub fn with_texture(mut self, texture: ResourceId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Set the base color
    #[must_use]
    pub fn with_color(mut self, r: f32, g: f32, b: f32, a: f32) -> Self {
        self.base_color = [r, g, b, a];
        self
    }

    /// Material identifier
    #[must_use]
    pub const fn id(&self) -> MaterialId {
        self.id
    }

    /// Shader program resource
    #[must_use]
    pub const fn program(&self) -> ResourceId {
        self.program
    }

    /// Texture resource, if any
    #[must_use]
    pub const fn texture(&self) -> Option<ResourceId> {
        self.texture
    }

    /// Base color (RGBA)
    #[must_use]
    pub const fn base_color(&self) -> [f32; 4] {
        self.base_color
    }
}
