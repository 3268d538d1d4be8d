//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, backed by nalgebra.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Compose a local transformation matrix in T·R·S order.
///
/// This is the canonical local matrix used by the transform hierarchy:
/// scale first, then rotate, then translate.
#[must_use]
pub fn trs_matrix(position: &Vec3, orientation: &Quat, scale: &Vec3) -> Mat4 {
    Mat4::new_translation(position)
        * orientation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(scale)
}

/// Extract the translation column of a 4x4 transformation matrix.
#[must_use]
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}
