//! Math utilities and types
//!
//! Provides the double-precision vector and matrix types used by every
//! geometry representation, plus the rigid "current pose" transform.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Rigid transform `v' = R·v + t` used as the current pose of a geometry.
///
/// The rotation is expected to be orthonormal; `inverse_*` methods use the
/// transpose of `R` as its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation matrix
    pub rotation: Mat3,

    /// Translation vector
    pub translation: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            rotation: Mat3::identity(),
            translation: Vec3::zeros(),
        }
    }
}

impl RigidTransform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from rotation and translation
    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a transform from a row-major rotation array and a translation array
    pub fn from_row_major(rotation: [f64; 9], translation: [f64; 3]) -> Self {
        Self {
            rotation: Mat3::from_row_slice(&rotation),
            translation: Vec3::from(translation),
        }
    }

    /// Returns the rotation as a row-major array and the translation as an array
    pub fn to_row_major(&self) -> ([f64; 9], [f64; 3]) {
        let r = &self.rotation;
        (
            [
                r[(0, 0)], r[(0, 1)], r[(0, 2)],
                r[(1, 0)], r[(1, 1)], r[(1, 2)],
                r[(2, 0)], r[(2, 1)], r[(2, 2)],
            ],
            [self.translation.x, self.translation.y, self.translation.z],
        )
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Apply only the rotation to a direction vector
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Map a world-space point back into the local frame
    pub fn inverse_transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation.transpose() * (point - self.translation)
    }

    /// Map a world-space direction back into the local frame
    pub fn inverse_transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation.transpose() * vector
    }

    /// Combine this transform with another (`self` applied after `other`)
    pub fn combine(&self, other: &RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> RigidTransform {
        let inv_rotation = self.rotation.transpose();
        RigidTransform {
            rotation: inv_rotation,
            translation: -(inv_rotation * self.translation),
        }
    }

    /// True if this is exactly the identity
    pub fn is_identity(&self) -> bool {
        self.rotation == Mat3::identity() && self.translation == Vec3::zeros()
    }

    /// True if the rotation is orthonormal with positive determinant
    pub fn is_rigid(&self) -> bool {
        let drift = self.rotation.transpose() * self.rotation - Mat3::identity();
        drift.abs().max() <= constants::RIGIDITY_TOLERANCE && self.rotation.determinant() > 0.0
    }
}

/// Math constants
pub mod constants {
    /// Relative tolerance used when classifying matrices
    pub const MATRIX_EPSILON: f64 = 1e-12;

    /// Squared-length threshold below which a direction is treated as zero
    pub const DEGENERATE_EPSILON: f64 = 1e-24;

    /// Largest entry of `R^T R - I` still accepted as a rigid rotation
    pub const RIGIDITY_TOLERANCE: f64 = 1e-9;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat3, Vec3};

    /// Returns the uniform scale factor if `m` is a rotation times a uniform scale
    pub fn similarity_scale(m: &Mat3) -> Option<f64> {
        let mtm = m.transpose() * m;
        let s2 = mtm[(0, 0)];
        let tolerance = constants::MATRIX_EPSILON * s2.abs().max(1.0);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { s2 } else { 0.0 };
                if (mtm[(i, j)] - expected).abs() > tolerance {
                    return None;
                }
            }
        }
        Some(s2.sqrt())
    }

    /// True if all off-diagonal entries of `m` are zero
    pub fn is_diagonal(m: &Mat3) -> bool {
        (0..3).all(|i| (0..3).all(|j| i == j || m[(i, j)] == 0.0))
    }

    /// Component-wise minimum of two vectors
    pub fn min_vec(a: &Vec3, b: &Vec3) -> Vec3 {
        Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
    }

    /// Component-wise maximum of two vectors
    pub fn max_vec(a: &Vec3, b: &Vec3) -> Vec3 {
        Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
    }

    /// Vector from the first three entries of a slice
    pub fn vec3_at(values: &[f64], offset: usize) -> Vec3 {
        Vec3::new(values[offset], values[offset + 1], values[offset + 2])
    }

    /// Matrix from nine row-major entries of a slice
    pub fn mat3_at(values: &[f64], offset: usize) -> Mat3 {
        Mat3::from_row_slice(&values[offset..offset + 9])
    }
}
