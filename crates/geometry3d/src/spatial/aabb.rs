//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

use crate::foundation::math::utils::{max_vec, min_vec};
use crate::foundation::math::{RigidTransform, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The inverted box that contains nothing; the identity for [`AABB::union`]
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f64::INFINITY),
            max: Vec3::repeat(f64::NEG_INFINITY),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_to_point(p);
        }
        bounds
    }

    /// True if the box contains nothing
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to include a point
    pub fn expand_to_point(&mut self, point: &Vec3) {
        self.min = min_vec(&self.min, point);
        self.max = max_vec(&self.max, point);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(min_vec(&self.min, &other.min), max_vec(&self.max, &other.max))
    }

    /// Box grown by `margin` on every side; empty boxes stay empty
    pub fn inflated(&self, margin: f64) -> AABB {
        if self.is_empty() {
            return *self;
        }
        let pad = Vec3::repeat(margin);
        AABB::new(self.min - pad, self.max + pad)
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Axis-aligned box around this box after a rigid transform (may be loose)
    pub fn transformed(&self, transform: &RigidTransform) -> AABB {
        if self.is_empty() {
            return *self;
        }
        let corners = self.corners().map(|c| transform.transform_point(&c));
        AABB::from_points(&corners)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Euclidean distance from a point to the box (0 inside)
    pub fn distance_to_point(&self, point: &Vec3) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let clamped = Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        (clamped - point).magnitude()
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the parametric entry distance if the ray intersects, None otherwise.
    /// `ray_dir` need not be normalized; the result is in units of `ray_dir`.
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray_origin: &Vec3, ray_dir: &Vec3) -> Option<f64> {
        let mut tmin = f64::NEG_INFINITY;
        let mut tmax = f64::INFINITY;

        for axis in 0..3 {
            let (o, d) = (ray_origin[axis], ray_dir[axis]);
            if d == 0.0 {
                // Parallel to this slab: must already be inside it
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let t1 = (self.min[axis] - o) * inv;
            let t2 = (self.max[axis] - o) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Return entry point distance (or 0 if we're inside the box)
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat3;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_box_is_union_identity() {
        let b = AABB::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        assert!(AABB::empty().is_empty());
        assert_eq!(AABB::empty().union(&b), b);
        assert!(AABB::empty().inflated(1.0).is_empty());
    }

    #[test]
    fn test_transformed_box_contains_corners() {
        let b = AABB::new(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0));
        let angle = 0.3_f64;
        let rotation = Mat3::new(
            angle.cos(), -angle.sin(), 0.0,
            angle.sin(), angle.cos(), 0.0,
            0.0, 0.0, 1.0,
        );
        let pose = RigidTransform::new(rotation, Vec3::new(5.0, 0.0, 0.0));
        let world = b.transformed(&pose);
        for corner in b.corners() {
            let p = pose.transform_point(&corner);
            assert!(world.inflated(1e-12).contains_point(&p));
        }
    }

    #[test]
    fn test_ray_slab_with_unnormalized_direction() {
        let b = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let t = b.intersect_ray(&Vec3::new(-5.0, 0.0, 0.0), &Vec3::new(2.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(t, 2.0);
        assert!(b.intersect_ray(&Vec3::new(-5.0, 2.0, 0.0), &Vec3::new(1.0, 0.0, 0.0)).is_none());
        assert_eq!(b.intersect_ray(&Vec3::zeros(), &Vec3::new(0.0, 1.0, 0.0)), Some(0.0));
    }

    #[test]
    fn test_distance_to_point() {
        let b = AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(b.distance_to_point(&Vec3::new(4.0, 1.0, 5.0)), 5.0);
        assert_eq!(b.distance_to_point(&Vec3::new(0.5, 0.5, 0.5)), 0.0);
    }
}
