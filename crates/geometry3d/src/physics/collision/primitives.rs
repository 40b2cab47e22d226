//! Primitive collision shapes and intersection algorithms
//!
//! Provides rays and triangles with exact intersection and closest-point
//! routines used by the convex atoms.

use crate::foundation::math::constants::DEGENERATE_EPSILON;
use crate::foundation::math::Vec3;

/// A ray for ray casting
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (not normalized; distances are measured in its units)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get a point along the ray at parameter t
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2)
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) with t in units of the ray direction if hit, None otherwise
    ///
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f64, f64, f64)> {
        // Calculate edges from v0
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        // Calculate determinant
        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle? Scale-aware threshold
        let scale = ray.direction.magnitude() * edge1.magnitude() * edge2.magnitude();
        if a.abs() <= 1e-12 * scale || scale == 0.0 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);

        // Hit outside triangle on u axis?
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);

        // Hit outside triangle on v axis?
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        // Calculate t (distance along ray)
        let t = f * edge2.dot(&q);

        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None // Behind ray origin
        }
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: &Vec3) -> Vec3 {
        self.closest_point_barycentric(point).0
    }

    /// Closest point on the triangle to `point` and its barycentric weights
    /// for `(v0, v1, v2)`. Degenerate triangles fall back to their edges.
    pub fn closest_point_barycentric(&self, point: &Vec3) -> (Vec3, [f64; 3]) {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);

        // Vertex region outside v0
        if d1 <= 0.0 && d2 <= 0.0 {
            return (self.v0, [1.0, 0.0, 0.0]);
        }

        // Vertex region outside v1
        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return (self.v1, [0.0, 1.0, 0.0]);
        }

        // Edge region v0-v1
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return (self.v0 + edge1 * v, [1.0 - v, v, 0.0]);
        }

        // Vertex region outside v2
        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return (self.v2, [0.0, 0.0, 1.0]);
        }

        // Edge region v0-v2
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return (self.v0 + edge2 * w, [1.0 - w, 0.0, w]);
        }

        // Edge region v1-v2
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return (self.v1 + (self.v2 - self.v1) * w, [0.0, 1.0 - w, w]);
        }

        let sum = va + vb + vc;
        if sum.abs() <= DEGENERATE_EPSILON * (edge1.norm_squared() * edge2.norm_squared()).max(DEGENERATE_EPSILON) {
            return self.closest_on_edges(point);
        }

        // Point projects inside the triangle
        let denom = 1.0 / sum;
        let v = vb * denom;
        let w = vc * denom;
        (self.v0 + edge1 * v + edge2 * w, [1.0 - v - w, v, w])
    }

    /// Closest point over the three edges (used for degenerate triangles)
    fn closest_on_edges(&self, point: &Vec3) -> (Vec3, [f64; 3]) {
        let candidates = [
            (closest_on_segment(&self.v0, &self.v1, point), [0usize, 1]),
            (closest_on_segment(&self.v1, &self.v2, point), [1, 2]),
            (closest_on_segment(&self.v0, &self.v2, point), [0, 2]),
        ];
        let mut best = (self.v0, [1.0, 0.0, 0.0]);
        let mut best_dist = f64::INFINITY;
        for ((p, t), [i, j]) in candidates {
            let dist = (p - point).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                let mut weights = [0.0; 3];
                weights[i] = 1.0 - t;
                weights[j] = t;
                best = (p, weights);
            }
        }
        best
    }

    /// Test if this triangle intersects another triangle
    /// Uses the Separating Axis Theorem (SAT)
    /// Tests 11 potential separating axes:
    /// - 2 face normals (one per triangle)
    /// - 9 edge-edge cross products
    pub fn intersects_triangle(&self, other: &Triangle) -> bool {
        // Helper to project a triangle onto an axis and get min/max
        fn project_triangle(tri: &Triangle, axis: &Vec3) -> (f64, f64) {
            let p0 = axis.dot(&tri.v0);
            let p1 = axis.dot(&tri.v1);
            let p2 = axis.dot(&tri.v2);
            (p0.min(p1).min(p2), p0.max(p1).max(p2))
        }

        // Test axis (returns false if it's a separating axis)
        fn test_axis(tri1: &Triangle, tri2: &Triangle, axis: Vec3) -> bool {
            let axis_len_sq = axis.magnitude_squared();
            if axis_len_sq < DEGENERATE_EPSILON {
                return true; // Degenerate axis, skip
            }

            let normalized_axis = axis / axis_len_sq.sqrt();
            let (min1, max1) = project_triangle(tri1, &normalized_axis);
            let (min2, max2) = project_triangle(tri2, &normalized_axis);

            max1 >= min2 && max2 >= min1
        }

        let edges1 = [self.v1 - self.v0, self.v2 - self.v1, self.v0 - self.v2];
        let edges2 = [other.v1 - other.v0, other.v2 - other.v1, other.v0 - other.v2];

        // Face normals
        if !test_axis(self, other, self.normal()) || !test_axis(self, other, other.normal()) {
            return false;
        }

        // All 9 edge-edge cross products
        for edge1 in &edges1 {
            for edge2 in &edges2 {
                if !test_axis(self, other, edge1.cross(edge2)) {
                    return false;
                }
            }
        }

        // Coplanar triangles also need the in-plane edge normals
        let n = self.normal();
        if n.cross(&other.normal()).magnitude_squared() < DEGENERATE_EPSILON {
            for edge in edges1.iter().chain(edges2.iter()) {
                if !test_axis(self, other, n.cross(edge)) {
                    return false;
                }
            }
        }

        // No separating axis found = triangles intersect
        true
    }
}

/// Closest point on segment `[a, b]` to `point`, with its parameter in `[0, 1]`
pub fn closest_on_segment(a: &Vec3, b: &Vec3, point: &Vec3) -> (Vec3, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= DEGENERATE_EPSILON {
        return (*a, 0.0);
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> Triangle {
        Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
    }

    #[test]
    fn test_ray_hits_triangle_with_unnormalized_direction() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 2.0));
        let (t, u, v) = unit_triangle().intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(ray.point_at(t), Vec3::new(0.25, 0.25, 0.0));
        assert_relative_eq!(u, 0.25);
        assert_relative_eq!(v, 0.25);
    }

    #[test]
    fn test_ray_misses_triangle() {
        let tri = unit_triangle();
        assert!(tri.intersect_ray(&Ray::new(Vec3::new(2.0, 2.0, -1.0), Vec3::z())).is_none());
        assert!(tri.intersect_ray(&Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::z())).is_none());
        assert!(tri.intersect_ray(&Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::x())).is_none());
    }

    #[test]
    fn test_closest_point_regions() {
        let tri = unit_triangle();
        let (p, w) = tri.closest_point_barycentric(&Vec3::new(0.2, 0.3, 5.0));
        assert_relative_eq!(p, Vec3::new(0.2, 0.3, 0.0), epsilon = 1e-12);
        assert_relative_eq!(w[0] + w[1] + w[2], 1.0, epsilon = 1e-12);

        assert_eq!(tri.closest_point(&Vec3::new(-1.0, -1.0, 0.0)), Vec3::zeros());
        assert_relative_eq!(tri.closest_point(&Vec3::new(1.0, 1.0, 0.0)), Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_uses_edges() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let (p, w) = tri.closest_point_barycentric(&Vec3::new(1.5, 1.0, 0.0));
        assert_relative_eq!(p, Vec3::new(1.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(w[0] + w[1] + w[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_triangle_sat() {
        let a = unit_triangle();
        let crossing = Triangle::new(
            Vec3::new(0.2, 0.2, -1.0),
            Vec3::new(0.2, 0.2, 1.0),
            Vec3::new(0.3, 0.1, 0.0),
        );
        let lifted = Triangle::new(
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(1.0, 0.0, 0.5),
            Vec3::new(0.0, 1.0, 0.5),
        );
        let coplanar_apart = Triangle::new(
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
            Vec3::new(2.0, 3.0, 0.0),
        );
        assert!(a.intersects_triangle(&crossing));
        assert!(!a.intersects_triangle(&lifted));
        assert!(!a.intersects_triangle(&coplanar_apart));
    }
}
