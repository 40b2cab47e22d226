//! Convex atoms
//!
//! Every collision representation is broken down into convex atoms (points,
//! segments, triangles, parallelepipeds and ellipsoids) carrying an
//! inflation radius. A sphere is a point atom with its radius as inflation.

use crate::foundation::math::constants::{DEGENERATE_EPSILON, MATRIX_EPSILON};
use crate::foundation::math::{Mat3, RigidTransform, Vec3};
use crate::physics::collision::gjk::{gjk_distance, GjkSettings, SupportMap};
use crate::physics::collision::primitives::{closest_on_segment, Ray, Triangle};
use crate::spatial::AABB;

/// Stopping rules for conservative-advancement ray marching
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchSettings {
    /// Maximum number of advancement steps
    pub max_steps: u32,
    /// Surface distance that counts as a hit
    pub epsilon: f64,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            max_steps: 256,
            epsilon: 1e-9,
        }
    }
}

/// A convex shape with a support mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvexShape {
    /// Single point
    Point(Vec3),
    /// Line segment between two endpoints
    Segment(Vec3, Vec3),
    /// Triangle
    Triangle(Triangle),
    /// Parallelepiped `{center + axes·u : |u_i| <= 1}`
    Box {
        /// Box center
        center: Vec3,
        /// Half-axis columns
        axes: Mat3,
    },
    /// Ellipsoid `{center + axes·u : |u| <= 1}`
    Ellipsoid {
        /// Ellipsoid center
        center: Vec3,
        /// Axis columns
        axes: Mat3,
    },
}

/// A convex shape grown by `radius` in every direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// Core shape
    pub shape: ConvexShape,
    /// Inflation radius
    pub radius: f64,
}

impl Atom {
    /// Atom with no inflation
    pub fn new(shape: ConvexShape) -> Self {
        Self { shape, radius: 0.0 }
    }

    /// Atom grown by `radius`
    pub fn inflated(shape: ConvexShape, radius: f64) -> Self {
        Self { shape, radius }
    }

    /// Axis-aligned bounds including the inflation radius
    pub fn bounds(&self) -> AABB {
        self.shape.bounds().inflated(self.radius)
    }

    /// Bounding sphere including the inflation radius
    pub fn bounding_sphere(&self) -> (Vec3, f64) {
        let (center, radius) = self.shape.bounding_sphere();
        (center, radius + self.radius)
    }
}

impl SupportMap for ConvexShape {
    fn support(&self, direction: &Vec3) -> Vec3 {
        match self {
            ConvexShape::Point(p) => *p,
            ConvexShape::Segment(a, b) => {
                if (b - a).dot(direction) > 0.0 {
                    *b
                } else {
                    *a
                }
            }
            ConvexShape::Triangle(tri) => {
                let mut best = tri.v0;
                for v in [tri.v1, tri.v2] {
                    if v.dot(direction) > best.dot(direction) {
                        best = v;
                    }
                }
                best
            }
            ConvexShape::Box { center, axes } => {
                let local = axes.transpose() * direction;
                center + axes * local.map(f64::signum)
            }
            ConvexShape::Ellipsoid { center, axes } => {
                let local = axes.transpose() * direction;
                match local.try_normalize(0.0) {
                    Some(u) => center + axes * u,
                    None => *center,
                }
            }
        }
    }
}

impl ConvexShape {
    /// Shape after a rigid transform
    pub fn transformed(&self, pose: &RigidTransform) -> ConvexShape {
        let point = |p: &Vec3| pose.transform_point(p);
        match self {
            ConvexShape::Point(p) => ConvexShape::Point(point(p)),
            ConvexShape::Segment(a, b) => ConvexShape::Segment(point(a), point(b)),
            ConvexShape::Triangle(tri) => {
                ConvexShape::Triangle(Triangle::new(point(&tri.v0), point(&tri.v1), point(&tri.v2)))
            }
            ConvexShape::Box { center, axes } => ConvexShape::Box {
                center: point(center),
                axes: pose.rotation * axes,
            },
            ConvexShape::Ellipsoid { center, axes } => ConvexShape::Ellipsoid {
                center: point(center),
                axes: pose.rotation * axes,
            },
        }
    }

    /// Tight axis-aligned bounds
    pub fn bounds(&self) -> AABB {
        match self {
            ConvexShape::Point(p) => AABB::new(*p, *p),
            ConvexShape::Segment(a, b) => AABB::from_points([a, b]),
            ConvexShape::Triangle(tri) => AABB::from_points([&tri.v0, &tri.v1, &tri.v2]),
            ConvexShape::Box { center, axes } => {
                let extents = axes.abs() * Vec3::repeat(1.0);
                AABB::from_center_extents(*center, extents)
            }
            ConvexShape::Ellipsoid { center, axes } => {
                let extents = Vec3::new(axes.row(0).norm(), axes.row(1).norm(), axes.row(2).norm());
                AABB::from_center_extents(*center, extents)
            }
        }
    }

    /// A sphere enclosing the shape
    pub fn bounding_sphere(&self) -> (Vec3, f64) {
        match self {
            ConvexShape::Point(p) => (*p, 0.0),
            ConvexShape::Segment(a, b) => ((a + b) * 0.5, (b - a).norm() * 0.5),
            ConvexShape::Triangle(tri) => {
                let c = tri.centroid();
                let r = [tri.v0, tri.v1, tri.v2]
                    .iter()
                    .map(|v| (v - c).norm())
                    .fold(0.0, f64::max);
                (c, r)
            }
            ConvexShape::Box { center, axes } => {
                let r = [
                    Vec3::new(1.0, 1.0, 1.0),
                    Vec3::new(-1.0, 1.0, 1.0),
                    Vec3::new(1.0, -1.0, 1.0),
                    Vec3::new(1.0, 1.0, -1.0),
                ]
                .iter()
                .map(|s| (axes * s).norm())
                .fold(0.0, f64::max);
                (*center, r)
            }
            ConvexShape::Ellipsoid { center, axes } => (*center, axes.singular_values().max()),
        }
    }

    /// Parameter-space coordinates of `p` for solid shapes
    fn unit_coordinates(center: &Vec3, axes: &Mat3, p: &Vec3) -> Option<Vec3> {
        if axes.determinant().abs() <= MATRIX_EPSILON * axes.norm_squared().powf(1.5) {
            return None;
        }
        axes.try_inverse().map(|inv| inv * (p - center))
    }

    /// True if `p` lies inside a solid shape (box or ellipsoid)
    pub fn contains_point(&self, p: &Vec3) -> bool {
        match self {
            ConvexShape::Box { center, axes } => Self::unit_coordinates(center, axes, p)
                .is_some_and(|u| u.iter().all(|c| c.abs() <= 1.0)),
            ConvexShape::Ellipsoid { center, axes } => {
                Self::unit_coordinates(center, axes, p).is_some_and(|u| u.norm_squared() <= 1.0)
            }
            _ => false,
        }
    }

    /// Closest point of the shape to `p` (`p` itself when inside)
    pub fn closest_point(&self, p: &Vec3, settings: &GjkSettings) -> Vec3 {
        match self {
            ConvexShape::Point(q) => *q,
            ConvexShape::Segment(a, b) => closest_on_segment(a, b, p).0,
            ConvexShape::Triangle(tri) => tri.closest_point(p),
            ConvexShape::Box { .. } | ConvexShape::Ellipsoid { .. } => {
                if self.contains_point(p) {
                    *p
                } else {
                    gjk_distance(self, &ConvexShape::Point(*p), settings).point_a
                }
            }
        }
    }

    /// Parametric distance along `direction` to the first point of the shape
    /// grown by `radius`. A ray starting inside hits at 0.
    pub fn ray_cast(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        radius: f64,
        march: &MarchSettings,
        gjk: &GjkSettings,
    ) -> Option<f64> {
        if radius > 0.0 {
            return match self {
                ConvexShape::Point(p) => sphere_interval(origin, direction, p, radius)
                    .and_then(|(enter, exit)| (exit >= 0.0).then_some(enter.max(0.0))),
                _ => self.march_ray(origin, direction, radius, march, gjk),
            };
        }

        match self {
            ConvexShape::Point(p) => {
                let len_sq = direction.norm_squared();
                let t = if len_sq > DEGENERATE_EPSILON {
                    ((p - origin).dot(direction) / len_sq).max(0.0)
                } else {
                    0.0
                };
                let miss = (origin + direction * t - p).norm();
                (miss <= march.epsilon).then_some(t)
            }
            ConvexShape::Triangle(tri) => tri
                .intersect_ray(&Ray::new(*origin, *direction))
                .map(|(t, _, _)| t),
            ConvexShape::Box { center, axes } => match unit_ray(center, axes, origin, direction) {
                Some((o, d)) => {
                    AABB::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)).intersect_ray(&o, &d)
                }
                None => self.march_ray(origin, direction, 0.0, march, gjk),
            },
            ConvexShape::Ellipsoid { center, axes } => match unit_ray(center, axes, origin, direction) {
                Some((o, d)) => sphere_interval(&o, &d, &Vec3::zeros(), 1.0)
                    .and_then(|(enter, exit)| (exit >= 0.0).then_some(enter.max(0.0))),
                None => self.march_ray(origin, direction, 0.0, march, gjk),
            },
            ConvexShape::Segment(..) => self.march_ray(origin, direction, 0.0, march, gjk),
        }
    }

    /// Conservative advancement: step by the current clearance until the
    /// surface is reached or the ray leaves the bounding sphere
    fn march_ray(
        &self,
        origin: &Vec3,
        direction: &Vec3,
        radius: f64,
        march: &MarchSettings,
        gjk: &GjkSettings,
    ) -> Option<f64> {
        let clearance = |p: &Vec3| (self.closest_point(p, gjk) - p).norm() - radius;

        let speed = direction.norm();
        if speed <= 0.0 {
            return (clearance(origin) <= march.epsilon).then_some(0.0);
        }

        let (center, bound) = self.bounding_sphere();
        let (enter, exit) = sphere_interval(origin, direction, &center, bound + radius + march.epsilon)?;
        if exit < 0.0 {
            return None;
        }

        let mut t = enter.max(0.0);
        for _ in 0..march.max_steps {
            let gap = clearance(&(origin + direction * t));
            if gap <= march.epsilon {
                return Some(t);
            }
            t += gap / speed;
            if t > exit {
                return None;
            }
        }
        None
    }
}

/// Origin and direction in the unit frame of a box or ellipsoid
fn unit_ray(center: &Vec3, axes: &Mat3, origin: &Vec3, direction: &Vec3) -> Option<(Vec3, Vec3)> {
    let o = ConvexShape::unit_coordinates(center, axes, origin)?;
    let inv = axes.try_inverse()?;
    Some((o, inv * direction))
}

/// Parametric interval `[enter, exit]` where the line lies inside a sphere
fn sphere_interval(origin: &Vec3, direction: &Vec3, center: &Vec3, radius: f64) -> Option<(f64, f64)> {
    let offset = origin - center;
    let c = offset.norm_squared() - radius * radius;
    let a = direction.norm_squared();
    if a <= DEGENERATE_EPSILON {
        return (c <= 0.0).then_some((0.0, 0.0));
    }
    let b = offset.dot(direction);
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    Some(((-b - root) / a, (-b + root) / a))
}
