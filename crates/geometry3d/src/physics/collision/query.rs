//! Proximity queries between placed collision representations
//!
//! A [`PlacedShape`] is cached local-frame data plus the world pose and
//! collision margin it is queried with. All results are world-space.

use log::trace;

use crate::core::GeometryConfig;
use crate::foundation::math::{RigidTransform, Vec3};
use crate::physics::collision::collision_data::CollisionData;
use crate::physics::collision::convex::{Atom, ConvexShape, MarchSettings};
use crate::physics::collision::gjk::{gjk_distance, GjkSettings};
use crate::spatial::AABB;

/// Numeric controls for one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySettings {
    /// Convex distance controls
    pub gjk: GjkSettings,
    /// Inflated ray-cast controls
    pub march: MarchSettings,
}

impl QuerySettings {
    /// Settings taken from a geometry configuration
    pub fn from_config(config: &GeometryConfig) -> Self {
        Self {
            gjk: GjkSettings {
                max_iterations: config.gjk_max_iterations,
                ..GjkSettings::default()
            },
            march: MarchSettings {
                max_steps: config.ray_march_max_steps,
                epsilon: config.ray_epsilon,
            },
        }
    }

    /// Same settings with distance error tolerances
    pub fn with_tolerances(mut self, rel_err: f64, abs_err: f64) -> Self {
        self.gjk.rel_err = rel_err.max(0.0);
        self.gjk.abs_err = abs_err.max(0.0);
        self
    }
}

/// Collision data placed in the world
#[derive(Debug, Clone, Copy)]
pub struct PlacedShape<'a> {
    /// Local-frame data
    pub data: &'a CollisionData,
    /// Local-to-world transform
    pub pose: RigidTransform,
    /// Collision margin
    pub margin: f64,
}

impl<'a> PlacedShape<'a> {
    /// Place `data` with the given pose and margin
    pub fn new(data: &'a CollisionData, pose: RigidTransform, margin: f64) -> Self {
        Self { data, pose, margin }
    }

    /// Loose world bounds of the bare shape
    pub fn world_bounds(&self) -> AABB {
        self.data.bounds.transformed(&self.pose)
    }

    /// Tight world bounds of the bare shape
    pub fn tight_bounds(&self) -> AABB {
        self.data.atoms.iter().fold(AABB::empty(), |acc, atom| {
            acc.union(&atom.shape.transformed(&self.pose).bounds().inflated(atom.radius))
        })
    }
}

/// Smallest gap between the margin-inflated shapes, or infinity if
/// either is empty.
///
/// Only values at or below `cutoff` are exact; larger gaps may come back as
/// infinity. The search stops early once a gap at or below `stop_at` is
/// found. Overlapping shapes give negative gaps.
pub fn separation(a: &PlacedShape<'_>, b: &PlacedShape<'_>, cutoff: f64, stop_at: f64, settings: &QuerySettings) -> f64 {
    if a.data.is_empty() || b.data.is_empty() {
        return f64::INFINITY;
    }
    let inflate = a.margin + b.margin;
    if box_gap(&a.world_bounds(), &b.world_bounds()) - inflate > cutoff {
        return f64::INFINITY;
    }

    // Walk the smaller decomposition and search the other one
    let (outer, inner) = if a.data.atoms.len() <= b.data.atoms.len() { (a, b) } else { (b, a) };
    let to_inner = inner.pose.inverse().combine(&outer.pose);
    let contact_only = cutoff <= 0.0 && stop_at >= cutoff;
    trace!(
        "separation: {} x {} atoms, cutoff {cutoff}",
        outer.data.atoms.len(),
        inner.data.atoms.len()
    );

    let mut best = f64::INFINITY;
    for atom in &outer.data.atoms {
        let moved = Atom::inflated(atom.shape.transformed(&to_inner), atom.radius);
        let (center, radius) = moved.bounding_sphere();
        let found = nearest_atom(inner.data, &center, radius + inflate, best.min(cutoff), stop_at, |_, other| {
            atom_gap(&moved, other, inflate, contact_only, &settings.gjk)
        });
        best = best.min(found);
        if best <= stop_at {
            break;
        }
    }
    best
}

/// Nearest point of the margin-inflated shape to `point`, with its distance.
/// A point already inside is returned unchanged at distance 0.
pub fn closest_point(shape: &PlacedShape<'_>, point: &Vec3, settings: &QuerySettings) -> Option<(f64, Vec3)> {
    if shape.data.is_empty() {
        return None;
    }
    let local = shape.pose.inverse_transform_point(point);

    let mut best: Option<(f64, usize, Vec3)> = None;
    nearest_atom(shape.data, &local, shape.margin, f64::INFINITY, 0.0, |index, atom| {
        let near = atom.shape.closest_point(&local, &settings.gjk);
        let gap = (near - local).norm() - atom.radius - shape.margin;
        let better = match best {
            Some((g, i, _)) => gap < g || (gap == g && index < i),
            None => true,
        };
        if better {
            best = Some((gap, index, near));
        }
        gap
    });

    let (gap, index, near) = best?;
    if gap <= 0.0 {
        return Some((0.0, *point));
    }
    let reach = shape.data.atoms[index].radius + shape.margin;
    let surface = match (local - near).try_normalize(0.0) {
        Some(direction) => near + direction * reach,
        None => near,
    };
    Some((gap, shape.pose.transform_point(&surface)))
}

/// Parametric distance along `direction` to the first hit on the
/// margin-inflated shape. Equal distances resolve to the lowest atom index.
pub fn ray_cast(shape: &PlacedShape<'_>, origin: &Vec3, direction: &Vec3, settings: &QuerySettings) -> Option<f64> {
    if shape.data.is_empty() {
        return None;
    }
    let local_origin = shape.pose.inverse_transform_point(origin);
    let local_direction = shape.pose.inverse_transform_vector(direction);

    let candidates: Vec<usize> = match &shape.data.octree {
        Some(tree) => tree.query_ray(&local_origin, &local_direction, shape.margin),
        None => (0..shape.data.atoms.len()).collect(),
    };
    trace!("ray_cast: {} candidate atoms", candidates.len());

    let mut best: Option<f64> = None;
    for index in candidates {
        let atom = &shape.data.atoms[index];
        let hit = atom.shape.ray_cast(
            &local_origin,
            &local_direction,
            atom.radius + shape.margin,
            &settings.march,
            &settings.gjk,
        );
        if let Some(t) = hit {
            if best.map_or(true, |b| t < b) {
                best = Some(t);
            }
        }
    }
    best
}

/// Minimum of `exact` over atoms whose bounding spheres come within
/// `cutoff` of the query sphere
fn nearest_atom<F>(data: &CollisionData, center: &Vec3, radius: f64, cutoff: f64, stop_at: f64, mut exact: F) -> f64
where
    F: FnMut(usize, &Atom) -> f64,
{
    if let Some(tree) = &data.octree {
        return tree.nearest_within(center, radius, cutoff, stop_at, |item| {
            exact(item.index, &data.atoms[item.index])
        });
    }

    let mut found = f64::INFINITY;
    for (index, atom) in data.atoms.iter().enumerate() {
        let (c, r) = atom.bounding_sphere();
        if (c - center).norm() - r - radius > found.min(cutoff) {
            continue;
        }
        found = found.min(exact(index, atom));
        if found <= stop_at {
            break;
        }
    }
    found
}

/// Gap between two inflated atoms in the same frame
fn atom_gap(a: &Atom, b: &Atom, inflate: f64, contact_only: bool, settings: &GjkSettings) -> f64 {
    let padding = a.radius + b.radius + inflate;
    if contact_only && padding == 0.0 {
        if let (ConvexShape::Triangle(ta), ConvexShape::Triangle(tb)) = (&a.shape, &b.shape) {
            return if ta.intersects_triangle(tb) { 0.0 } else { f64::INFINITY };
        }
    }
    gjk_distance(&a.shape, &b.shape, settings).distance - padding
}

/// Distance between two boxes (0 when they overlap)
fn box_gap(a: &AABB, b: &AABB) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    let gap = (a.min - b.max).sup(&(b.min - a.max)).sup(&Vec3::zeros());
    gap.norm()
}
