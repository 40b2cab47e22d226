//! Group-aware reductions over the leaf proximity queries
//!
//! Groups are flattened into leaves (primitive, mesh or point cloud) with
//! accumulated world pose `group_pose ∘ member_pose` and accumulated margin
//! `group_margin + member_margin`. Boolean queries OR over leaf pairs with
//! early exit, distances and closest points take the minimum and ray casts
//! take the minimum parametric distance.

use std::ops::ControlFlow;

use log::trace;

use crate::foundation::math::{RigidTransform, Vec3};
use crate::geometry::data::GeometryData;
use crate::geometry::variant::ShapeVariant;
use crate::physics::collision::query::{self, PlacedShape, QuerySettings};
use crate::spatial::AABB;

type Visitor<'v> = dyn FnMut(&PlacedShape<'_>) -> ControlFlow<()> + 'v;

/// Call `visit` on every leaf below `data`, in member order
fn visit_leaves(data: &GeometryData, parent: &RigidTransform, parent_margin: f64, visit: &mut Visitor<'_>) -> ControlFlow<()> {
    let pose = parent.combine(&data.pose);
    let margin = parent_margin + data.margin;
    match &data.shape {
        None => ControlFlow::Continue(()),
        Some(ShapeVariant::Group(members)) => {
            for member in members {
                visit_leaves(&member.data(), &pose, margin, visit)?;
            }
            ControlFlow::Continue(())
        }
        Some(_) => match data.collision_data() {
            Some(collision) => visit(&PlacedShape::new(collision, pose, margin)),
            None => ControlFlow::Continue(()),
        },
    }
}

fn visit_world_leaves(data: &GeometryData, visit: &mut Visitor<'_>) -> ControlFlow<()> {
    visit_leaves(data, &RigidTransform::identity(), 0.0, visit)
}

/// True if some pair of leaves is separated by at most `tolerance`
pub(crate) fn within_distance(a: &GeometryData, b: &GeometryData, tolerance: f64, settings: &QuerySettings) -> bool {
    trace!("within_distance: {} vs {}, tolerance {tolerance}", a.geometry_type(), b.geometry_type());
    visit_world_leaves(a, &mut |leaf_a| {
        visit_world_leaves(b, &mut |leaf_b| {
            if query::separation(leaf_a, leaf_b, tolerance, tolerance, settings) <= tolerance {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    })
    .is_break()
}

/// Minimum separation over all leaf pairs, clamped at 0; infinity if
/// either side has no leaves
pub(crate) fn distance(a: &GeometryData, b: &GeometryData, settings: &QuerySettings) -> f64 {
    trace!("distance: {} vs {}", a.geometry_type(), b.geometry_type());
    let mut best = f64::INFINITY;
    let _ = visit_world_leaves(a, &mut |leaf_a| {
        visit_world_leaves(b, &mut |leaf_b| {
            best = best.min(query::separation(leaf_a, leaf_b, best, 0.0, settings));
            if best <= 0.0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    });
    best.max(0.0)
}

/// Nearest world point on the margin-inflated geometry
pub(crate) fn closest_point(data: &GeometryData, point: &Vec3, settings: &QuerySettings) -> Option<Vec3> {
    let mut best: Option<(f64, Vec3)> = None;
    let _ = visit_world_leaves(data, &mut |leaf| {
        if let Some((gap, found)) = query::closest_point(leaf, point, settings) {
            if best.map_or(true, |(g, _)| gap < g) {
                best = Some((gap, found));
            }
        }
        match best {
            Some((gap, _)) if gap <= 0.0 => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    });
    best.map(|(_, p)| p)
}

/// First world-space hit of the ray on the margin-inflated geometry
pub(crate) fn ray_cast(data: &GeometryData, origin: &Vec3, direction: &Vec3, settings: &QuerySettings) -> Option<Vec3> {
    let mut best: Option<f64> = None;
    let _ = visit_world_leaves(data, &mut |leaf| {
        if let Some(t) = query::ray_cast(leaf, origin, direction, settings) {
            if best.map_or(true, |b| t < b) {
                best = Some(t);
            }
        }
        ControlFlow::Continue(())
    });
    best.map(|t| origin + direction * t)
}

/// Loose world bounds from the cached local bounds
pub(crate) fn bounding_box(data: &GeometryData) -> AABB {
    data.collision_data()
        .map_or_else(AABB::empty, |collision| collision.bounds.transformed(&data.pose))
}

/// Tight world bounds by scanning every atom
pub(crate) fn bounding_box_tight(data: &GeometryData) -> AABB {
    let mut bounds = AABB::empty();
    let _ = visit_world_leaves(data, &mut |leaf| {
        bounds = bounds.union(&leaf.tight_bounds());
        ControlFlow::Continue(())
    });
    bounds
}
