//! Per-handle geometry state
//!
//! Everything a geometry handle owns (or aliases through a registry): the
//! shape, its current pose, its collision margin, query tuning and the lazily
//! built collision data. The collision data lives in a [`OnceCell`]; an empty
//! cell means it must be rebuilt, and every data mutation empties it.

use std::cell::OnceCell;

use log::debug;

use crate::core::GeometryConfig;
use crate::foundation::math::{Mat3, RigidTransform, Vec3};
use crate::geometry::variant::{GeometryType, ShapeVariant};
use crate::physics::CollisionData;
use crate::spatial::AABB;

/// State behind a geometry handle
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub(crate) shape: Option<ShapeVariant>,
    pub(crate) pose: RigidTransform,
    pub(crate) margin: f64,
    pub(crate) config: GeometryConfig,
    cache: OnceCell<CollisionData>,
}

impl PartialEq for GeometryData {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.pose == other.pose && self.margin == other.margin
    }
}

impl GeometryData {
    /// State holding `shape` with identity pose and zero margin
    pub fn from_shape(shape: ShapeVariant) -> Self {
        Self {
            shape: Some(shape),
            ..Self::default()
        }
    }

    /// The shape, if any
    pub fn shape(&self) -> Option<&ShapeVariant> {
        self.shape.as_ref()
    }

    /// Kind of the held shape
    pub fn geometry_type(&self) -> GeometryType {
        self.shape
            .as_ref()
            .map_or(GeometryType::Untyped, ShapeVariant::geometry_type)
    }

    /// Current pose
    pub fn pose(&self) -> &RigidTransform {
        &self.pose
    }

    /// Collision margin
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Mutable access to the shape; clears the collision data
    pub(crate) fn shape_mut(&mut self) -> Option<&mut ShapeVariant> {
        self.invalidate();
        self.shape.as_mut()
    }

    /// Replace the shape; clears the collision data
    pub(crate) fn set_shape(&mut self, shape: Option<ShapeVariant>) {
        self.invalidate();
        self.shape = shape;
    }

    /// Forget shape, pose and margin; the configuration is kept
    pub(crate) fn clear(&mut self) {
        *self = Self {
            config: std::mem::take(&mut self.config),
            ..Self::default()
        };
    }

    /// Drop cached collision data so the next query rebuilds it
    pub(crate) fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("Invalidated {} collision data", self.geometry_type());
        }
    }

    /// True if collision data is currently cached
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Collision data in the local frame, built on first use
    pub fn collision_data(&self) -> Option<&CollisionData> {
        let shape = self.shape.as_ref()?;
        Some(self.cache.get_or_init(|| self.build_collision_data(shape)))
    }

    fn build_collision_data(&self, shape: &ShapeVariant) -> CollisionData {
        match shape {
            ShapeVariant::Primitive(primitive) => CollisionData::from_primitive(primitive),
            ShapeVariant::TriangleMesh(mesh) => CollisionData::from_triangle_mesh(mesh, &self.config.octree),
            ShapeVariant::PointCloud(cloud) => CollisionData::from_point_cloud(cloud, &self.config.octree),
            ShapeVariant::Group(members) => {
                let bounds = members.iter().fold(AABB::empty(), |acc, member| {
                    let data = member.data();
                    let member_bounds = data
                        .collision_data()
                        .map_or_else(AABB::empty, |cd| cd.bounds.transformed(&data.pose));
                    acc.union(&member_bounds)
                });
                debug!("Built group bounds over {} members", members.len());
                CollisionData::from_bounds(bounds)
            }
        }
    }

    /// Apply `v' = m·v + t` to the local data
    pub(crate) fn transform(&mut self, m: &Mat3, t: &Vec3) {
        if let Some(shape) = self.shape_mut() {
            shape.transform(m, t);
        }
    }

    /// Apply `v' = m·v + t` given in the parent (group) frame. The pose is
    /// kept and the local data absorbs the conjugated map.
    pub(crate) fn transform_in_parent_frame(&mut self, m: &Mat3, t: &Vec3) {
        let r = self.pose.rotation;
        let p = self.pose.translation;
        let rt = r.transpose();
        let local_m = rt * m * r;
        let local_t = rt * (m * p + t - p);
        self.transform(&local_m, &local_t);
    }

    /// Apply a configuration here and to every group member
    pub(crate) fn set_config(&mut self, config: &GeometryConfig) {
        self.invalidate();
        self.config = config.clone();
        if let Some(ShapeVariant::Group(members)) = &mut self.shape {
            for member in members {
                member.data_mut().set_config(config);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Primitive;

    #[test]
    fn test_cache_is_lazy_and_cleared_by_mutation() {
        let mut data = GeometryData::from_shape(Primitive::point(Vec3::zeros()).into());
        assert!(!data.is_cached());
        assert!(data.collision_data().is_some());
        assert!(data.is_cached());

        data.pose = RigidTransform::from_translation(Vec3::x());
        assert!(data.is_cached());

        data.transform(&Mat3::identity(), &Vec3::y());
        assert!(!data.is_cached());
    }

    #[test]
    fn test_untyped_has_no_collision_data() {
        let data = GeometryData::default();
        assert_eq!(data.geometry_type(), GeometryType::Untyped);
        assert!(data.collision_data().is_none());
    }

    #[test]
    fn test_parent_frame_transform_keeps_world_geometry_consistent() {
        let rotation = Mat3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let mut data = GeometryData::from_shape(Primitive::point(Vec3::new(1.0, 0.0, 0.0)).into());
        data.pose = RigidTransform::new(rotation, Vec3::new(0.0, 0.0, 3.0));

        let world_before = data.pose.transform_point(&Vec3::new(1.0, 0.0, 0.0));
        let m = Mat3::identity() * 2.0;
        let t = Vec3::new(1.0, 1.0, 1.0);
        data.transform_in_parent_frame(&m, &t);

        let Some(ShapeVariant::Primitive(p)) = data.shape() else {
            panic!("expected a primitive");
        };
        let local = Vec3::new(p.parameters()[0], p.parameters()[1], p.parameters()[2]);
        let world_after = data.pose.transform_point(&local);
        approx::assert_relative_eq!(world_after, m * world_before + t, epsilon = 1e-12);
    }
}
