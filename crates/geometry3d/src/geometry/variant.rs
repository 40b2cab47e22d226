//! Shape variant: the tagged union of concrete geometry representations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Vec3};
use crate::geometry::Geometry3D;
use crate::shapes::{PointCloud, Primitive, TriangleMesh};

/// Kind of shape held by a geometry handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// No shape assigned yet
    Untyped,
    /// A single [`Primitive`]
    Primitive,
    /// A [`TriangleMesh`]
    TriangleMesh,
    /// A [`PointCloud`]
    PointCloud,
    /// An ordered group of geometries
    Group,
}

impl GeometryType {
    /// Type discriminator string; empty for [`GeometryType::Untyped`]
    pub fn name(self) -> &'static str {
        match self {
            GeometryType::Untyped => "",
            GeometryType::Primitive => "Primitive",
            GeometryType::TriangleMesh => "TriangleMesh",
            GeometryType::PointCloud => "PointCloud",
            GeometryType::Group => "Group",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryType::Untyped => f.write_str("untyped"),
            other => f.write_str(other.name()),
        }
    }
}

/// Concrete geometry held by a handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeVariant {
    /// Single primitive
    Primitive(Primitive),
    /// Triangle mesh
    TriangleMesh(TriangleMesh),
    /// Point cloud
    PointCloud(PointCloud),
    /// Standalone members, each with its own pose and margin
    Group(Vec<Geometry3D>),
}

impl ShapeVariant {
    /// Kind of this variant
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            ShapeVariant::Primitive(_) => GeometryType::Primitive,
            ShapeVariant::TriangleMesh(_) => GeometryType::TriangleMesh,
            ShapeVariant::PointCloud(_) => GeometryType::PointCloud,
            ShapeVariant::Group(_) => GeometryType::Group,
        }
    }

    /// True if the variant holds no elements (a primitive always holds one)
    pub fn is_empty(&self) -> bool {
        match self {
            ShapeVariant::Primitive(_) => false,
            ShapeVariant::TriangleMesh(mesh) => mesh.is_empty(),
            ShapeVariant::PointCloud(cloud) => cloud.is_empty(),
            ShapeVariant::Group(members) => members.is_empty(),
        }
    }

    /// Rewrites the data by `v' = m·v + t`. Group members are moved as if
    /// they were expressed in the group frame, so their poses are kept.
    pub fn transform(&mut self, m: &Mat3, t: &Vec3) {
        match self {
            ShapeVariant::Primitive(primitive) => primitive.transform(m, t),
            ShapeVariant::TriangleMesh(mesh) => mesh.transform(m, t),
            ShapeVariant::PointCloud(cloud) => cloud.transform(m, t),
            ShapeVariant::Group(members) => {
                for member in members {
                    member.data_mut().transform_in_parent_frame(m, t);
                }
            }
        }
    }
}

impl From<Primitive> for ShapeVariant {
    fn from(primitive: Primitive) -> Self {
        ShapeVariant::Primitive(primitive)
    }
}

impl From<TriangleMesh> for ShapeVariant {
    fn from(mesh: TriangleMesh) -> Self {
        ShapeVariant::TriangleMesh(mesh)
    }
}

impl From<PointCloud> for ShapeVariant {
    fn from(cloud: PointCloud) -> Self {
        ShapeVariant::PointCloud(cloud)
    }
}
