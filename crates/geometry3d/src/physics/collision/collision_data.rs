//! Cached collision representation
//!
//! Built lazily from a shape in its local frame: bounds, the convex atoms the
//! shape decomposes into and, for meshes and point clouds, an octree over the
//! atoms' bounding spheres.

use log::{debug, warn};

use crate::foundation::math::Mat3;
use crate::physics::collision::convex::{Atom, ConvexShape};
use crate::physics::collision::primitives::Triangle;
use crate::shapes::{PointCloud, Primitive, PrimitiveGeometry, TriangleMesh};
use crate::spatial::{Octree, OctreeConfig, OctreeItem, AABB};

/// Local-frame acceleration data for one shape
#[derive(Debug, Clone)]
pub struct CollisionData {
    /// Bounds of the bare shape (atom radii included, margin excluded)
    pub bounds: AABB,
    /// Convex decomposition; empty for groups
    pub atoms: Vec<Atom>,
    /// Octree over atom bounding spheres, for meshes and point clouds
    pub octree: Option<Octree>,
}

impl CollisionData {
    /// Single-atom representation of a primitive
    pub fn from_primitive(primitive: &Primitive) -> Self {
        let atom = match primitive.geometry() {
            PrimitiveGeometry::Point(p) => Atom::new(ConvexShape::Point(p)),
            PrimitiveGeometry::Sphere { center, radius } => Atom::inflated(ConvexShape::Point(center), radius),
            PrimitiveGeometry::Segment(a, b) => Atom::new(ConvexShape::Segment(a, b)),
            PrimitiveGeometry::Aabb { min, max } => Atom::new(ConvexShape::Box {
                center: (min + max) * 0.5,
                axes: Mat3::from_diagonal(&((max - min) * 0.5)),
            }),
            PrimitiveGeometry::Box { center, axes } => Atom::new(ConvexShape::Box { center, axes }),
            PrimitiveGeometry::Ellipsoid { center, axes } => Atom::new(ConvexShape::Ellipsoid { center, axes }),
        };
        debug!("Built collision data for {} primitive", primitive.kind());
        Self::from_atoms(vec![atom], None)
    }

    /// One triangle atom per mesh face, indexed by an octree
    pub fn from_triangle_mesh(mesh: &TriangleMesh, config: &OctreeConfig) -> Self {
        let mut skipped = 0usize;
        let atoms: Vec<Atom> = (0..mesh.num_triangles())
            .filter_map(|i| match mesh.triangle(i) {
                Ok([a, b, c]) => Some(Atom::new(ConvexShape::Triangle(Triangle::new(a, b, c)))),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            warn!("Skipped {skipped} triangles with out-of-range vertex indices");
        }
        let data = Self::from_atoms(atoms, Some(config));
        debug!(
            "Built collision data for triangle mesh: {} triangles, {} octree leaves",
            data.atoms.len(),
            data.octree.as_ref().map_or(0, |tree| tree.get_all_leaves().len())
        );
        data
    }

    /// One point atom per cloud point, indexed by an octree
    pub fn from_point_cloud(cloud: &PointCloud, config: &OctreeConfig) -> Self {
        let atoms = cloud
            .vertices()
            .iter()
            .map(|p| Atom::new(ConvexShape::Point(*p)))
            .collect();
        let data = Self::from_atoms(atoms, Some(config));
        debug!("Built collision data for point cloud: {} points", data.atoms.len());
        data
    }

    /// Bounds-only data, used for groups
    pub fn from_bounds(bounds: AABB) -> Self {
        Self {
            bounds,
            atoms: Vec::new(),
            octree: None,
        }
    }

    fn from_atoms(atoms: Vec<Atom>, octree: Option<&OctreeConfig>) -> Self {
        let bounds = atoms
            .iter()
            .fold(AABB::empty(), |acc, atom| acc.union(&atom.bounds()));
        let octree = octree.filter(|_| !atoms.is_empty()).map(|config| {
            let items = atoms.iter().enumerate().map(|(index, atom)| {
                let (center, radius) = atom.bounding_sphere();
                OctreeItem { index, center, radius }
            });
            Octree::build(items, config.clone())
        });
        Self { bounds, atoms, octree }
    }

    /// True if there is nothing to collide with
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
