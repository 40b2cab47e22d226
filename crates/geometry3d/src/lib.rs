//! # Geometry3D
//!
//! A unified 3D geometry handle over primitives, triangle meshes, point clouds
//! and groups, with proximity queries between any two of them.
//!
//! ## Features
//!
//! - **One handle, four shapes**: [`Geometry3D`](geometry::Geometry3D) holds a
//!   primitive, a triangle mesh, a point cloud or a group of other handles
//! - **Current pose**: a rigid world placement kept apart from the local data,
//!   so moving a geometry never rebuilds its acceleration structures
//! - **Collision margin**: every query sees the shape inflated by its margin
//! - **Lazy acceleration**: octrees and convex decompositions are built on the
//!   first query and dropped whenever the local data changes
//! - **Proximity queries**: collision, tolerance checks, distance, closest
//!   point, ray casts and bounding boxes
//! - **File I/O**: OBJ, ASCII PCD, `.geom` primitives and RON
//!
//! ## Quick Start
//!
//! ```rust
//! use geometry3d::prelude::*;
//!
//! let mut a = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 1.0));
//! let mut b = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 1.0));
//! b.set_current_transform(Mat3::identity(), Vec3::new(3.0, 0.0, 0.0));
//! assert_eq!(a.distance(&b), 1.0);
//!
//! a.set_collision_margin(0.5).unwrap();
//! b.set_collision_margin(0.5).unwrap();
//! assert!(a.collides(&b));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared building blocks
pub mod foundation;
pub mod config;
pub mod core;
pub mod error;

// Shape data and the handle
pub mod shapes;
pub mod geometry;
pub mod scene;
pub mod assets;

// Query machinery
pub mod spatial;
pub mod physics;

pub use error::{GeometryError, Result};
pub use geometry::Geometry3D;

/// Common imports for geometry users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::GeometryConfig,
        error::{GeometryError, Result},
        foundation::math::{Mat3, RigidTransform, Vec3},
        geometry::{Geometry3D, GeometryType, ShapeVariant},
        scene::{ElementKey, GeometryRegistry, GeometryWorld},
        shapes::{PointCloud, Primitive, PrimitiveKind, TriangleMesh},
        spatial::AABB,
    };
}
