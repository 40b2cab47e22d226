//! Shape value types
//!
//! Plain data holders consumed by the geometry handle. None of these types
//! know about poses, margins or proximity queries.
//!
//! - [`Primitive`] - point, sphere, segment, box and ellipsoid primitives
//! - [`TriangleMesh`] - indexed triangle meshes
//! - [`PointCloud`] - points with a per-point property table and settings

pub mod primitive;
pub mod triangle_mesh;
pub mod point_cloud;

pub use primitive::{Primitive, PrimitiveGeometry, PrimitiveKind};
pub use triangle_mesh::TriangleMesh;
pub use point_cloud::PointCloud;
