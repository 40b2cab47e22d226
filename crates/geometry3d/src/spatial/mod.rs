//! Spatial partitioning data structures
//!
//! Provides bounding boxes and the octree used as the lazily-built
//! acceleration structure of meshes and point clouds.

mod aabb;
mod octree;

pub use aabb::AABB;
pub use octree::{Octree, OctreeConfig, OctreeItem, OctreeNode};
