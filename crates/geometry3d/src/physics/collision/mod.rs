//! Collision detection on convex decompositions
//!
//! # Architecture
//!
//! - **Model Space Storage**: collision data is built once in the local frame
//!   of a shape and cached until the shape changes
//! - **On-Demand Transformation**: atoms are moved into the other operand's
//!   frame (or the query into the shape's frame) only while testing
//! - **Octree Pruning**: meshes and point clouds index their atoms so pair
//!   queries only run the narrow phase on nearby candidates
//!
//! # Module Organization
//!
//! - [`primitives`] - Rays and triangles with exact intersection routines
//! - [`convex`] - Convex atoms with support mappings and ray casts
//! - [`gjk`] - GJK distance between support mappings
//! - [`collision_data`] - Cached local-frame representation of a shape
//! - [`query`] - Pairwise separation, closest point and ray cast

pub mod primitives;
pub mod convex;
pub mod gjk;
pub mod collision_data;
pub mod query;

// Re-export commonly used types
pub use primitives::{Ray, Triangle};
pub use convex::{Atom, ConvexShape, MarchSettings};
pub use gjk::{gjk_distance, GjkResult, GjkSettings, SupportMap};
pub use collision_data::CollisionData;
pub use query::{PlacedShape, QuerySettings};
