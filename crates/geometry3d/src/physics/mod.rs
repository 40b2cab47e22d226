//! Physics module for proximity queries
//!
//! Provides the collision representations cached by each geometry and the
//! distance, contact, closest-point and ray queries run on them.

pub mod collision;

pub use collision::{CollisionData, PlacedShape, QuerySettings};
