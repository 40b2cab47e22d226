//! Unified 3D geometry
//!
//! - [`ShapeVariant`] - primitive, triangle mesh, point cloud or group
//! - [`GeometryData`] - shape plus pose, margin, tuning and cached collision data
//! - [`Geometry3D`] - standalone or registry-referenced handle exposing
//!   transforms and proximity queries

pub mod variant;
pub mod data;
pub mod handle;
mod proximity;

#[cfg(test)]
mod tests;

pub use variant::{GeometryType, ShapeVariant};
pub use data::GeometryData;
pub use handle::Geometry3D;
