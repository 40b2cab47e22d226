//! Scene ownership of shared geometry
//!
//! Reference handles alias geometry state owned by a registry and are
//! identified by an [`ElementKey`].

pub mod registry;

pub use registry::{ElementKey, GeometryRegistry, GeometryWorld, SharedGeometry};
