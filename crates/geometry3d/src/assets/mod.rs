//! Shape file formats
//!
//! Loading and saving dispatch on the lowercase file extension:
//!
//! | extension | shape | module |
//! |-----------|-------|--------|
//! | `.obj`  | triangle mesh | [`obj_loader`] |
//! | `.pcd`  | point cloud (ASCII) | [`pcd`] |
//! | `.geom` | primitive | [`geom_format`] |
//! | `.ron`  | any shape, groups included | serde |

pub mod geom_format;
pub mod obj_loader;
pub mod pcd;

pub use obj_loader::ObjLoader;
pub use pcd::PcdLoader;

use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::config::extension_of;
use crate::error::GeometryError;
use crate::geometry::ShapeVariant;

/// Errors raised while reading or writing shape files
#[derive(Error, Debug)]
pub enum AssetError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed number or token
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed tokens that do not describe a valid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Extension not recognised, or not able to hold the shape
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// File content violates a shape invariant
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Load a shape, choosing the format from the file extension
pub fn load_shape(path: &Path) -> Result<ShapeVariant, AssetError> {
    let shape = match extension_of(path).as_deref() {
        Some("obj") => ObjLoader::load_obj(path)?.into(),
        Some("pcd") => PcdLoader::load_pcd(path)?.into(),
        Some("geom") => geom_format::load_geom(path)?.into(),
        Some("ron") => {
            let contents = std::fs::read_to_string(path)?;
            ron::from_str(&contents).map_err(|e| AssetError::Parse(e.to_string()))?
        }
        _ => return Err(AssetError::UnsupportedFormat(path.display().to_string())),
    };
    debug!("Read {} shape from {}", shape_kind(&shape), path.display());
    Ok(shape)
}

/// Save a shape, choosing the format from the file extension
pub fn save_shape(shape: &ShapeVariant, path: &Path) -> Result<(), AssetError> {
    match (extension_of(path).as_deref(), shape) {
        (Some("obj"), ShapeVariant::TriangleMesh(mesh)) => ObjLoader::save_obj(mesh, path),
        (Some("pcd"), ShapeVariant::PointCloud(cloud)) => PcdLoader::save_pcd(cloud, path),
        (Some("geom"), ShapeVariant::Primitive(primitive)) => geom_format::save_geom(primitive, path),
        (Some("ron"), _) => {
            let contents = ron::ser::to_string_pretty(shape, ron::ser::PrettyConfig::default())
                .map_err(|e| AssetError::Serialize(e.to_string()))?;
            std::fs::write(path, contents)?;
            Ok(())
        }
        (Some(ext @ ("obj" | "pcd" | "geom")), _) => Err(AssetError::UnsupportedFormat(format!(
            "{} geometry cannot be stored as .{ext}",
            shape_kind(shape)
        ))),
        _ => Err(AssetError::UnsupportedFormat(path.display().to_string())),
    }
}

fn shape_kind(shape: &ShapeVariant) -> &'static str {
    shape.geometry_type().name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::geometry::Geometry3D;
    use crate::shapes::{PointCloud, Primitive};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geometry3d_assets_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_group_round_trips_through_ron() {
        let mut group = Geometry3D::new();
        group.set_group().unwrap();
        group.set_element(0, &Primitive::sphere(Vec3::zeros(), 1.0).into()).unwrap();
        let mut cloud = PointCloud::from_points(vec![Vec3::x(), Vec3::y()]);
        cloud.set_setting("VERSION", "0.7");
        group.set_element(1, &cloud.into()).unwrap();

        let path = temp_path("group.ron");
        let shape = group.shape().unwrap();
        save_shape(&shape, &path).unwrap();
        let loaded = load_shape(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, shape);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let shape = ShapeVariant::from(Primitive::point(Vec3::zeros()));
        let path = temp_path("shape.stl");
        assert!(matches!(save_shape(&shape, &path), Err(AssetError::UnsupportedFormat(_))));
        assert!(matches!(load_shape(&path), Err(AssetError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_shape_must_fit_extension() {
        let shape = ShapeVariant::from(Primitive::point(Vec3::zeros()));
        let path = temp_path("point.obj");
        assert!(matches!(save_shape(&shape, &path), Err(AssetError::UnsupportedFormat(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let shape = ShapeVariant::from(Primitive::segment(Vec3::zeros(), Vec3::z()));
        let path = temp_path("segment.GEOM");
        save_shape(&shape, &path).unwrap();
        let loaded = load_shape(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, shape);
    }

    #[test]
    fn test_handle_file_round_trip_and_failures() {
        let path = temp_path("handle.geom");
        let source = Geometry3D::from(Primitive::sphere(Vec3::new(1.0, 2.0, 3.0), 0.5));
        assert!(source.save_file(&path));

        let mut loaded = Geometry3D::new();
        assert!(loaded.load_file(&path));
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.primitive().unwrap(), source.primitive().unwrap());

        assert!(!Geometry3D::new().save_file(temp_path("untyped.ron")));
        assert!(!loaded.load_file(temp_path("missing.obj")));
        assert_eq!(loaded.primitive().unwrap(), source.primitive().unwrap());
    }
}
