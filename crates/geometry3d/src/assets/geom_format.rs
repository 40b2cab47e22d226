//! Single-primitive `.geom` files
//!
//! The file holds one primitive in its canonical string form, for example
//! `Sphere 0 0 0 1`.

use std::path::Path;

use crate::assets::AssetError;
use crate::shapes::Primitive;

/// Load a primitive from a `.geom` file
pub fn load_geom(path: &Path) -> Result<Primitive, AssetError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.trim().parse::<Primitive>()?)
}

/// Save a primitive to a `.geom` file
pub fn save_geom(primitive: &Primitive, path: &Path) -> Result<(), AssetError> {
    std::fs::write(path, format!("{}\n", primitive.save_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::foundation::math::{Mat3, Vec3};

    #[test]
    fn test_primitive_file_round_trip() {
        let path = std::env::temp_dir().join(format!("geometry3d_box_{}.geom", std::process::id()));
        let primitive = Primitive::oriented_box(Vec3::new(1.0, -2.0, 0.5), Mat3::from_diagonal(&Vec3::new(0.1, 0.2, 0.3)));
        save_geom(&primitive, &path).unwrap();
        let loaded = load_geom(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, primitive);
    }

    #[test]
    fn test_bad_primitive_text_is_a_geometry_error() {
        let path = std::env::temp_dir().join(format!("geometry3d_bad_{}.geom", std::process::id()));
        std::fs::write(&path, "Sphere 0 0\n").unwrap();
        let result = load_geom(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AssetError::Geometry(GeometryError::InvalidPrimitive(_)))));
    }
}
