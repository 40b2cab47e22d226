//! Wavefront OBJ reader and writer for triangle meshes
//!
//! Only `v` and `f` records are interpreted. Face corners may carry texture
//! and normal indices (`v/vt/vn`), which are ignored. Polygons are fan
//! triangulated and negative indices count back from the latest vertex.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::assets::AssetError;
use crate::foundation::math::Vec3;
use crate::shapes::TriangleMesh;

/// OBJ import and export
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file as a triangle mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<TriangleMesh, AssetError> {
        let file = File::open(path)?;
        Self::read_obj(BufReader::new(file))
    }

    /// Parse OBJ text from any buffered reader
    pub fn read_obj<R: BufRead>(reader: R) -> Result<TriangleMesh, AssetError> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let mut coordinate = |axis: &str| -> Result<f64, AssetError> {
                        parts
                            .next()
                            .ok_or_else(|| AssetError::InvalidFormat(format!("line {}: vertex without {axis}", number + 1)))?
                            .parse()
                            .map_err(|_| AssetError::Parse(format!("line {}: invalid vertex {axis}", number + 1)))
                    };
                    let x = coordinate("x")?;
                    let y = coordinate("y")?;
                    let z = coordinate("z")?;
                    vertices.push(Vec3::new(x, y, z));
                }
                Some("f") => {
                    let corners = parts
                        .map(|corner| resolve_index(corner, vertices.len(), number + 1))
                        .collect::<Result<Vec<u32>, _>>()?;
                    if corners.len() < 3 {
                        return Err(AssetError::InvalidFormat(format!(
                            "line {}: face with {} corners",
                            number + 1,
                            corners.len()
                        )));
                    }
                    for i in 1..corners.len() - 1 {
                        indices.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {
                    // Normals, texture coordinates, groups and materials are not geometry
                }
            }
        }

        debug!("Parsed OBJ: {} vertices, {} triangles", vertices.len(), indices.len());
        Ok(TriangleMesh::new(vertices, indices)?)
    }

    /// Save a triangle mesh as an OBJ file
    pub fn save_obj<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<(), AssetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_obj(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a triangle mesh as OBJ text
    pub fn write_obj<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<(), AssetError> {
        writeln!(writer, "# {} vertices, {} triangles", mesh.num_vertices(), mesh.num_triangles())?;
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for [a, b, c] in &mesh.indices {
            writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        Ok(())
    }
}

/// Zero-based vertex index of one face corner
fn resolve_index(corner: &str, vertex_count: usize, line: usize) -> Result<u32, AssetError> {
    let position = corner.split('/').next().unwrap_or_default();
    let raw: i64 = position
        .parse()
        .map_err(|_| AssetError::Parse(format!("line {line}: invalid face index '{corner}'")))?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => i64::try_from(vertex_count).ok().map(|count| count + r),
    };
    resolved
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i < vertex_count)
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| AssetError::InvalidFormat(format!("line {line}: face index {raw} out of bounds")))
}
