//! Indexed triangle meshes

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::foundation::math::{Mat3, Vec3};

/// A 3D indexed triangle mesh.
///
/// `vertices` holds the corner positions and `indices` holds one vertex-index
/// triple per triangle. Every index must be below `vertices.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle corner indices into `vertices`
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Creates a mesh from vertices and triangles, checking the index range
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Result<Self> {
        let mesh = Self { vertices, indices };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Creates a mesh from a flattened coordinate list `[x1, y1, z1, x2, ...]`
    /// and a flattened index list `[a1, b1, c1, a2, ...]`
    pub fn from_flat(vertices: &[f64], indices: &[u32]) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(GeometryError::dimension("a multiple of 3 coordinates", vertices.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(GeometryError::dimension("a multiple of 3 indices", indices.len()));
        }
        let vertices = vertices
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        let indices = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::new(vertices, indices)
    }

    /// Returns the flattened coordinate and index lists
    pub fn to_flat(&self) -> (Vec<f64>, Vec<u32>) {
        let vertices = self.vertices.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        let indices = self.indices.iter().flatten().copied().collect();
        (vertices, indices)
    }

    /// Number of vertices
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// True if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Corner positions of triangle `index`
    pub fn triangle(&self, index: usize) -> Result<[Vec3; 3]> {
        let tri = self
            .indices
            .get(index)
            .ok_or_else(|| GeometryError::index(index, self.indices.len()))?;
        let corner = |i: u32| {
            self.vertices
                .get(i as usize)
                .copied()
                .ok_or_else(|| GeometryError::index(i as usize, self.vertices.len()))
        };
        Ok([corner(tri[0])?, corner(tri[1])?, corner(tri[2])?])
    }

    /// Checks that every index refers to an existing vertex
    pub fn validate(&self) -> Result<()> {
        let len = self.vertices.len();
        match self.indices.iter().flatten().find(|&&i| i as usize >= len) {
            Some(&bad) => Err(GeometryError::index(bad as usize, len)),
            None => Ok(()),
        }
    }

    /// Translates all the vertices by `v = v + t`
    pub fn translate(&mut self, t: &Vec3) {
        for v in &mut self.vertices {
            *v += t;
        }
    }

    /// Transforms all the vertices by `v = m·v + t`
    pub fn transform(&mut self, m: &Mat3, t: &Vec3) {
        for v in &mut self.vertices {
            *v = m * *v + t;
        }
    }
}
