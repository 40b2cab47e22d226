//! Point clouds with per-point property tables
//!
//! Properties are stored as a row-major matrix with one row per point and one
//! column per property name. The table always stays rectangular: adding a
//! point appends a zero row and adding a property appends a column.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::foundation::math::{Mat3, Vec3};

/// Property names that hold a per-point normal and rotate with the cloud
const NORMAL_PROPERTIES: [&str; 3] = ["normal_x", "normal_y", "normal_z"];

/// A 3D point cloud with named per-point properties and free-form settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PointCloudRecord", into = "PointCloudRecord")]
pub struct PointCloud {
    vertices: Vec<Vec3>,
    property_names: Vec<String>,
    properties: Vec<f64>,
    settings: BTreeMap<String, String>,
}

/// Unvalidated serde form of a [`PointCloud`]
#[derive(Serialize, Deserialize)]
struct PointCloudRecord {
    vertices: Vec<Vec3>,
    #[serde(default)]
    property_names: Vec<String>,
    #[serde(default)]
    properties: Vec<f64>,
    #[serde(default)]
    settings: BTreeMap<String, String>,
}

impl TryFrom<PointCloudRecord> for PointCloud {
    type Error = GeometryError;

    fn try_from(record: PointCloudRecord) -> Result<Self> {
        let mut cloud = PointCloud::new();
        cloud.set_points(record.vertices);
        for name in record.property_names {
            cloud.add_property(&name)?;
        }
        cloud.set_properties(&record.properties)?;
        cloud.settings = record.settings;
        Ok(cloud)
    }
}

impl From<PointCloud> for PointCloudRecord {
    fn from(cloud: PointCloud) -> Self {
        Self {
            vertices: cloud.vertices,
            property_names: cloud.property_names,
            properties: cloud.properties,
            settings: cloud.settings,
        }
    }
}

impl PointCloud {
    /// Creates an empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud from positions, with no properties
    pub fn from_points(points: Vec<Vec3>) -> Self {
        let mut cloud = Self::new();
        cloud.set_points(points);
        cloud
    }

    /// Returns the number of points
    pub fn num_points(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of properties
    pub fn num_properties(&self) -> usize {
        self.property_names.len()
    }

    /// True if the cloud has no points
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Point positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Property names, in column order
    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    /// Row-major property table (`num_points × num_properties`)
    pub fn properties(&self) -> &[f64] {
        &self.properties
    }

    /// Sets all the points. Existing property rows are kept for surviving
    /// points; new points get zero rows.
    pub fn set_points(&mut self, points: Vec<Vec3>) {
        self.properties.resize(points.len() * self.num_properties(), 0.0);
        self.vertices = points;
    }

    /// Sets all the points from a flattened `3n` coordinate list
    pub fn set_points_flat(&mut self, coordinates: &[f64]) -> Result<()> {
        if coordinates.len() % 3 != 0 {
            return Err(GeometryError::dimension("a multiple of 3 coordinates", coordinates.len()));
        }
        let points = coordinates
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        self.set_points(points);
        Ok(())
    }

    /// Adds a point with all its properties set to 0. Returns the index.
    pub fn add_point(&mut self, p: Vec3) -> usize {
        self.vertices.push(p);
        self.properties
            .extend(std::iter::repeat(0.0).take(self.property_names.len()));
        self.vertices.len() - 1
    }

    /// Sets the position of the point at the given index
    pub fn set_point(&mut self, index: usize, p: Vec3) -> Result<()> {
        let len = self.vertices.len();
        let slot = self
            .vertices
            .get_mut(index)
            .ok_or_else(|| GeometryError::index(index, len))?;
        *slot = p;
        Ok(())
    }

    /// Retrieves the position of the point at the given index
    pub fn point(&self, index: usize) -> Result<Vec3> {
        self.vertices
            .get(index)
            .copied()
            .ok_or_else(|| GeometryError::index(index, self.vertices.len()))
    }

    /// Column index of a named property
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.property_names.iter().position(|n| n == name)
    }

    /// Adds a new property. All values for this property are set to 0.
    pub fn add_property(&mut self, name: &str) -> Result<()> {
        let zeros = vec![0.0; self.num_points()];
        self.add_property_with_values(name, &zeros)
    }

    /// Adds a new property with one value per point
    pub fn add_property_with_values(&mut self, name: &str, values: &[f64]) -> Result<()> {
        if self.property_index(name).is_some() {
            return Err(GeometryError::DuplicateProperty(name.to_string()));
        }
        if values.len() != self.num_points() {
            return Err(GeometryError::dimension(self.num_points(), values.len()));
        }
        let k = self.num_properties();
        let mut table = Vec::with_capacity(self.num_points() * (k + 1));
        for (row, value) in values.iter().enumerate() {
            table.extend_from_slice(&self.properties[row * k..(row + 1) * k]);
            table.push(*value);
        }
        self.properties = table;
        self.property_names.push(name.to_string());
        Ok(())
    }

    /// Sets all the properties of all points from a row-major `k·n` list
    pub fn set_properties(&mut self, values: &[f64]) -> Result<()> {
        let expected = self.num_points() * self.num_properties();
        if values.len() != expected {
            return Err(GeometryError::dimension(expected, values.len()));
        }
        self.properties.copy_from_slice(values);
        Ok(())
    }

    /// Sets property `pindex` of every point from an `n` list
    pub fn set_property_column(&mut self, pindex: usize, values: &[f64]) -> Result<()> {
        self.check_property(pindex)?;
        if values.len() != self.num_points() {
            return Err(GeometryError::dimension(self.num_points(), values.len()));
        }
        let k = self.num_properties();
        for (row, value) in values.iter().enumerate() {
            self.properties[row * k + pindex] = *value;
        }
        Ok(())
    }

    /// Sets property `pindex` of point `index`
    pub fn set_property(&mut self, index: usize, pindex: usize, value: f64) -> Result<()> {
        let slot = self.slot(index, pindex)?;
        self.properties[slot] = value;
        Ok(())
    }

    /// Sets the named property of point `index`
    pub fn set_property_by_name(&mut self, index: usize, name: &str, value: f64) -> Result<()> {
        let pindex = self.named(name)?;
        self.set_property(index, pindex, value)
    }

    /// Gets property `pindex` of point `index`
    pub fn property(&self, index: usize, pindex: usize) -> Result<f64> {
        Ok(self.properties[self.slot(index, pindex)?])
    }

    /// Gets the named property of point `index`
    pub fn property_by_name(&self, index: usize, name: &str) -> Result<f64> {
        self.property(index, self.named(name)?)
    }

    /// All property values of point `index`
    pub fn point_properties(&self, index: usize) -> Result<&[f64]> {
        if index >= self.num_points() {
            return Err(GeometryError::index(index, self.num_points()));
        }
        let k = self.num_properties();
        Ok(&self.properties[index * k..(index + 1) * k])
    }

    /// Translates all the points by `v = v + t`
    pub fn translate(&mut self, t: &Vec3) {
        for v in &mut self.vertices {
            *v += t;
        }
    }

    /// Transforms all the points by `v = m·v + t`. Normal properties
    /// (`normal_x`, `normal_y`, `normal_z`) are mapped by the inverse transpose
    /// of `m` and renormalised.
    pub fn transform(&mut self, m: &Mat3, t: &Vec3) {
        for v in &mut self.vertices {
            *v = m * *v + t;
        }

        let normal_columns: Option<Vec<usize>> = NORMAL_PROPERTIES
            .iter()
            .map(|name| self.property_index(name))
            .collect();
        let (Some(columns), Some(inverse)) = (normal_columns, m.try_inverse()) else {
            return;
        };
        let normal_map = inverse.transpose();
        let k = self.num_properties();
        for row in self.properties.chunks_exact_mut(k) {
            let n = normal_map * Vec3::new(row[columns[0]], row[columns[1]], row[columns[2]]);
            let n = n.try_normalize(0.0).unwrap_or(n);
            row[columns[0]] = n.x;
            row[columns[1]] = n.y;
            row[columns[2]] = n.z;
        }
    }

    /// Appends the points of `other`. Both clouds must have the same property
    /// names in the same order; on mismatch neither cloud is modified.
    /// Settings of `self` win; keys only present in `other` are copied.
    pub fn join(&mut self, other: &PointCloud) -> Result<()> {
        if self.property_names != other.property_names {
            return Err(GeometryError::dimension(
                format!("properties {:?}", self.property_names),
                format!("properties {:?}", other.property_names),
            ));
        }
        self.vertices.extend_from_slice(&other.vertices);
        self.properties.extend_from_slice(&other.properties);
        for (key, value) in &other.settings {
            self.settings
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(())
    }

    /// Sets the given setting
    pub fn set_setting(&mut self, key: &str, value: &str) {
        self.settings.insert(key.to_string(), value.to_string());
    }

    /// Retrieves the given setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// All settings
    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    fn named(&self, name: &str) -> Result<usize> {
        self.property_index(name)
            .ok_or_else(|| GeometryError::PropertyNotFound(name.to_string()))
    }

    fn check_property(&self, pindex: usize) -> Result<()> {
        if pindex < self.num_properties() {
            Ok(())
        } else {
            Err(GeometryError::index(pindex, self.num_properties()))
        }
    }

    fn slot(&self, index: usize, pindex: usize) -> Result<usize> {
        if index >= self.num_points() {
            return Err(GeometryError::index(index, self.num_points()));
        }
        self.check_property(pindex)?;
        Ok(index * self.num_properties() + pindex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_point_and_property_scenario() {
        let mut pc = PointCloud::new();
        assert_eq!(pc.num_points(), 0);

        assert_eq!(pc.add_point(Vec3::new(1.0, 2.0, 3.0)), 0);
        assert_eq!(pc.num_points(), 1);

        pc.add_property("rgb").unwrap();
        assert_eq!(pc.num_properties(), 1);
        assert_eq!(pc.property_by_name(0, "rgb").unwrap(), 0.0);

        assert_eq!(pc.add_point(Vec3::new(4.0, 5.0, 6.0)), 1);
        assert_eq!(pc.num_points(), 2);
        assert_eq!(pc.property(1, 0).unwrap(), 0.0);
        assert_eq!(pc.properties().len(), 2);
    }

    #[test]
    fn test_property_errors() {
        let mut pc = PointCloud::from_points(vec![Vec3::zeros()]);
        pc.add_property("intensity").unwrap();

        assert_eq!(
            pc.add_property("intensity"),
            Err(GeometryError::DuplicateProperty("intensity".to_string()))
        );
        assert_eq!(
            pc.property_by_name(0, "rgb"),
            Err(GeometryError::PropertyNotFound("rgb".to_string()))
        );
        assert_eq!(pc.property(1, 0), Err(GeometryError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(pc.property(0, 3), Err(GeometryError::IndexOutOfRange { index: 3, len: 1 }));
        assert!(matches!(pc.set_properties(&[1.0, 2.0]), Err(GeometryError::DimensionMismatch { .. })));
        assert!(matches!(
            pc.add_property_with_values("a", &[]),
            Err(GeometryError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_property_columns_are_interleaved() {
        let mut pc = PointCloud::from_points(vec![Vec3::zeros(), Vec3::x()]);
        pc.add_property_with_values("a", &[1.0, 2.0]).unwrap();
        pc.add_property_with_values("b", &[3.0, 4.0]).unwrap();
        assert_eq!(pc.properties(), &[1.0, 3.0, 2.0, 4.0]);

        pc.set_property_column(1, &[5.0, 6.0]).unwrap();
        pc.set_property_by_name(0, "a", 7.0).unwrap();
        assert_eq!(pc.point_properties(0).unwrap(), &[7.0, 5.0]);
        assert_eq!(pc.point_properties(1).unwrap(), &[2.0, 6.0]);
    }

    #[test]
    fn test_set_points_resizes_table() {
        let mut pc = PointCloud::from_points(vec![Vec3::zeros()]);
        pc.add_property_with_values("a", &[9.0]).unwrap();
        pc.set_points_flat(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(pc.properties(), &[9.0, 0.0]);
        assert!(pc.set_points_flat(&[1.0]).is_err());
    }

    #[test]
    fn test_join_requires_matching_properties() {
        let mut a = PointCloud::from_points(vec![Vec3::zeros()]);
        a.add_property("rgb").unwrap();
        let mut b = PointCloud::from_points(vec![Vec3::x()]);
        b.add_property("intensity").unwrap();

        let (a_before, b_before) = (a.clone(), b.clone());
        assert!(matches!(a.join(&b), Err(GeometryError::DimensionMismatch { .. })));
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_join_appends_points_and_merges_settings() {
        let mut a = PointCloud::from_points(vec![Vec3::zeros()]);
        a.set_setting("viewpoint", "0 0 0 1 0 0 0");
        let mut b = PointCloud::from_points(vec![Vec3::x(), Vec3::y()]);
        b.set_setting("viewpoint", "ignored");
        b.set_setting("version", "0.7");

        a.join(&b).unwrap();
        assert_eq!(a.num_points(), 3);
        assert_eq!(a.point(2).unwrap(), Vec3::y());
        assert_eq!(a.setting("viewpoint"), Some("0 0 0 1 0 0 0"));
        assert_eq!(a.setting("version"), Some("0.7"));
    }

    #[test]
    fn test_transform_rotates_normals() {
        let mut pc = PointCloud::from_points(vec![Vec3::new(1.0, 0.0, 0.0)]);
        for name in NORMAL_PROPERTIES {
            pc.add_property(name).unwrap();
        }
        pc.set_property_by_name(0, "normal_x", 1.0).unwrap();

        let rotation = Mat3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        pc.transform(&rotation, &Vec3::new(0.0, 0.0, 2.0));

        assert_relative_eq!(pc.point(0).unwrap(), Vec3::new(0.0, 1.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(pc.property_by_name(0, "normal_y").unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pc.property_by_name(0, "normal_x").unwrap(), 0.0, epsilon = 1e-12);
    }
}
