//! ASCII PCD (v0.7) reader and writer for point clouds
//!
//! The `x`, `y` and `z` fields become point positions and every other field
//! becomes a named property, in header order. `VERSION` and `VIEWPOINT` are
//! kept in the cloud's settings under those keys and written back on save.
//! Binary data sections are not supported.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::assets::AssetError;
use crate::foundation::math::Vec3;
use crate::shapes::PointCloud;

/// Settings keys for the header lines carried through a load/save cycle
const CARRIED_HEADERS: [&str; 2] = ["VERSION", "VIEWPOINT"];

const DEFAULT_VERSION: &str = "0.7";
const DEFAULT_VIEWPOINT: &str = "0 0 0 1 0 0 0";

/// PCD import and export
pub struct PcdLoader;

impl PcdLoader {
    /// Load an ASCII PCD file as a point cloud
    pub fn load_pcd<P: AsRef<Path>>(path: P) -> Result<PointCloud, AssetError> {
        let file = File::open(path)?;
        Self::read_pcd(BufReader::new(file))
    }

    /// Parse ASCII PCD text from any buffered reader
    pub fn read_pcd<R: BufRead>(reader: R) -> Result<PointCloud, AssetError> {
        let mut lines = reader.lines();
        let mut header: HashMap<String, String> = HashMap::new();

        // Header runs up to and including the DATA line
        loop {
            let Some(line) = lines.next() else {
                return Err(AssetError::InvalidFormat("missing DATA line".to_string()));
            };
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let key = key.to_ascii_uppercase();
            let value = value.trim().to_string();
            let done = key == "DATA";
            header.insert(key, value);
            if done {
                break;
            }
        }

        let layout = Layout::from_header(&header)?;
        let mut positions = Vec::new();
        let mut values = Vec::new();
        for line in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|token| {
                    token
                        .parse::<f64>()
                        .map_err(|_| AssetError::Parse(format!("invalid value '{token}'")))
                })
                .collect::<Result<Vec<f64>, _>>()?;
            if row.len() != layout.fields.len() {
                return Err(AssetError::InvalidFormat(format!(
                    "expected {} values per point, found {}",
                    layout.fields.len(),
                    row.len()
                )));
            }
            positions.push(Vec3::new(row[layout.xyz[0]], row[layout.xyz[1]], row[layout.xyz[2]]));
            values.extend(layout.properties.iter().map(|&column| row[column]));
        }

        if let Some(expected) = layout.points {
            if expected != positions.len() {
                warn!("PCD header declares {expected} points but {} were read", positions.len());
            }
        }

        let mut cloud = PointCloud::from_points(positions);
        for &column in &layout.properties {
            cloud.add_property(&layout.fields[column])?;
        }
        cloud.set_properties(&values)?;
        for key in CARRIED_HEADERS {
            if let Some(value) = header.get(key) {
                cloud.set_setting(key, value);
            }
        }
        debug!(
            "Parsed PCD: {} points, {} properties",
            cloud.num_points(),
            cloud.num_properties()
        );
        Ok(cloud)
    }

    /// Save a point cloud as an ASCII PCD file
    pub fn save_pcd<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> Result<(), AssetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_pcd(cloud, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a point cloud as ASCII PCD text
    pub fn write_pcd<W: Write>(cloud: &PointCloud, writer: &mut W) -> Result<(), AssetError> {
        let names = cloud.property_names();
        let columns = 3 + names.len();
        let repeat = |token: &str| vec![token; columns].join(" ");

        writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
        writeln!(writer, "VERSION {}", cloud.setting("VERSION").unwrap_or(DEFAULT_VERSION))?;
        write!(writer, "FIELDS x y z")?;
        for name in names {
            write!(writer, " {name}")?;
        }
        writeln!(writer)?;
        writeln!(writer, "SIZE {}", repeat("8"))?;
        writeln!(writer, "TYPE {}", repeat("F"))?;
        writeln!(writer, "COUNT {}", repeat("1"))?;
        writeln!(writer, "WIDTH {}", cloud.num_points())?;
        writeln!(writer, "HEIGHT 1")?;
        writeln!(writer, "VIEWPOINT {}", cloud.setting("VIEWPOINT").unwrap_or(DEFAULT_VIEWPOINT))?;
        writeln!(writer, "POINTS {}", cloud.num_points())?;
        writeln!(writer, "DATA ascii")?;

        for (index, p) in cloud.vertices().iter().enumerate() {
            write!(writer, "{} {} {}", p.x, p.y, p.z)?;
            for value in cloud.point_properties(index)? {
                write!(writer, " {value}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// Column layout described by a PCD header
struct Layout {
    fields: Vec<String>,
    xyz: [usize; 3],
    properties: Vec<usize>,
    points: Option<usize>,
}

impl Layout {
    fn from_header(header: &HashMap<String, String>) -> Result<Self, AssetError> {
        match header.get("DATA").map(String::as_str) {
            Some(data) if data.eq_ignore_ascii_case("ascii") => {}
            Some(other) => {
                return Err(AssetError::InvalidFormat(format!("unsupported DATA section '{other}'")));
            }
            None => return Err(AssetError::InvalidFormat("missing DATA line".to_string())),
        }

        let fields: Vec<String> = header
            .get("FIELDS")
            .ok_or_else(|| AssetError::InvalidFormat("missing FIELDS line".to_string()))?
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if let Some(counts) = header.get("COUNT") {
            if counts.split_whitespace().any(|count| count != "1") {
                return Err(AssetError::InvalidFormat("multi-valued fields are not supported".to_string()));
            }
        }

        let column = |name: &str| {
            fields
                .iter()
                .position(|field| field == name)
                .ok_or_else(|| AssetError::InvalidFormat(format!("missing field '{name}'")))
        };
        let xyz = [column("x")?, column("y")?, column("z")?];
        let properties = (0..fields.len()).filter(|i| !xyz.contains(i)).collect();

        let points = header
            .get("POINTS")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|_| AssetError::Parse(format!("invalid POINTS value '{value}'")))
            })
            .transpose()?;

        Ok(Self {
            fields,
            xyz,
            properties,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS intensity x y z
SIZE 4 4 4 4
TYPE F F F F
COUNT 1 1 1 1
WIDTH 2
HEIGHT 1
VIEWPOINT 1 2 3 1 0 0 0
POINTS 2
DATA ascii
0.5 1 2 3
0.75 -1 -2 -3
";

    #[test]
    fn test_fields_split_into_points_and_properties() {
        let cloud = PcdLoader::read_pcd(SAMPLE.as_bytes()).unwrap();
        assert_eq!(cloud.vertices(), &[Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, -2.0, -3.0)]);
        assert_eq!(cloud.property_names(), &["intensity".to_string()]);
        assert_eq!(cloud.properties(), &[0.5, 0.75]);
        assert_eq!(cloud.setting("VERSION"), Some("0.7"));
        assert_eq!(cloud.setting("VIEWPOINT"), Some("1 2 3 1 0 0 0"));
    }

    #[test]
    fn test_written_text_reads_back() {
        let mut cloud = PcdLoader::read_pcd(SAMPLE.as_bytes()).unwrap();
        cloud.add_property_with_values("label", &[3.0, 4.0]).unwrap();

        let mut bytes = Vec::new();
        PcdLoader::write_pcd(&cloud, &mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("FIELDS x y z intensity label\n"));
        assert!(text.contains("VIEWPOINT 1 2 3 1 0 0 0\n"));

        let restored = PcdLoader::read_pcd(text.as_bytes()).unwrap();
        assert_eq!(restored, cloud);
    }

    #[test]
    fn test_binary_and_malformed_files_are_rejected() {
        let binary = SAMPLE.replace("DATA ascii", "DATA binary");
        assert!(matches!(PcdLoader::read_pcd(binary.as_bytes()), Err(AssetError::InvalidFormat(_))));

        let no_z = SAMPLE.replace("FIELDS intensity x y z", "FIELDS intensity x y w");
        assert!(matches!(PcdLoader::read_pcd(no_z.as_bytes()), Err(AssetError::InvalidFormat(_))));

        let short_row = SAMPLE.replace("0.75 -1 -2 -3", "0.75 -1 -2");
        assert!(matches!(PcdLoader::read_pcd(short_row.as_bytes()), Err(AssetError::InvalidFormat(_))));

        let truncated = "VERSION 0.7\nFIELDS x y z\n";
        assert!(matches!(PcdLoader::read_pcd(truncated.as_bytes()), Err(AssetError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_cloud_writes_header_only() {
        let mut bytes = Vec::new();
        PcdLoader::write_pcd(&PointCloud::new(), &mut bytes).unwrap();
        let restored = PcdLoader::read_pcd(bytes.as_slice()).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.num_properties(), 0);
        assert_eq!(restored.setting("VERSION"), Some(DEFAULT_VERSION));
    }
}
