//! Geometry inspection tool
//!
//! Loads one or more geometry files and reports their type, bounding boxes
//! and pairwise proximity.
//!
//! ```text
//! geom_inspect [--config <file.toml|file.ron>] [--margin <m>] <file>...
//! ```

use std::path::PathBuf;
use std::result::Result;

use geometry3d::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
enum InspectError {
    #[error("usage: geom_inspect [--config <file>] [--margin <m>] <file>...")]
    Usage,
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid margin '{0}'")]
    InvalidMargin(String),
    #[error("failed to read config: {0}")]
    Config(#[from] geometry3d::config::ConfigError),
    #[error("failed to load {0}")]
    Load(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

struct Options {
    config: Option<PathBuf>,
    margin: f64,
    files: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, InspectError> {
    let mut options = Options {
        config: None,
        margin: 0.0,
        files: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or(InspectError::MissingValue("--config"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--margin" => {
                let value = args.next().ok_or(InspectError::MissingValue("--margin"))?;
                options.margin = value.parse().map_err(|_| InspectError::InvalidMargin(value))?;
            }
            "-h" | "--help" => return Err(InspectError::Usage),
            _ => options.files.push(PathBuf::from(arg)),
        }
    }
    if options.files.is_empty() {
        return Err(InspectError::Usage);
    }
    Ok(options)
}

fn format_box(bounds: &AABB) -> String {
    if bounds.is_empty() {
        "empty".to_string()
    } else {
        format!(
            "[{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}]",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        )
    }
}

fn run() -> Result<(), InspectError> {
    let options = parse_args(std::env::args().skip(1))?;
    let config = match &options.config {
        Some(path) => GeometryConfig::load_from_file(path)?,
        None => GeometryConfig::default(),
    };

    let mut geometries = Vec::with_capacity(options.files.len());
    for path in &options.files {
        let mut geometry = Geometry3D::new();
        geometry.set_config(config.clone());
        if !geometry.load_file(path) {
            return Err(InspectError::Load(path.display().to_string()));
        }
        geometry.set_collision_margin(options.margin)?;
        geometries.push(geometry);
    }

    for (path, geometry) in options.files.iter().zip(&geometries) {
        println!("{}", path.display());
        println!("  type:       {}", geometry.geometry_type());
        if let Ok(count) = geometry.num_elements() {
            println!("  elements:   {count}");
        }
        println!("  bounds:     {}", format_box(&geometry.bounding_box()));
        println!("  tight:      {}", format_box(&geometry.bounding_box_tight()));
    }

    for (i, a) in geometries.iter().enumerate() {
        for (j, b) in geometries.iter().enumerate().skip(i + 1) {
            log::debug!("Comparing {} with {}", options.files[i].display(), options.files[j].display());
            println!(
                "{} <-> {}: distance {:.6}, collides {}",
                options.files[i].display(),
                options.files[j].display(),
                a.distance(b),
                a.collides(b)
            );
        }
    }
    Ok(())
}

fn main() {
    geometry3d::foundation::logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
