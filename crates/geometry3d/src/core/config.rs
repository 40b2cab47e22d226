//! # Geometry Configuration
//!
//! Tuning knobs for the acceleration structures and the iterative proximity
//! algorithms. A configuration is stored per geometry handle; there is no
//! process-wide setting.
//!
//! Configurations load from TOML or RON through the [`Config`] trait:
//!
//! ```toml
//! gjk_max_iterations = 64
//! ray_march_max_steps = 256
//! ray_epsilon = 1e-9
//!
//! [octree]
//! max_items_per_node = 8
//! max_depth = 8
//! min_node_size = 1e-6
//! ```

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::spatial::OctreeConfig;

/// # Geometry Configuration
///
/// Controls how lazily-built acceleration structures are laid out and when
/// the iterative distance and ray-marching loops give up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Octree layout for meshes and point clouds
    pub octree: OctreeConfig,
    /// Maximum GJK iterations per convex pair
    pub gjk_max_iterations: u32,
    /// Maximum conservative-advancement steps for inflated ray casts
    pub ray_march_max_steps: u32,
    /// Distance at which a marching ray counts as touching the surface
    pub ray_epsilon: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            octree: OctreeConfig::default(),
            gjk_max_iterations: 64,
            ray_march_max_steps: 256,
            ray_epsilon: 1e-9,
        }
    }
}

impl GeometryConfig {
    /// Set the octree layout
    pub fn with_octree(mut self, octree: OctreeConfig) -> Self {
        self.octree = octree;
        self
    }

    /// Set the GJK iteration limit
    pub fn with_gjk_max_iterations(mut self, iterations: u32) -> Self {
        self.gjk_max_iterations = iterations;
        self
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.octree.max_items_per_node == 0 {
            return Err("octree.max_items_per_node must be at least 1".to_string());
        }
        if self.gjk_max_iterations == 0 {
            return Err("gjk_max_iterations must be at least 1".to_string());
        }
        if !(self.ray_epsilon > 0.0) {
            return Err(format!("ray_epsilon must be positive, got {}", self.ray_epsilon));
        }
        Ok(())
    }
}

impl Config for GeometryConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GeometryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GeometryConfig = toml::from_str("gjk_max_iterations = 12\n").unwrap();
        assert_eq!(config.gjk_max_iterations, 12);
        assert_eq!(config.octree, OctreeConfig::default());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = GeometryConfig::default().with_gjk_max_iterations(32);
        for name in ["geometry3d_config_test.toml", "geometry3d_config_test.ron"] {
            let path = std::env::temp_dir().join(name);
            config.save_to_file(&path).unwrap();
            let loaded = GeometryConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
            let _ = std::fs::remove_file(&path);
        }
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = GeometryConfig::default().save_to_file(std::env::temp_dir().join("config.yaml"));
        assert!(matches!(result, Err(crate::config::ConfigError::UnsupportedFormat(_))));
    }
}
