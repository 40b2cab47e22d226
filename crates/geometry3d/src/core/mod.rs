//! Core crate configuration

pub mod config;

pub use config::GeometryConfig;
