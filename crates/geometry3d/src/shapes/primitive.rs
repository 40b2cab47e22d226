//! Geometric primitives
//!
//! A primitive is a kind tag plus a flat parameter list whose length and
//! meaning are fixed by the kind:
//!
//! | kind        | parameters                                   |
//! |-------------|----------------------------------------------|
//! | `Point`     | `x y z`                                      |
//! | `Sphere`    | `cx cy cz r`                                 |
//! | `Segment`   | `ax ay az bx by bz`                          |
//! | `AABB`      | `minx miny minz maxx maxy maxz`              |
//! | `Box`       | `cx cy cz` + 3x3 half-axis matrix, row-major |
//! | `Ellipsoid` | `cx cy cz` + 3x3 axis matrix, row-major      |
//!
//! `Box` and `Ellipsoid` are the images of `AABB` and `Sphere` under general
//! linear maps, so permanent transforms never leave the kind set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::foundation::math::utils::{is_diagonal, mat3_at, max_vec, min_vec, similarity_scale, vec3_at};
use crate::foundation::math::{Mat3, Vec3};

/// Primitive kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// A single point
    Point,
    /// A solid sphere
    Sphere,
    /// A line segment
    Segment,
    /// An axis-aligned box
    Aabb,
    /// A parallelepiped given by center and half-axis columns
    Box,
    /// A solid ellipsoid given by center and axis columns
    Ellipsoid,
}

impl PrimitiveKind {
    /// All kinds, in canonical order
    pub const ALL: [PrimitiveKind; 6] = [
        PrimitiveKind::Point,
        PrimitiveKind::Sphere,
        PrimitiveKind::Segment,
        PrimitiveKind::Aabb,
        PrimitiveKind::Box,
        PrimitiveKind::Ellipsoid,
    ];

    /// Number of parameters required by this kind
    pub fn arity(self) -> usize {
        match self {
            Self::Point => 3,
            Self::Sphere => 4,
            Self::Segment | Self::Aabb => 6,
            Self::Box | Self::Ellipsoid => 12,
        }
    }

    /// Canonical name used by the string form
    pub fn name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Sphere => "Sphere",
            Self::Segment => "Segment",
            Self::Aabb => "AABB",
            Self::Box => "Box",
            Self::Ellipsoid => "Ellipsoid",
        }
    }

    /// Parse a kind name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed view of a primitive's parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveGeometry {
    /// A single point
    Point(Vec3),
    /// Center and radius
    Sphere {
        /// Sphere center
        center: Vec3,
        /// Sphere radius
        radius: f64,
    },
    /// Segment endpoints
    Segment(Vec3, Vec3),
    /// Box corners
    Aabb {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
    },
    /// Parallelepiped `{center + axes·u : |u_i| <= 1}`
    Box {
        /// Box center
        center: Vec3,
        /// Half-axis columns
        axes: Mat3,
    },
    /// Ellipsoid `{center + axes·u : |u| <= 1}`
    Ellipsoid {
        /// Ellipsoid center
        center: Vec3,
        /// Axis columns
        axes: Mat3,
    },
}

/// A geometric primitive: kind plus parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PrimitiveRecord", into = "PrimitiveRecord")]
pub struct Primitive {
    kind: PrimitiveKind,
    parameters: Vec<f64>,
}

/// Unvalidated serde form of a [`Primitive`]
#[derive(Serialize, Deserialize)]
struct PrimitiveRecord {
    kind: PrimitiveKind,
    parameters: Vec<f64>,
}

impl TryFrom<PrimitiveRecord> for Primitive {
    type Error = GeometryError;

    fn try_from(record: PrimitiveRecord) -> Result<Self> {
        Primitive::new(record.kind, record.parameters)
    }
}

impl From<Primitive> for PrimitiveRecord {
    fn from(primitive: Primitive) -> Self {
        Self {
            kind: primitive.kind,
            parameters: primitive.parameters,
        }
    }
}

impl Default for Primitive {
    fn default() -> Self {
        Self::point(Vec3::zeros())
    }
}

impl Primitive {
    /// Create a primitive, validating the parameter list against the kind
    pub fn new(kind: PrimitiveKind, parameters: Vec<f64>) -> Result<Self> {
        validate(kind, &parameters)?;
        Ok(Self { kind, parameters })
    }

    /// A point primitive
    pub fn point(p: Vec3) -> Self {
        Self {
            kind: PrimitiveKind::Point,
            parameters: vec![p.x, p.y, p.z],
        }
    }

    /// A sphere primitive; a negative radius is clamped to zero
    pub fn sphere(center: Vec3, radius: f64) -> Self {
        Self {
            kind: PrimitiveKind::Sphere,
            parameters: vec![center.x, center.y, center.z, radius.max(0.0)],
        }
    }

    /// A segment primitive
    pub fn segment(a: Vec3, b: Vec3) -> Self {
        Self {
            kind: PrimitiveKind::Segment,
            parameters: vec![a.x, a.y, a.z, b.x, b.y, b.z],
        }
    }

    /// An axis-aligned box; corners are reordered so that `min <= max`
    pub fn aabb(min: Vec3, max: Vec3) -> Self {
        let lo = min_vec(&min, &max);
        let hi = max_vec(&min, &max);
        Self {
            kind: PrimitiveKind::Aabb,
            parameters: vec![lo.x, lo.y, lo.z, hi.x, hi.y, hi.z],
        }
    }

    /// A parallelepiped with the given center and half-axis columns
    pub fn oriented_box(center: Vec3, axes: Mat3) -> Self {
        Self::with_axes(PrimitiveKind::Box, center, &axes)
    }

    /// An ellipsoid with the given center and axis columns
    pub fn ellipsoid(center: Vec3, axes: Mat3) -> Self {
        Self::with_axes(PrimitiveKind::Ellipsoid, center, &axes)
    }

    fn with_axes(kind: PrimitiveKind, center: Vec3, axes: &Mat3) -> Self {
        let mut parameters = vec![center.x, center.y, center.z];
        for i in 0..3 {
            for j in 0..3 {
                parameters.push(axes[(i, j)]);
            }
        }
        Self { kind, parameters }
    }

    /// Replace this primitive with a point
    pub fn set_point(&mut self, p: Vec3) {
        *self = Self::point(p);
    }

    /// Replace this primitive with a sphere
    pub fn set_sphere(&mut self, center: Vec3, radius: f64) {
        *self = Self::sphere(center, radius);
    }

    /// Replace this primitive with a segment
    pub fn set_segment(&mut self, a: Vec3, b: Vec3) {
        *self = Self::segment(a, b);
    }

    /// Replace this primitive with an axis-aligned box
    pub fn set_aabb(&mut self, min: Vec3, max: Vec3) {
        *self = Self::aabb(min, max);
    }

    /// Primitive kind
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// Raw parameter list
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Typed view of the parameters
    pub fn geometry(&self) -> PrimitiveGeometry {
        let p = &self.parameters;
        match self.kind {
            PrimitiveKind::Point => PrimitiveGeometry::Point(vec3_at(p, 0)),
            PrimitiveKind::Sphere => PrimitiveGeometry::Sphere {
                center: vec3_at(p, 0),
                radius: p[3],
            },
            PrimitiveKind::Segment => PrimitiveGeometry::Segment(vec3_at(p, 0), vec3_at(p, 3)),
            PrimitiveKind::Aabb => PrimitiveGeometry::Aabb {
                min: vec3_at(p, 0),
                max: vec3_at(p, 3),
            },
            PrimitiveKind::Box => PrimitiveGeometry::Box {
                center: vec3_at(p, 0),
                axes: mat3_at(p, 3),
            },
            PrimitiveKind::Ellipsoid => PrimitiveGeometry::Ellipsoid {
                center: vec3_at(p, 0),
                axes: mat3_at(p, 3),
            },
        }
    }

    /// Canonical string form, e.g. `"Sphere 0 0 0 1"`
    pub fn save_string(&self) -> String {
        self.to_string()
    }

    /// Replace this primitive with one parsed from the canonical string form.
    /// On error the primitive is left unchanged.
    pub fn load_string(&mut self, s: &str) -> Result<()> {
        *self = s.parse()?;
        Ok(())
    }

    /// Translates the primitive by `t`
    pub fn translate(&mut self, t: &Vec3) {
        self.transform(&Mat3::identity(), t);
    }

    /// Applies `v' = m·v + t` to the primitive.
    ///
    /// Spheres under a non-similarity become ellipsoids and axis-aligned boxes
    /// under a non-diagonal map become oriented boxes.
    pub fn transform(&mut self, m: &Mat3, t: &Vec3) {
        let map = |v: Vec3| m * v + t;
        *self = match self.geometry() {
            PrimitiveGeometry::Point(p) => Self::point(map(p)),
            PrimitiveGeometry::Segment(a, b) => Self::segment(map(a), map(b)),
            PrimitiveGeometry::Sphere { center, radius } => match similarity_scale(m) {
                Some(scale) => Self::sphere(map(center), radius * scale),
                None => Self::ellipsoid(map(center), m * radius),
            },
            PrimitiveGeometry::Aabb { min, max } => {
                if is_diagonal(m) {
                    Self::aabb(map(min), map(max))
                } else {
                    let half = Mat3::from_diagonal(&((max - min) * 0.5));
                    Self::oriented_box(map((min + max) * 0.5), m * half)
                }
            }
            PrimitiveGeometry::Box { center, axes } => Self::oriented_box(map(center), m * axes),
            PrimitiveGeometry::Ellipsoid { center, axes } => Self::ellipsoid(map(center), m * axes),
        };
    }
}

fn validate(kind: PrimitiveKind, parameters: &[f64]) -> Result<()> {
    if parameters.len() != kind.arity() {
        return Err(GeometryError::InvalidPrimitive(format!(
            "{} requires {} parameters, got {}",
            kind,
            kind.arity(),
            parameters.len()
        )));
    }
    if parameters.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::InvalidPrimitive(format!("{kind} parameters must be finite")));
    }
    match kind {
        PrimitiveKind::Sphere if parameters[3] < 0.0 => Err(GeometryError::InvalidPrimitive(format!(
            "sphere radius must be non-negative, got {}",
            parameters[3]
        ))),
        PrimitiveKind::Aabb if (0..3).any(|i| parameters[i] > parameters[i + 3]) => Err(
            GeometryError::InvalidPrimitive("AABB minimum exceeds maximum".to_string()),
        ),
        _ => Ok(()),
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for value in &self.parameters {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

impl FromStr for Primitive {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| GeometryError::InvalidPrimitive("empty primitive string".to_string()))?;
        let kind = PrimitiveKind::from_name(name)
            .ok_or_else(|| GeometryError::InvalidPrimitive(format!("unknown primitive kind '{name}'")))?;
        let parameters = tokens
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| GeometryError::InvalidPrimitive(format!("invalid number '{token}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Primitive::new(kind, parameters)
    }
}
