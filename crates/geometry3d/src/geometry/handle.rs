//! The unified geometry handle
//!
//! A [`Geometry3D`] either owns its state (standalone) or aliases state owned
//! by a [`GeometryRegistry`] (reference). Both kinds expose the same API:
//! shape access, group composition, current pose, permanent transforms,
//! collision margin and proximity queries.

use std::cell::{Ref, RefMut};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::assets;
use crate::core::GeometryConfig;
use crate::error::{GeometryError, Result};
use crate::foundation::math::{Mat3, RigidTransform, Vec3};
use crate::geometry::data::GeometryData;
use crate::geometry::proximity;
use crate::geometry::variant::{GeometryType, ShapeVariant};
use crate::physics::QuerySettings;
use crate::scene::{ElementKey, GeometryRegistry, SharedGeometry};
use crate::shapes::{PointCloud, Primitive, TriangleMesh};
use crate::spatial::AABB;

#[derive(Debug)]
enum Storage {
    Standalone(Box<GeometryData>),
    Reference { key: ElementKey, data: SharedGeometry },
}

/// Read access to handle state
pub(crate) enum DataRef<'a> {
    Owned(&'a GeometryData),
    Shared(Ref<'a, GeometryData>),
}

impl Deref for DataRef<'_> {
    type Target = GeometryData;

    fn deref(&self) -> &GeometryData {
        match self {
            DataRef::Owned(data) => data,
            DataRef::Shared(data) => data,
        }
    }
}

/// Write access to handle state
pub(crate) enum DataMut<'a> {
    Owned(&'a mut GeometryData),
    Shared(RefMut<'a, GeometryData>),
}

impl Deref for DataMut<'_> {
    type Target = GeometryData;

    fn deref(&self) -> &GeometryData {
        match self {
            DataMut::Owned(data) => data,
            DataMut::Shared(data) => data,
        }
    }
}

impl DerefMut for DataMut<'_> {
    fn deref_mut(&mut self) -> &mut GeometryData {
        match self {
            DataMut::Owned(data) => data,
            DataMut::Shared(data) => data,
        }
    }
}

/// A geometry of any kind with a current pose and a collision margin.
///
/// # Ownership
///
/// `Clone` follows copy-construction: cloning a reference handle yields
/// another alias of the same registry state, cloning a standalone handle
/// deep-copies it. [`Geometry3D::deep_clone`] always produces an
/// independent standalone copy.
///
/// # Transforms
///
/// The current pose ([`Geometry3D::set_current_transform`]) only places the
/// geometry for queries. Permanent transforms ([`Geometry3D::transform`] and
/// friends) rewrite the local data and leave the pose alone.
#[derive(Debug)]
pub struct Geometry3D {
    storage: Storage,
}

impl Default for Geometry3D {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Geometry3D {
    fn clone(&self) -> Self {
        match &self.storage {
            Storage::Standalone(data) => Self::standalone((**data).clone()),
            Storage::Reference { key, data } => Self {
                storage: Storage::Reference {
                    key: *key,
                    data: data.clone(),
                },
            },
        }
    }
}

impl PartialEq for Geometry3D {
    fn eq(&self, other: &Self) -> bool {
        *self.data() == *other.data()
    }
}

impl From<ShapeVariant> for Geometry3D {
    fn from(shape: ShapeVariant) -> Self {
        Self::standalone(GeometryData::from_shape(shape))
    }
}

impl From<Primitive> for Geometry3D {
    fn from(primitive: Primitive) -> Self {
        ShapeVariant::Primitive(primitive).into()
    }
}

impl From<TriangleMesh> for Geometry3D {
    fn from(mesh: TriangleMesh) -> Self {
        ShapeVariant::TriangleMesh(mesh).into()
    }
}

impl From<PointCloud> for Geometry3D {
    fn from(cloud: PointCloud) -> Self {
        ShapeVariant::PointCloud(cloud).into()
    }
}

impl Geometry3D {
    /// Creates an untyped standalone handle
    pub fn new() -> Self {
        Self::standalone(GeometryData::default())
    }

    fn standalone(data: GeometryData) -> Self {
        Self {
            storage: Storage::Standalone(Box::new(data)),
        }
    }

    /// Creates a handle aliasing the registry state stored under `key`
    pub fn reference<R>(registry: &R, key: ElementKey) -> Result<Self>
    where
        R: GeometryRegistry + ?Sized,
    {
        let data = registry
            .resolve(key)
            .ok_or(GeometryError::UnresolvedReference(key))?;
        Ok(Self {
            storage: Storage::Reference { key, data },
        })
    }

    /// Registry key of a reference handle
    pub fn element_key(&self) -> Option<ElementKey> {
        match &self.storage {
            Storage::Standalone(_) => None,
            Storage::Reference { key, .. } => Some(*key),
        }
    }

    /// True if the handle owns its state
    pub fn is_standalone(&self) -> bool {
        matches!(self.storage, Storage::Standalone(_))
    }

    pub(crate) fn data(&self) -> DataRef<'_> {
        match &self.storage {
            Storage::Standalone(data) => DataRef::Owned(data),
            Storage::Reference { data, .. } => DataRef::Shared(data.borrow()),
        }
    }

    pub(crate) fn data_mut(&mut self) -> DataMut<'_> {
        match &mut self.storage {
            Storage::Standalone(data) => DataMut::Owned(data),
            Storage::Reference { data, .. } => DataMut::Shared(data.borrow_mut()),
        }
    }

    /// Deep copy of the handle state
    pub(crate) fn to_data(&self) -> GeometryData {
        self.data().clone()
    }

    /// Independent standalone copy, whatever the ownership of `self`
    pub fn deep_clone(&self) -> Self {
        Self::standalone(self.to_data())
    }

    /// Replaces shape, pose, margin and config with copies of `other`'s
    pub fn set(&mut self, other: &Geometry3D) {
        // Copy first: `other` may alias the same registry state
        let copy = other.to_data();
        *self.data_mut() = copy;
    }

    /// Releases the content of a standalone handle, leaving it untyped
    pub fn free(&mut self) -> Result<()> {
        if !self.is_standalone() {
            return Err(self.mismatch("free"));
        }
        self.data_mut().clear();
        Ok(())
    }

    /// Kind of the held shape
    pub fn geometry_type(&self) -> GeometryType {
        self.data().geometry_type()
    }

    /// Type discriminator string; `""` for untyped handles
    pub fn type_name(&self) -> &'static str {
        self.geometry_type().name()
    }

    /// True if the handle holds no elements. Untyped handles are empty.
    pub fn is_empty(&self) -> bool {
        self.data().shape().map_or(true, ShapeVariant::is_empty)
    }

    fn mismatch(&self, operation: &'static str) -> GeometryError {
        let found = if self.is_standalone() {
            self.geometry_type().to_string()
        } else {
            format!("reference {}", self.geometry_type())
        };
        GeometryError::TypeMismatch { operation, found }
    }

    /// Copy of the held shape, if any
    pub fn shape(&self) -> Option<ShapeVariant> {
        self.data().shape().cloned()
    }

    /// Replaces the held shape
    pub fn set_shape(&mut self, shape: ShapeVariant) {
        self.data_mut().set_shape(Some(shape));
    }

    /// Copy of the primitive
    pub fn primitive(&self) -> Result<Primitive> {
        match self.data().shape() {
            Some(ShapeVariant::Primitive(primitive)) => Ok(primitive.clone()),
            _ => Err(self.mismatch("primitive")),
        }
    }

    /// Copy of the triangle mesh
    pub fn triangle_mesh(&self) -> Result<TriangleMesh> {
        match self.data().shape() {
            Some(ShapeVariant::TriangleMesh(mesh)) => Ok(mesh.clone()),
            _ => Err(self.mismatch("triangle_mesh")),
        }
    }

    /// Copy of the point cloud
    pub fn point_cloud(&self) -> Result<PointCloud> {
        match self.data().shape() {
            Some(ShapeVariant::PointCloud(cloud)) => Ok(cloud.clone()),
            _ => Err(self.mismatch("point_cloud")),
        }
    }

    /// Replaces the content with a primitive
    pub fn set_primitive(&mut self, primitive: Primitive) {
        self.set_shape(primitive.into());
    }

    /// Replaces the content with a triangle mesh
    pub fn set_triangle_mesh(&mut self, mesh: TriangleMesh) {
        self.set_shape(mesh.into());
    }

    /// Replaces the content with a point cloud
    pub fn set_point_cloud(&mut self, cloud: PointCloud) {
        self.set_shape(cloud.into());
    }

    /// Converts the content into an empty group
    pub fn set_group(&mut self) -> Result<()> {
        if !self.is_standalone() {
            return Err(self.mismatch("set_group"));
        }
        self.set_shape(ShapeVariant::Group(Vec::new()));
        Ok(())
    }

    /// Number of group members
    pub fn num_elements(&self) -> Result<usize> {
        match self.data().shape() {
            Some(ShapeVariant::Group(members)) => Ok(members.len()),
            _ => Err(self.mismatch("num_elements")),
        }
    }

    /// Copy of group member `index`, with its own pose and margin
    pub fn element(&self, index: usize) -> Result<Geometry3D> {
        match self.data().shape() {
            Some(ShapeVariant::Group(members)) => members
                .get(index)
                .map(Geometry3D::deep_clone)
                .ok_or_else(|| GeometryError::index(index, members.len())),
            _ => Err(self.mismatch("element")),
        }
    }

    /// Replaces group member `index` with a standalone copy of `element`;
    /// `index == num_elements()` appends
    pub fn set_element(&mut self, index: usize, element: &Geometry3D) -> Result<()> {
        let mut copy = element.deep_clone();
        let config = self.data().config.clone();
        copy.data_mut().set_config(&config);

        if !matches!(self.data().shape(), Some(ShapeVariant::Group(_))) {
            return Err(self.mismatch("set_element"));
        }
        let mut data = self.data_mut();
        let Some(ShapeVariant::Group(members)) = data.shape_mut() else {
            return Ok(());
        };
        let len = members.len();
        match index {
            i if i < len => members[i] = copy,
            i if i == len => members.push(copy),
            _ => return Err(GeometryError::index(index, len)),
        }
        Ok(())
    }

    /// Loads the shape from a file, choosing the format by extension.
    /// Returns false (and logs why) on failure, leaving the handle unchanged.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match assets::load_shape(path) {
            Ok(shape) => {
                info!("Loaded {} geometry from {}", shape.geometry_type(), path.display());
                self.set_shape(shape);
                true
            }
            Err(e) => {
                warn!("Failed to load geometry from {}: {e}", path.display());
                false
            }
        }
    }

    /// Saves the shape to a file, choosing the format by extension.
    /// Returns false (and logs why) on failure.
    pub fn save_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let data = self.data();
        let Some(shape) = data.shape() else {
            warn!("Cannot save untyped geometry to {}", path.display());
            return false;
        };
        match assets::save_shape(shape, path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save geometry to {}: {e}", path.display());
                false
            }
        }
    }

    /// Replaces the current pose. Local data and cached collision data are
    /// untouched.
    ///
    /// `rotation` must be orthonormal with determinant +1; queries treat the
    /// pose as rigid. A scaled or reflected matrix is stored as given and
    /// logged as a warning.
    pub fn set_current_transform(&mut self, rotation: Mat3, translation: Vec3) {
        let pose = RigidTransform::new(rotation, translation);
        if !pose.is_rigid() {
            warn!("Current transform rotation is not orthonormal; query results assume a rigid pose");
        }
        self.data_mut().pose = pose;
    }

    /// Current pose
    pub fn current_transform(&self) -> RigidTransform {
        self.data().pose
    }

    /// Permanently translates the local data
    pub fn translate(&mut self, t: &Vec3) {
        self.transform(&Mat3::identity(), t);
    }

    /// Permanently scales the local data uniformly
    pub fn scale(&mut self, s: f64) {
        self.scale_xyz(s, s, s);
    }

    /// Permanently scales the local data by `(sx·x, sy·y, sz·z)`
    pub fn scale_xyz(&mut self, sx: f64, sy: f64, sz: f64) {
        self.transform(&Mat3::from_diagonal(&Vec3::new(sx, sy, sz)), &Vec3::zeros());
    }

    /// Permanently rotates the local data
    pub fn rotate(&mut self, r: &Mat3) {
        self.transform(r, &Vec3::zeros());
    }

    /// Permanently applies `v' = m·v + t` to the local data (recursing into
    /// group members)
    pub fn transform(&mut self, m: &Mat3, t: &Vec3) {
        self.data_mut().transform(m, t);
    }

    /// Sets the collision margin; must be finite and non-negative
    pub fn set_collision_margin(&mut self, margin: f64) -> Result<()> {
        if !(margin >= 0.0) || margin.is_infinite() {
            return Err(GeometryError::InvalidMargin(margin));
        }
        self.data_mut().margin = margin;
        Ok(())
    }

    /// Collision margin (default 0)
    pub fn collision_margin(&self) -> f64 {
        self.data().margin
    }

    /// Sets query tuning for this handle and its group members
    pub fn set_config(&mut self, config: GeometryConfig) {
        self.data_mut().set_config(&config);
    }

    /// Query tuning of this handle
    pub fn config(&self) -> GeometryConfig {
        self.data().config.clone()
    }

    fn query_settings(&self) -> QuerySettings {
        QuerySettings::from_config(&self.data().config)
    }

    /// World-space bounding box from cached local bounds (may be loose
    /// under rotation). Empty geometry gives [`AABB::empty`].
    pub fn bounding_box(&self) -> AABB {
        proximity::bounding_box(&self.data())
    }

    /// Tight world-space bounding box, scanning every element
    pub fn bounding_box_tight(&self) -> AABB {
        proximity::bounding_box_tight(&self.data())
    }

    /// True if the margin-inflated geometries touch or overlap
    pub fn collides(&self, other: &Geometry3D) -> bool {
        self.within_distance(other, 0.0)
    }

    /// True if the margin-inflated geometries are within `tolerance`
    pub fn within_distance(&self, other: &Geometry3D, tolerance: f64) -> bool {
        proximity::within_distance(&self.data(), &other.data(), tolerance, &self.query_settings())
    }

    /// Separation between the margin-inflated geometries (0 if they
    /// overlap, infinity if either is empty)
    pub fn distance(&self, other: &Geometry3D) -> f64 {
        self.distance_with_tolerance(other, 0.0, 0.0)
    }

    /// [`Geometry3D::distance`] with relative and absolute error bounds for
    /// the iterative convex solver
    pub fn distance_with_tolerance(&self, other: &Geometry3D, rel_err: f64, abs_err: f64) -> f64 {
        let settings = self.query_settings().with_tolerances(rel_err, abs_err);
        proximity::distance(&self.data(), &other.data(), &settings)
    }

    /// Nearest world point on the margin-inflated geometry; a point inside
    /// is returned unchanged. None for untyped or empty geometry.
    pub fn closest_point(&self, point: &Vec3) -> Option<Vec3> {
        proximity::closest_point(&self.data(), point, &self.query_settings())
    }

    /// First hit of a ray on the margin-inflated geometry. `direction` need
    /// not be unit length; a ray starting inside hits at its origin.
    pub fn ray_cast(&self, origin: &Vec3, direction: &Vec3) -> Option<Vec3> {
        proximity::ray_cast(&self.data(), origin, direction, &self.query_settings())
    }
}

/// Serialized form of a handle: shape, pose and margin
#[derive(Serialize)]
struct GeometryRecordRef<'a> {
    shape: Option<&'a ShapeVariant>,
    pose: &'a RigidTransform,
    margin: f64,
}

#[derive(Deserialize)]
struct GeometryRecord {
    shape: Option<ShapeVariant>,
    #[serde(default)]
    pose: RigidTransform,
    #[serde(default)]
    margin: f64,
}

impl Serialize for Geometry3D {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = self.data();
        GeometryRecordRef {
            shape: data.shape(),
            pose: &data.pose,
            margin: data.margin,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Geometry3D {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let record = GeometryRecord::deserialize(deserializer)?;
        if !(record.margin >= 0.0) || record.margin.is_infinite() {
            return Err(serde::de::Error::custom(GeometryError::InvalidMargin(record.margin)));
        }
        let mut geometry = Geometry3D::new();
        {
            let mut data = geometry.data_mut();
            data.set_shape(record.shape);
            data.pose = record.pose;
            data.margin = record.margin;
        }
        Ok(geometry)
    }
}
