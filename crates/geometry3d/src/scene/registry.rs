//! Geometry registry implementation

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::geometry::{Geometry3D, GeometryData};

/// Geometry state shared between a registry and its reference handles
pub type SharedGeometry = Rc<RefCell<GeometryData>>;

/// Opaque identifier of a registry-owned geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey {
    /// Owning container (world) identifier
    pub container: u32,
    /// Element identifier within the container
    pub element: u32,
}

impl ElementKey {
    /// Create a key from its two parts
    pub fn new(container: u32, element: u32) -> Self {
        Self { container, element }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.container, self.element)
    }
}

/// External owner that resolves keys to shared geometry state.
///
/// The returned state must stay valid for as long as a handle holds it;
/// sharing through [`Rc`] guarantees that even if the registry drops its
/// own entry.
pub trait GeometryRegistry {
    /// Look up the geometry stored under `key`
    fn resolve(&self, key: ElementKey) -> Option<SharedGeometry>;
}

/// In-crate registry owning geometry for one container
#[derive(Debug)]
pub struct GeometryWorld {
    container: u32,
    next_element_id: u32,
    elements: HashMap<u32, SharedGeometry>,
}

impl GeometryWorld {
    /// Create an empty world with the given container identifier
    pub fn new(container: u32) -> Self {
        Self {
            container,
            next_element_id: 0,
            elements: HashMap::new(),
        }
    }

    /// Container identifier used in every key this world hands out
    pub fn container(&self) -> u32 {
        self.container
    }

    /// Take ownership of a deep copy of `geometry` and return its key
    pub fn insert(&mut self, geometry: &Geometry3D) -> ElementKey {
        let key = ElementKey::new(self.container, self.next_element_id);
        self.next_element_id += 1;
        self.elements
            .insert(key.element, Rc::new(RefCell::new(geometry.to_data())));
        debug!("Inserted {} geometry as {key}", geometry.type_name());
        key
    }

    /// Drop the world's entry for `key`. Handles already aliasing it keep
    /// the state alive.
    pub fn remove(&mut self, key: ElementKey) -> Option<SharedGeometry> {
        if key.container != self.container {
            return None;
        }
        self.elements.remove(&key.element)
    }

    /// Number of stored geometries
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the world stores nothing
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Keys of every stored geometry, in insertion order
    pub fn keys(&self) -> Vec<ElementKey> {
        let mut ids: Vec<u32> = self.elements.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|element| ElementKey::new(self.container, element))
            .collect()
    }
}

impl Default for GeometryWorld {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GeometryRegistry for GeometryWorld {
    fn resolve(&self, key: ElementKey) -> Option<SharedGeometry> {
        if key.container != self.container {
            return None;
        }
        self.elements.get(&key.element).cloned()
    }
}
