//! Octree spatial partitioning structure
//!
//! Divides the local frame of a geometry into hierarchical regions for fast
//! proximity queries. Each item is an element index with a bounding sphere;
//! items are filed by sphere center and a node subdivides into 8 octants when
//! its item count exceeds a threshold.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::spatial::AABB;

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum items per node before subdivision
    pub max_items_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node half-size (prevents excessive subdivision)
    pub min_node_size: f64,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_items_per_node: 8,
            max_depth: 8,
            min_node_size: 1e-6,
        }
    }
}

/// Element stored in the octree: index plus bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeItem {
    /// Index of the element in the owning geometry
    pub index: usize,
    /// Bounding sphere center
    pub center: Vec3,
    /// Bounding sphere radius
    pub radius: f64,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// Local-frame bounds of this node
    pub bounds: AABB,

    /// Items contained in this node (if leaf)
    pub items: Vec<OctreeItem>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            items: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Get the octant index (0-7) for a position within this node's bounds
    fn octant_index(&self, position: &Vec3) -> usize {
        let center = self.bounds.center();
        let x_bit = usize::from(position.x >= center.x);
        let y_bit = usize::from(position.y >= center.y);
        let z_bit = usize::from(position.z >= center.z);

        // Octant layout:
        // 0: -X, -Y, -Z    4: -X, -Y, +Z
        // 1: +X, -Y, -Z    5: +X, -Y, +Z
        // 2: -X, +Y, -Z    6: -X, +Y, +Z
        // 3: +X, +Y, -Z    7: +X, +Y, +Z
        (z_bit << 2) | (y_bit << 1) | x_bit
    }

    /// Subdivide this node into 8 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let (lo, mid, hi) = (self.bounds.min, self.bounds.center(), self.bounds.max);
        let depth = self.depth + 1;

        // Child corners are taken straight from the parent's min/center/max
        // so that siblings share faces exactly.
        let children: [OctreeNode; 8] = std::array::from_fn(|octant| {
            let pick = |bit: usize, axis: usize| {
                if octant & bit != 0 {
                    (mid[axis], hi[axis])
                } else {
                    (lo[axis], mid[axis])
                }
            };
            let (x0, x1) = pick(1, 0);
            let (y0, y1) = pick(2, 1);
            let (z0, z1) = pick(4, 2);
            OctreeNode::new(AABB::new(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1)), depth)
        });
        self.children = Some(Box::new(children));

        // Redistribute existing items to children
        let items_to_distribute = std::mem::take(&mut self.items);
        for item in items_to_distribute {
            let octant = self.octant_index(&item.center);
            if let Some(ref mut children) = self.children {
                children[octant].items.push(item);
            }
        }
    }

    /// Insert an item below this node; the item center must lie in the bounds
    pub fn insert(&mut self, item: OctreeItem, config: &OctreeConfig) {
        if self.is_leaf() {
            let extents = self.bounds.extents();
            let should_subdivide = self.items.len() >= config.max_items_per_node
                && self.depth < config.max_depth
                && extents.x.max(extents.y).max(extents.z) > config.min_node_size;

            if !should_subdivide {
                self.items.push(item);
                return;
            }
            self.subdivide();
        }

        let octant = self.octant_index(&item.center);
        if let Some(ref mut children) = self.children {
            children[octant].insert(item, config);
        }
    }

    /// Collect the indices of items whose inflated spheres a ray may touch
    pub fn query_ray(&self, ray_origin: &Vec3, ray_dir: &Vec3, expansion: f64, inflate: f64, results: &mut Vec<usize>) {
        // Expand by the largest item radius so items stored here but poking
        // out of the node are still found
        if self.bounds.inflated(expansion).intersect_ray(ray_origin, ray_dir).is_none() {
            return;
        }

        for item in &self.items {
            let sphere = AABB::from_center_extents(item.center, Vec3::repeat(item.radius + inflate));
            if sphere.intersect_ray(ray_origin, ray_dir).is_some() {
                results.push(item.index);
            }
        }

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_ray(ray_origin, ray_dir, expansion, inflate, results);
            }
        }
    }

    /// Best-first search for the item minimising `exact`, pruning with
    /// sphere lower bounds. See [`Octree::nearest_within`].
    fn nearest_within<F>(&self, query: &Vec3, search: &NearestSearch, found: &mut f64, exact: &mut F)
    where
        F: FnMut(&OctreeItem) -> f64,
    {
        let bound = |found: f64| found.min(search.cutoff);
        if *found <= search.stop_at {
            return;
        }
        let node_lower = self.bounds.distance_to_point(query) - search.max_item_radius - search.inflate;
        if node_lower > bound(*found) {
            return;
        }

        for item in &self.items {
            let lower = (item.center - query).magnitude() - item.radius - search.inflate;
            if lower > bound(*found) {
                continue;
            }
            *found = found.min(exact(item));
            if *found <= search.stop_at {
                return;
            }
        }

        if let Some(ref children) = self.children {
            // Visit nearer octants first so the bound tightens early
            let mut order: [(f64, usize); 8] = std::array::from_fn(|i| {
                (children[i].bounds.distance_to_point(query), i)
            });
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (_, i) in order {
                children[i].nearest_within(query, search, found, exact);
            }
        }
    }

    /// Get all leaf nodes
    pub fn get_all_leaves<'a>(&'a self, leaves: &mut Vec<&'a OctreeNode>) {
        if self.is_leaf() {
            leaves.push(self);
        } else if let Some(ref children) = self.children {
            for child in children.iter() {
                child.get_all_leaves(leaves);
            }
        }
    }

    /// Count total items in this node and all children
    pub fn count_items(&self) -> usize {
        let mut count = self.items.len();

        if let Some(ref children) = self.children {
            for child in children.iter() {
                count += child.count_items();
            }
        }

        count
    }
}

/// Parameters shared by one nearest-item traversal
struct NearestSearch {
    inflate: f64,
    cutoff: f64,
    stop_at: f64,
    max_item_radius: f64,
}

/// Octree over the elements of one geometry, in its local frame
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing every item center
    pub root: OctreeNode,

    /// Configuration
    config: OctreeConfig,

    /// Cached maximum item radius in the tree
    max_item_radius: f64,
}

impl Octree {
    /// Build an octree over the given items; the root bounds are the
    /// bounding box of the item centers
    pub fn build(items: impl IntoIterator<Item = OctreeItem>, config: OctreeConfig) -> Self {
        let items: Vec<OctreeItem> = items.into_iter().collect();
        let bounds = AABB::from_points(items.iter().map(|item| &item.center));
        let mut octree = Self {
            root: OctreeNode::new(bounds, 0),
            config,
            max_item_radius: 0.0,
        };
        for item in items {
            octree.insert(item);
        }
        octree
    }

    /// Insert an item into the octree
    fn insert(&mut self, item: OctreeItem) {
        // Update cached max radius if this item has a larger radius
        if item.radius > self.max_item_radius {
            self.max_item_radius = item.radius;
        }

        self.root.insert(item, &self.config);
    }

    /// Indices of items whose bounding spheres, grown by `inflate`, a ray
    /// from `ray_origin` along `ray_dir` may hit. Sorted ascending.
    pub fn query_ray(&self, ray_origin: &Vec3, ray_dir: &Vec3, inflate: f64) -> Vec<usize> {
        let mut results = Vec::new();
        self.root.query_ray(ray_origin, ray_dir, self.max_item_radius + inflate, inflate, &mut results);
        results.sort_unstable();
        results
    }

    /// Minimum of `exact(item)` over items that could lie within `cutoff` of a
    /// query sphere (center `query`, radius `inflate`).
    ///
    /// `exact` must never return less than the sphere lower bound
    /// `|center - query| - radius - inflate`. Traversal stops as soon as a
    /// value at or below `stop_at` is found. Returns infinity if no item
    /// passes the cutoff.
    pub fn nearest_within<F>(&self, query: &Vec3, inflate: f64, cutoff: f64, stop_at: f64, mut exact: F) -> f64
    where
        F: FnMut(&OctreeItem) -> f64,
    {
        let search = NearestSearch {
            inflate,
            cutoff,
            stop_at,
            max_item_radius: self.max_item_radius,
        };
        let mut found = f64::INFINITY;
        self.root.nearest_within(query, &search, &mut found, &mut exact);
        found
    }

    /// Largest item radius
    pub fn max_item_radius(&self) -> f64 {
        self.max_item_radius
    }

    /// Get all leaf nodes
    pub fn get_all_leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.root.get_all_leaves(&mut leaves);
        leaves
    }

    /// Get total item count
    pub fn item_count(&self) -> usize {
        self.root.count_items()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_items(n: usize) -> Vec<OctreeItem> {
        (0..n)
            .map(|i| OctreeItem {
                index: i,
                center: Vec3::new((i % 10) as f64, ((i / 10) % 10) as f64, (i / 100) as f64),
                radius: 0.25,
            })
            .collect()
    }

    #[test]
    fn test_octree_basic_insertion() {
        let octree = Octree::build(grid_items(1), OctreeConfig::default());
        assert_eq!(octree.item_count(), 1);
        assert!(octree.root.is_leaf());
    }

    #[test]
    fn test_octree_subdivision() {
        let config = OctreeConfig {
            max_items_per_node: 4,
            max_depth: 3,
            min_node_size: 1e-3,
        };
        let octree = Octree::build(grid_items(300), config);

        assert_eq!(octree.item_count(), 300);
        assert!(octree.root.children.is_some()); // Should have subdivided
        assert!(octree.get_all_leaves().len() > 8);
    }

    #[test]
    fn test_octree_coincident_items_terminate() {
        let items = (0..50).map(|index| OctreeItem { index, center: Vec3::zeros(), radius: 0.0 });
        let octree = Octree::build(items, OctreeConfig::default());
        assert_eq!(octree.item_count(), 50);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let items = grid_items(250);
        let octree = Octree::build(items.clone(), OctreeConfig { max_items_per_node: 3, ..Default::default() });
        let query = Vec3::new(3.3, 7.8, 1.2);
        let exact = |item: &OctreeItem| (item.center - query).magnitude() - item.radius;

        let brute = items.iter().map(exact).fold(f64::INFINITY, f64::min);
        let found = octree.nearest_within(&query, 0.0, f64::INFINITY, f64::NEG_INFINITY, exact);
        assert_eq!(found, brute);

        let none = octree.nearest_within(&Vec3::new(100.0, 0.0, 0.0), 0.0, 1.0, 0.0, exact);
        assert_eq!(none, f64::INFINITY);
    }

    #[test]
    fn test_ray_query_finds_items_on_line() {
        let octree = Octree::build(grid_items(100), OctreeConfig { max_items_per_node: 2, ..Default::default() });
        let hits = octree.query_ray(&Vec3::new(-1.0, 2.0, 0.0), &Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert_eq!(hits, (20..30).collect::<Vec<_>>());
    }
}
