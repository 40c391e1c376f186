//! Two-dimensional range index over element bounding boxes.
//!
//! The index is filled once while a snapshot is loaded and only queried
//! afterwards, so it supports insertion and lookup but no removal.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use geo::{Coord, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

type Entry<K> = GeomWithData<Rectangle<[f64; 2]>, K>;

/// R\*-tree keyed by element identity.
///
/// # Examples
///
/// ```
/// use geo::{Coord, Rect};
/// use catfix_core::SpatialIndex;
///
/// let mut index = SpatialIndex::default();
/// index.insert(7_i64, Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }));
/// let hits = index.query(&Rect::new(Coord { x: 0.5, y: 0.5 }, Coord { x: 2.0, y: 2.0 }));
/// assert_eq!(hits, vec![7]);
/// ```
pub struct SpatialIndex<K> {
    tree: RTree<Entry<K>>,
    keys: HashSet<K>,
}

impl<K> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self {
            tree: RTree::new(),
            keys: HashSet::new(),
        }
    }
}

impl<K> fmt::Debug for SpatialIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.tree.size())
            .finish()
    }
}

impl<K: Copy + Eq + Hash> SpatialIndex<K> {
    /// Register `key` with the given bounding box.
    ///
    /// Returns `false` and leaves the index untouched when `key` is already
    /// present.
    pub fn insert(&mut self, key: K, bbox: Rect<f64>) -> bool {
        if !self.keys.insert(key) {
            return false;
        }
        let min = bbox.min();
        let max = bbox.max();
        let rectangle = Rectangle::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree.insert(GeomWithData::new(rectangle, key));
        true
    }

    /// Keys whose bounding box intersects `bbox`, boundaries included.
    #[must_use]
    pub fn query(&self, bbox: &Rect<f64>) -> Vec<K> {
        let min = bbox.min();
        let max = bbox.max();
        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect()
    }

    /// Keys whose bounding box contains `coord`.
    #[must_use]
    pub fn query_point(&self, coord: Coord<f64>) -> Vec<K> {
        self.query(&Rect::new(coord, coord))
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
