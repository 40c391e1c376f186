//! Snapshot of the nodes and closed ways already present on the map.
//!
//! The catalog is filled once while a snapshot is assembled and is
//! read-only afterwards. It answers two questions for the edit builder:
//! which node sits exactly at a coordinate, and which closed way traces
//! exactly a ring.

use std::collections::{HashMap, HashSet};

use geo::{BoundingRect, Coord, LineString, Polygon, Rect, Relate};
use log::debug;

use crate::edit_set::EditSet;
use crate::element::{ElementId, Node, Tags, Way, is_persisted};
use crate::error::{BuildError, Warning};
use crate::geometry::{GridCoord, LocatedWay, ToPolygon, narrow_vertices, snap_polygon};
use crate::spatial_index::SpatialIndex;

/// Known nodes and closed ways keyed by identity.
///
/// Node positions are indexed in grid units so point lookups are exact;
/// ring outlines are indexed in degrees.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use catfix_core::{Catalog, Node, Tags};
///
/// let mut catalog = Catalog::default();
/// catalog.insert_node(Node::new(1, Coord { x: -3.7, y: 40.4 }, Tags::new()));
/// assert_eq!(catalog.resolve_point(Coord { x: -3.7, y: 40.4 }).ok(), Some(1));
/// assert!(catalog.resolve_point(Coord { x: -3.7, y: 40.5 }).is_err());
/// ```
#[derive(Debug, Default)]
pub struct Catalog {
    nodes: HashMap<ElementId, Node>,
    locations: HashMap<ElementId, Coord<f64>>,
    node_index: SpatialIndex<ElementId>,
    ways: HashMap<ElementId, Way>,
    rings: HashMap<ElementId, Polygon<f64>>,
    ring_index: SpatialIndex<ElementId>,
    ring_nodes: HashSet<ElementId>,
}

impl Catalog {
    /// Register a node. Nodes without identity are ignored.
    pub fn insert_node(&mut self, node: Node) -> bool {
        let Some(id) = node.id else {
            return false;
        };
        let units = GridCoord::from_coord(node.location).as_units();
        if !self.node_index.insert(id, Rect::new(units, units)) {
            return false;
        }
        self.locations.insert(id, node.location);
        self.nodes.insert(id, node);
        true
    }

    /// Register a closed way whose nodes are all known.
    ///
    /// Returns `false` for open ways, ways without identity and ways
    /// referencing unknown nodes.
    pub fn insert_way(&mut self, way: Way) -> bool {
        let Some(id) = way.id else {
            return false;
        };
        let Some(polygon) = (LocatedWay {
            way: &way,
            locations: &self.locations,
        })
        .to_polygon() else {
            return false;
        };
        let polygon = snap_polygon(&polygon);
        let Some(bbox) = polygon.bounding_rect() else {
            return false;
        };
        if !self.ring_index.insert(id, bbox) {
            return false;
        }
        self.ring_nodes.extend(way.nodes.iter().copied());
        self.rings.insert(id, polygon);
        self.ways.insert(id, way);
        true
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a closed way.
    #[must_use]
    pub fn way(&self, id: ElementId) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Number of known nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of known closed ways.
    #[must_use]
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Identity of the node located exactly at `coord` on the OSM grid.
    ///
    /// When several nodes share the position the lowest identity wins.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnmatchedVertices`] naming `coord` when no node
    /// occupies that position.
    pub fn resolve_point(&self, coord: Coord<f64>) -> Result<ElementId, BuildError> {
        self.node_index
            .query_point(GridCoord::from_coord(coord).as_units())
            .into_iter()
            .min()
            .ok_or_else(|| BuildError::UnmatchedVertices {
                coords: vec![coord],
            })
    }

    /// Identity of the closed way tracing exactly the same ring.
    ///
    /// Candidates come from the ring index and are compared by topological
    /// equality, so start vertex and winding do not matter. The lowest
    /// matching identity wins.
    #[must_use]
    pub fn resolve_ring(&self, ring: &LineString<f64>) -> Option<ElementId> {
        let bbox = ring.bounding_rect()?;
        let polygon = Polygon::new(ring.clone(), Vec::new());
        let mut candidates = self.ring_index.query(&bbox);
        candidates.sort_unstable();
        candidates.into_iter().find(|id| {
            self.rings
                .get(id)
                .is_some_and(|known| polygon.relate(known).is_equal_topo())
        })
    }

    /// Reuse the way tracing `ring`, or build a new pending one.
    ///
    /// A reused way starts from its staged copy when the edit-set already
    /// holds it. Incoming `tags` are merged over the existing ones and a
    /// reused persisted way is always flagged modified. A new
    /// way is checked for narrow vertices, densified with the catalog nodes
    /// lying on its edges and resolved vertex by vertex; every unmatched
    /// vertex is reported together.
    ///
    /// Every node the returned way references is staged in `edits`. The way
    /// itself is not.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnmatchedVertices`] when a vertex of a new ring
    /// has no node.
    pub fn get_or_create_ring(
        &self,
        edits: &mut EditSet,
        ring: &LineString<f64>,
        tags: Option<&Tags>,
        angle_threshold: f64,
        warnings: &mut Vec<Warning>,
    ) -> Result<Way, BuildError> {
        let way = if let Some(id) = self.resolve_ring(ring) {
            debug!("reusing way {id}");
            self.reuse(edits, id, tags)
        } else {
            warnings.extend(narrow_vertices(ring, angle_threshold).into_iter().map(
                |vertex| Warning::NarrowVertex {
                    location: vertex.location,
                    angle: vertex.angle,
                },
            ));
            let mut nodes = Vec::with_capacity(ring.0.len());
            let mut unmatched = Vec::new();
            for coord in self.densify(ring) {
                match self.resolve_point(coord) {
                    Ok(id) => nodes.push(id),
                    Err(_) => unmatched.push(coord),
                }
            }
            if !unmatched.is_empty() {
                return Err(BuildError::UnmatchedVertices { coords: unmatched });
            }
            Way::pending(nodes, tags.cloned().unwrap_or_default())
        };
        self.stage_nodes(edits, &way);
        Ok(way)
    }

    fn reuse(&self, edits: &EditSet, id: ElementId, tags: Option<&Tags>) -> Way {
        let base = edits
            .way(id)
            .or_else(|| self.ways.get(&id))
            .cloned()
            .unwrap_or_else(|| Way::new(id, Vec::new(), Tags::new()));
        let mut merged = base.tags.clone();
        if let Some(incoming) = tags {
            merged.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Way {
            modified: base.modified || is_persisted(id),
            tags: merged,
            ..base
        }
    }

    /// Re-insert ring nodes dropped from the edges of `ring`.
    ///
    /// Polygon overlay removes collinear vertices, so a residual edge may
    /// pass over nodes that neighbouring ways share. Every node referenced
    /// by a closed way that lies exactly on an edge of the grid, strictly
    /// between its ends, is inserted in order along the edge.
    #[must_use]
    pub fn densify(&self, ring: &LineString<f64>) -> Vec<Coord<f64>> {
        let mut dense = Vec::with_capacity(ring.0.len());
        for line in ring.lines() {
            let start = GridCoord::from_coord(line.start);
            let end = GridCoord::from_coord(line.end);
            dense.push(start.to_coord());
            let mut between = self.nodes_on_edge(start, end);
            between.sort_by_key(|&(along, _)| along);
            let mut last = start;
            for (_, grid) in between {
                if grid != last && grid != end {
                    dense.push(grid.to_coord());
                    last = grid;
                }
            }
        }
        if let Some(&closing) = ring.0.last() {
            dense.push(GridCoord::from_coord(closing).to_coord());
        }
        dense
    }

    fn nodes_on_edge(&self, start: GridCoord, end: GridCoord) -> Vec<(i128, GridCoord)> {
        let dx = i128::from(end.x) - i128::from(start.x);
        let dy = i128::from(end.y) - i128::from(start.y);
        let length_sq = dx * dx + dy * dy;
        if length_sq == 0 {
            return Vec::new();
        }
        let (a, b) = (start.as_units(), end.as_units());
        let envelope = Rect::new(a, b);
        self.node_index
            .query(&envelope)
            .into_iter()
            .filter(|id| self.ring_nodes.contains(id))
            .filter_map(|id| self.locations.get(&id))
            .filter_map(|&location| {
                let grid = GridCoord::from_coord(location);
                let px = i128::from(grid.x) - i128::from(start.x);
                let py = i128::from(grid.y) - i128::from(start.y);
                let along = px * dx + py * dy;
                let cross = px * dy - py * dx;
                (cross == 0 && along > 0 && along < length_sq).then_some((along, grid))
            })
            .collect()
    }

    /// Stage every catalog node `way` references that the edit-set lacks.
    pub fn stage_nodes(&self, edits: &mut EditSet, way: &Way) {
        for id in &way.nodes {
            if edits.contains_node(*id) {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                edits.add(node.clone());
            }
        }
    }
}
