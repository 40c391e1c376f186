//! Test-only builders for small map snapshots.
//!
//! Coordinates are given in thousandths of a degree so fixtures read as
//! small integer grids.

use std::collections::HashMap;

use geo::Coord;

use crate::element::{Area, AreaId, ElementId, Node, Tags, Way};
use crate::geometry::GridCoord;
use crate::snapshot::{Snapshot, SnapshotBuilder};

/// Degrees per fixture unit.
pub const UNIT: f64 = 0.001;

/// Build a tag map from string pairs.
#[must_use]
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// Convert a fixture coordinate into degrees.
#[must_use]
pub fn at(x: f64, y: f64) -> Coord<f64> {
    Coord {
        x: x * UNIT,
        y: y * UNIT,
    }
}

/// Builds snapshots from outlines, sharing nodes between coincident
/// vertices the way mapped buildings do.
#[derive(Debug)]
pub struct FixtureBuilder {
    snapshot: SnapshotBuilder,
    positions: HashMap<GridCoord, ElementId>,
    next_node: ElementId,
    next_way: ElementId,
    next_relation: ElementId,
}

impl FixtureBuilder {
    /// Start a fixture labelled `label`.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            snapshot: SnapshotBuilder::new(label),
            positions: HashMap::new(),
            next_node: 1,
            next_way: 1000,
            next_relation: 5000,
        }
    }

    /// Node at a fixture coordinate, created on first use.
    pub fn node_at(&mut self, x: f64, y: f64) -> ElementId {
        let location = at(x, y);
        let grid = GridCoord::from_coord(location);
        if let Some(&id) = self.positions.get(&grid) {
            return id;
        }
        let id = self.next_node;
        self.next_node += 1;
        self.positions.insert(grid, id);
        self.snapshot
            .add_node(Node::new(id, location, Tags::new()).with_version(1));
        id
    }

    /// Closed way through `outline`, which must not repeat its first
    /// vertex. Returns the way identity.
    pub fn closed_way(&mut self, outline: &[(f64, f64)], tags: Tags) -> ElementId {
        let mut nodes: Vec<ElementId> = outline.iter().map(|&(x, y)| self.node_at(x, y)).collect();
        if let Some(&first) = nodes.first() {
            nodes.push(first);
        }
        let id = self.next_way;
        self.next_way += 1;
        self.snapshot
            .add_way(Way::new(id, nodes, tags).with_version(1));
        id
    }

    /// Building outlined by a closed way.
    pub fn building(&mut self, outline: &[(f64, f64)], extra: &[(&str, &str)]) -> AreaId {
        let mut area_tags = tags(&[("building", "yes")]);
        area_tags.extend(tags(extra));
        self.way_area(outline, area_tags)
    }

    /// Building part outlined by a closed way.
    pub fn part(&mut self, outline: &[(f64, f64)]) -> AreaId {
        self.way_area(outline, tags(&[("building:part", "yes")]))
    }

    /// Multipolygon building assembled from untagged member ways.
    pub fn multipolygon_building(
        &mut self,
        outer: &[(f64, f64)],
        inners: &[&[(f64, f64)]],
        extra: &[(&str, &str)],
    ) -> AreaId {
        self.closed_way(outer, Tags::new());
        for inner in inners {
            self.closed_way(inner, Tags::new());
        }
        let id = AreaId::relation(self.next_relation);
        self.next_relation += 1;
        let mut area_tags = tags(&[("building", "yes"), ("type", "multipolygon")]);
        area_tags.extend(tags(extra));
        self.snapshot.add_area(Area {
            id,
            outers: vec![ring(outer)],
            inners: inners.iter().map(|inner| ring(inner)).collect(),
            tags: area_tags,
        });
        id
    }

    fn way_area(&mut self, outline: &[(f64, f64)], area_tags: Tags) -> AreaId {
        let id = AreaId::way(self.closed_way(outline, area_tags.clone()));
        self.snapshot.add_area(Area {
            id,
            outers: vec![ring(outline)],
            inners: Vec::new(),
            tags: area_tags,
        });
        id
    }

    /// Finish the snapshot.
    #[must_use]
    pub fn build(self) -> Snapshot {
        self.snapshot.build()
    }
}

fn ring(outline: &[(f64, f64)]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = outline.iter().map(|&(x, y)| at(x, y)).collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    coords
}
