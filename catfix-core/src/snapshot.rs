//! Assembly of the read-only input of one reconciliation run.

use std::collections::HashSet;

use log::debug;

use crate::catalog::Catalog;
use crate::diff::PartLayer;
use crate::element::{Area, AreaId, Building, BuildingPart, Node, Way};
use crate::geometry::ToPolygon;

/// Everything a reconciliation run reads: known elements, the buildings to
/// complete and the parts already recorded.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Name used to prefix log lines, usually the changeset id.
    pub label: String,
    /// Known nodes and closed ways.
    pub catalog: Catalog,
    /// Buildings to reconcile, ordered by identity.
    pub buildings: Vec<Building>,
    /// Recorded building parts.
    pub parts: PartLayer,
}

/// Collects map elements and areas into a [`Snapshot`].
///
/// Nodes must all be known before the ways referencing them are
/// catalogued, so ways are held back until [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use catfix_core::{Area, AreaId, Node, SnapshotBuilder, Tags, Way};
///
/// let corners = [(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 1.0, 1.0)];
/// let mut builder = SnapshotBuilder::new("42");
/// for (id, x, y) in corners {
///     builder.add_node(Node::new(id, Coord { x, y }, Tags::new()));
/// }
/// builder.add_way(Way::new(10, vec![1, 2, 3, 1], Tags::new()));
/// builder.add_area(Area {
///     id: AreaId::way(10),
///     outers: vec![corners.iter().map(|&(_, x, y)| Coord { x, y }).collect()],
///     inners: Vec::new(),
///     tags: Tags::from([("building".into(), "yes".into())]),
/// });
/// let snapshot = builder.build();
/// assert_eq!(snapshot.buildings.len(), 1);
/// assert_eq!(snapshot.catalog.way_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    label: String,
    nodes: Vec<Node>,
    ways: Vec<Way>,
    areas: Vec<Area>,
    filter: Option<HashSet<AreaId>>,
}

impl SnapshotBuilder {
    /// Start a snapshot labelled `label`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Restrict the buildings to those listed in `filter`.
    #[must_use]
    pub fn with_building_filter(mut self, filter: HashSet<AreaId>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add a node.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Add a way. Only closed ways end up in the catalog.
    pub fn add_way(&mut self, way: Way) {
        self.ways.push(way);
    }

    /// Add an area. Areas tagged `building` become buildings, otherwise
    /// areas tagged `building:part` become parts; the rest is ignored.
    pub fn add_area(&mut self, area: Area) {
        self.areas.push(area);
    }

    /// Finish the snapshot.
    #[must_use]
    pub fn build(self) -> Snapshot {
        let mut catalog = Catalog::default();
        for node in self.nodes {
            catalog.insert_node(node);
        }
        for way in self.ways {
            catalog.insert_way(way);
        }

        let mut buildings = Vec::new();
        let mut parts = Vec::new();
        for area in self.areas {
            let Some(footprint) = area.to_polygon() else {
                debug!("{}: area {} has no outer ring", self.label, area.id);
                continue;
            };
            if area.is_building() {
                let wanted = self
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.contains(&area.id));
                if wanted {
                    buildings.push(Building {
                        id: area.id,
                        footprint,
                        tags: Building::level_tags(&area.tags),
                    });
                }
            } else if area.is_building_part() {
                parts.push(BuildingPart {
                    id: area.id,
                    footprint,
                });
            }
        }
        buildings.sort_by_key(|building| building.id);
        buildings.dedup_by_key(|building| building.id);

        Snapshot {
            label: self.label,
            catalog,
            buildings,
            parts: PartLayer::new(parts),
        }
    }
}
