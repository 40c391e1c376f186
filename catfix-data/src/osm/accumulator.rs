//! Internal accumulator for OpenStreetMap reading.
//!
//! Collects nodes, ways and building multipolygons from either input
//! format, then assembles building and part areas into a snapshot.
use std::collections::{HashMap, HashSet};

use catfix_core::{
    Area, AreaId, BUILDING_KEY, BUILDING_PART_KEY, ElementId, ElementKind, Node, Snapshot,
    SnapshotBuilder, Tags, Way,
};
use geo::Coord;
use log::{debug, warn};
use osmpbf::{Element, RelMemberType};

use super::OsmReadSummary;
use super::rings::join_rings;
use crate::xml::{RawElement, RawMember, RawRelation};

const MULTIPOLYGON: &str = "multipolygon";

#[derive(Debug, Default)]
pub(super) struct OsmAccumulator {
    summary: OsmReadSummary,
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<RawRelation>,
}

impl OsmAccumulator {
    pub(super) fn push(&mut self, element: RawElement) {
        match element {
            RawElement::Node(node) => {
                self.summary.nodes += 1;
                if validated_coord(node.location).is_some() {
                    self.nodes.push(node);
                }
            }
            RawElement::Way(way) => {
                self.summary.ways += 1;
                self.ways.push(way);
            }
            RawElement::Relation(relation) => {
                self.summary.relations += 1;
                if is_building_multipolygon(&relation.tags) {
                    self.relations.push(relation);
                }
            }
        }
    }

    pub(super) fn process_element(&mut self, element: Element<'_>) {
        match element {
            Element::Node(node) => self.push(RawElement::Node(pbf_node(
                node.id(),
                node.lon(),
                node.lat(),
                node.info().version(),
                node.tags(),
            ))),
            Element::DenseNode(node) => self.push(RawElement::Node(pbf_node(
                node.id(),
                node.lon(),
                node.lat(),
                node.info().map(|info| info.version()),
                node.tags(),
            ))),
            Element::Way(way) => {
                let mut converted = Way::new(way.id(), way.refs().collect(), collect_tags(way.tags()));
                converted.version = version(way.info().version());
                self.push(RawElement::Way(converted));
            }
            Element::Relation(relation) => {
                let members = relation
                    .members()
                    .map(|member| RawMember {
                        kind: match member.member_type {
                            RelMemberType::Node => ElementKind::Node,
                            RelMemberType::Way => ElementKind::Way,
                            RelMemberType::Relation => ElementKind::Relation,
                        },
                        reference: member.member_id,
                        role: member.role().unwrap_or_default().to_owned(),
                    })
                    .collect();
                self.push(RawElement::Relation(RawRelation {
                    id: relation.id(),
                    version: version(relation.info().version()),
                    members,
                    tags: collect_tags(relation.tags()),
                }));
            }
        }
    }

    pub(super) fn combine(mut self, other: Self) -> Self {
        self.summary = self.summary.combine(other.summary);
        self.nodes.extend(other.nodes);
        self.ways.extend(other.ways);
        self.relations.extend(other.relations);
        self
    }

    pub(super) const fn summary(&self) -> OsmReadSummary {
        self.summary
    }

    pub(super) fn into_snapshot(
        self,
        label: &str,
        filter: Option<HashSet<AreaId>>,
    ) -> Snapshot {
        let locations: HashMap<ElementId, Coord<f64>> = self
            .nodes
            .iter()
            .filter_map(|node| node.id.map(|id| (id, node.location)))
            .collect();
        let members: HashMap<ElementId, &Way> = self
            .ways
            .iter()
            .filter_map(|way| way.id.map(|id| (id, way)))
            .collect();

        let mut builder = SnapshotBuilder::new(label);
        if let Some(filter) = filter {
            builder = builder.with_building_filter(filter);
        }
        for way in &self.ways {
            if let Some(area) = way_area(label, way, &locations) {
                builder.add_area(area);
            }
        }
        for relation in &self.relations {
            if let Some(area) = relation_area(label, relation, &members, &locations) {
                builder.add_area(area);
            }
        }
        for node in self.nodes {
            builder.add_node(node);
        }
        for way in self.ways {
            builder.add_way(way);
        }
        builder.build()
    }
}

fn is_area_tagged(tags: &Tags) -> bool {
    tags.contains_key(BUILDING_KEY) || tags.contains_key(BUILDING_PART_KEY)
}

fn is_building_multipolygon(tags: &Tags) -> bool {
    tags.get("type").is_some_and(|kind| kind == MULTIPOLYGON) && is_area_tagged(tags)
}

fn way_area(label: &str, way: &Way, locations: &HashMap<ElementId, Coord<f64>>) -> Option<Area> {
    let id = way.id?;
    if !way.is_closed() || !is_area_tagged(&way.tags) {
        return None;
    }
    let Some(ring) = locate(&way.nodes, locations) else {
        warn!("{label}: way {id} references nodes without location");
        return None;
    };
    Some(Area {
        id: AreaId::way(id),
        outers: vec![ring],
        inners: Vec::new(),
        tags: way.tags.clone(),
    })
}

fn relation_area(
    label: &str,
    relation: &RawRelation,
    ways: &HashMap<ElementId, &Way>,
    locations: &HashMap<ElementId, Coord<f64>>,
) -> Option<Area> {
    let mut outers = Vec::new();
    let mut inners = Vec::new();
    for member in &relation.members {
        if member.kind != ElementKind::Way {
            continue;
        }
        let Some(way) = ways.get(&member.reference) else {
            warn!(
                "{label}: relation {} misses member way {}",
                relation.id, member.reference
            );
            return None;
        };
        match member.role.as_str() {
            "inner" => inners.push(way.nodes.as_slice()),
            "outer" | "" => outers.push(way.nodes.as_slice()),
            other => debug!("{label}: relation {} ignores role {other:?}", relation.id),
        }
    }

    let outer_rings = join_rings(outers);
    let inner_rings = join_rings(inners);
    if outer_rings.unclosed + inner_rings.unclosed > 0 {
        warn!("{label}: relation {} has unclosed rings", relation.id);
        return None;
    }
    let locate_all = |rings: Vec<Vec<ElementId>>| -> Option<Vec<Vec<Coord<f64>>>> {
        rings.iter().map(|ring| locate(ring, locations)).collect()
    };
    let (Some(outers), Some(inners)) = (
        locate_all(outer_rings.rings),
        locate_all(inner_rings.rings),
    ) else {
        warn!(
            "{label}: relation {} references nodes without location",
            relation.id
        );
        return None;
    };
    Some(Area {
        id: AreaId::relation(relation.id),
        outers,
        inners,
        tags: relation.tags.clone(),
    })
}

fn locate(nodes: &[ElementId], locations: &HashMap<ElementId, Coord<f64>>) -> Option<Vec<Coord<f64>>> {
    nodes.iter().map(|id| locations.get(id).copied()).collect()
}

fn pbf_node<'a>(
    id: ElementId,
    lon: f64,
    lat: f64,
    raw_version: Option<i32>,
    tags: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Node {
    let mut node = Node::new(id, Coord { x: lon, y: lat }, collect_tags(tags));
    node.version = version(raw_version);
    node
}

fn version(raw: Option<i32>) -> Option<u32> {
    raw.and_then(|value| u32::try_from(value).ok())
}

fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn validated_coord(location: Coord<f64>) -> Option<Coord<f64>> {
    (location.x.is_finite()
        && location.y.is_finite()
        && (-180.0..=180.0).contains(&location.x)
        && (-90.0..=90.0).contains(&location.y))
    .then_some(location)
}
