//! Map elements and the building records built from them.

use std::collections::BTreeMap;
use std::fmt;

use geo::{Coord, MultiPolygon};

/// OpenStreetMap-style key/value tags.
///
/// An ordered map keeps serialised output stable between runs.
pub type Tags = BTreeMap<String, String>;

/// Identity of an OSM element. Negative values are pending identities
/// assigned to elements that do not exist upstream yet.
pub type ElementId = i64;

/// Tag key marking an area as a building outline.
pub const BUILDING_KEY: &str = "building";

/// Tag key marking an area as a building part.
pub const BUILDING_PART_KEY: &str = "building:part";

/// Prefix shared by the level-count keys copied from buildings onto parts.
pub const LEVELS_PREFIX: &str = "building:levels";

/// The three OSM element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A located point.
    Node,
    /// An ordered list of node references.
    Way,
    /// A grouping of other elements.
    Relation,
}

impl ElementKind {
    /// Name used by OSM XML and the OSM API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an element id refers to something already stored upstream.
#[must_use]
pub const fn is_persisted(id: ElementId) -> bool {
    id >= 0
}

/// A located point.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use catfix_core::{Node, Tags};
///
/// let node = Node::new(7, Coord { x: -3.7, y: 40.4 }, Tags::new());
/// assert_eq!(node.id, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Identity, `None` while pending creation.
    pub id: Option<ElementId>,
    /// Geospatial position.
    pub location: Coord<f64>,
    /// Upstream version, when known.
    pub version: Option<u32>,
    /// Free-form tags.
    pub tags: Tags,
}

impl Node {
    /// Construct a persisted node without version information.
    #[must_use]
    pub const fn new(id: ElementId, location: Coord<f64>, tags: Tags) -> Self {
        Self {
            id: Some(id),
            location,
            version: None,
            tags,
        }
    }

    /// Attach the upstream version.
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// An ordered sequence of node references.
///
/// A closed way (first reference equal to the last) describes a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Identity, `None` while pending creation.
    pub id: Option<ElementId>,
    /// Upstream version, when known.
    pub version: Option<u32>,
    /// Node references in ring order.
    pub nodes: Vec<ElementId>,
    /// Free-form tags.
    pub tags: Tags,
    /// Set when a persisted way carries local changes that must be uploaded.
    pub modified: bool,
}

impl Way {
    /// Construct a persisted way.
    #[must_use]
    pub const fn new(id: ElementId, nodes: Vec<ElementId>, tags: Tags) -> Self {
        Self {
            id: Some(id),
            version: None,
            nodes,
            tags,
            modified: false,
        }
    }

    /// Construct a way that has no identity yet.
    #[must_use]
    pub const fn pending(nodes: Vec<ElementId>, tags: Tags) -> Self {
        Self {
            id: None,
            version: None,
            nodes,
            tags,
            modified: false,
        }
    }

    /// Attach the upstream version.
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Whether the way forms a closed ring of at least one segment.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 1 && self.nodes.first() == self.nodes.last()
    }
}

/// Role of a multipolygon member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Outer boundary.
    Outer,
    /// Hole.
    Inner,
}

impl Role {
    /// Role string as stored in OSM.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outer => "outer",
            Self::Inner => "inner",
        }
    }

    /// Parse an OSM role string, accepting only multipolygon ring roles.
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "outer" => Some(Self::Outer),
            "inner" => Some(Self::Inner),
            _ => None,
        }
    }
}

/// A relation member reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identity of the referenced element.
    pub reference: ElementId,
    /// Ring role.
    pub role: Role,
}

impl Member {
    /// Reference a way in the given role.
    #[must_use]
    pub const fn way(reference: ElementId, role: Role) -> Self {
        Self {
            kind: ElementKind::Way,
            reference,
            role,
        }
    }
}

/// A grouping of ways, used here only for multipolygons.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Identity, `None` while pending creation.
    pub id: Option<ElementId>,
    /// Upstream version, when known.
    pub version: Option<u32>,
    /// Ordered members.
    pub members: Vec<Member>,
    /// Free-form tags.
    pub tags: Tags,
}

impl Relation {
    /// Construct a relation that has no identity yet.
    #[must_use]
    pub const fn pending(members: Vec<Member>, tags: Tags) -> Self {
        Self {
            id: None,
            version: None,
            members,
            tags,
        }
    }
}

/// Any element that can be staged in an edit-set.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A node.
    Node(Node),
    /// A way.
    Way(Way),
    /// A relation.
    Relation(Relation),
}

impl Element {
    /// Kind of the wrapped element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Node,
            Self::Way(_) => ElementKind::Way,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Identity of the wrapped element.
    #[must_use]
    pub const fn id(&self) -> Option<ElementId> {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Tags of the wrapped element.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }

    /// Borrow the element.
    #[must_use]
    pub const fn as_ref(&self) -> ElementRef<'_> {
        match self {
            Self::Node(node) => ElementRef::Node(node),
            Self::Way(way) => ElementRef::Way(way),
            Self::Relation(relation) => ElementRef::Relation(relation),
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Way> for Element {
    fn from(way: Way) -> Self {
        Self::Way(way)
    }
}

impl From<Relation> for Element {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}

/// Borrowed view of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementRef<'a> {
    /// A node.
    Node(&'a Node),
    /// A way.
    Way(&'a Way),
    /// A relation.
    Relation(&'a Relation),
}

impl ElementRef<'_> {
    /// Identity of the referenced element.
    #[must_use]
    pub const fn id(&self) -> Option<ElementId> {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }
}

/// Identity of an area: the way or relation it was assembled from.
///
/// Keeping the kind avoids collisions between a way and a relation that
/// share a numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaId {
    /// Source element kind.
    pub kind: ElementKind,
    /// Source element identity.
    pub id: ElementId,
}

impl AreaId {
    /// Area assembled from a closed way.
    #[must_use]
    pub const fn way(id: ElementId) -> Self {
        Self {
            kind: ElementKind::Way,
            id,
        }
    }

    /// Area assembled from a multipolygon relation.
    #[must_use]
    pub const fn relation(id: ElementId) -> Self {
        Self {
            kind: ElementKind::Relation,
            id,
        }
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Closed area record handed over by the map-data reader.
///
/// Rings are `(longitude, latitude)` sequences; holes are matched to the
/// outer ring that contains them when the area is turned into polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// Source identity.
    pub id: AreaId,
    /// Outer rings.
    pub outers: Vec<Vec<Coord<f64>>>,
    /// Hole rings.
    pub inners: Vec<Vec<Coord<f64>>>,
    /// Tags of the source element.
    pub tags: Tags,
}

impl Area {
    /// Whether the area is tagged as a building outline.
    #[must_use]
    pub fn is_building(&self) -> bool {
        self.tags.contains_key(BUILDING_KEY)
    }

    /// Whether the area is tagged as a building part.
    #[must_use]
    pub fn is_building_part(&self) -> bool {
        self.tags.contains_key(BUILDING_PART_KEY)
    }
}

/// A building outline whose missing parts are reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    /// Source identity.
    pub id: AreaId,
    /// Footprint.
    pub footprint: MultiPolygon<f64>,
    /// Level-related tags copied onto generated parts.
    pub tags: Tags,
}

impl Building {
    /// Keep only the `building:levels*` tags of a source tag set.
    #[must_use]
    pub fn level_tags(tags: &Tags) -> Tags {
        tags.iter()
            .filter(|(key, _)| key.starts_with(LEVELS_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// A recorded building part.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingPart {
    /// Source identity.
    pub id: AreaId,
    /// Footprint.
    pub footprint: MultiPolygon<f64>,
}
