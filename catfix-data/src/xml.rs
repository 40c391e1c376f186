//! Streaming reader for the OpenStreetMap XML dialects: map extracts,
//! osmChange documents and changeset dumps.
//!
//! The stream yields one [`Item`] per complete element. Child `tag`, `nd`
//! and `member` elements are folded into their parent; anything else is
//! skipped.

use std::io::BufRead;
use std::str::FromStr;

use catfix_core::{ElementId, ElementKind, Node, Tags, Way};
use geo::{Coord, Rect};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

/// Errors raised while decoding OpenStreetMap XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    /// A required attribute is absent.
    #[error("<{element}> lacks the `{attribute}` attribute")]
    MissingAttribute {
        /// Element name.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute could not be parsed.
    #[error("<{element}> has an invalid `{attribute}` value {value:?}")]
    InvalidAttribute {
        /// Element name.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// Raw attribute text.
        value: String,
    },
}

/// osmChange block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Create,
    Modify,
    Delete,
}

/// Relation member as found in the source, with its role unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawMember {
    pub(crate) kind: ElementKind,
    pub(crate) reference: ElementId,
    pub(crate) role: String,
}

/// Relation as found in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawRelation {
    pub(crate) id: ElementId,
    pub(crate) version: Option<u32>,
    pub(crate) members: Vec<RawMember>,
    pub(crate) tags: Tags,
}

/// Changeset metadata from a changeset dump.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawChangeset {
    pub(crate) id: ElementId,
    pub(crate) bounds: Option<Rect<f64>>,
    pub(crate) tags: Tags,
}

/// A decoded map element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawElement {
    Node(Node),
    Way(Way),
    Relation(RawRelation),
}

/// One unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    /// Start of an osmChange block.
    Enter(Section),
    /// End of an osmChange block.
    Leave,
    /// A complete element with its `visible` flag.
    Element { element: RawElement, visible: bool },
    /// A complete changeset record.
    Changeset(RawChangeset),
}

#[derive(Debug)]
enum Pending {
    Node(Node, bool),
    Way(Way, bool),
    Relation(RawRelation, bool),
    Changeset(RawChangeset),
}

impl Pending {
    fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Self::Node(node, _) => &mut node.tags,
            Self::Way(way, _) => &mut way.tags,
            Self::Relation(relation, _) => &mut relation.tags,
            Self::Changeset(changeset) => &mut changeset.tags,
        }
    }

    fn finish(self) -> Item {
        match self {
            Self::Node(node, visible) => Item::Element {
                element: RawElement::Node(node),
                visible,
            },
            Self::Way(way, visible) => Item::Element {
                element: RawElement::Way(way),
                visible,
            },
            Self::Relation(relation, visible) => Item::Element {
                element: RawElement::Relation(relation),
                visible,
            },
            Self::Changeset(changeset) => Item::Changeset(changeset),
        }
    }
}

/// Pull-based iterator over the [`Item`]s of a document.
pub(crate) struct XmlItems<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending: Option<Pending>,
}

impl<R: BufRead> XmlItems<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            pending: None,
        }
    }

    fn next_item(&mut self) -> Result<Option<Item>, XmlError> {
        loop {
            self.buf.clear();
            let item = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(start) => open(&mut self.pending, &start, false)?,
                Event::Empty(start) => open(&mut self.pending, &start, true)?,
                Event::End(end) => close(&mut self.pending, end.name().as_ref()),
                Event::Eof => return Ok(None),
                _ => None,
            };
            if item.is_some() {
                return Ok(item);
            }
        }
    }
}

impl<R: BufRead> Iterator for XmlItems<R> {
    type Item = Result<Item, XmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

fn open(
    pending: &mut Option<Pending>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Option<Item>, XmlError> {
    let begun = match start.name().as_ref() {
        b"create" => return Ok((!empty).then_some(Item::Enter(Section::Create))),
        b"modify" => return Ok((!empty).then_some(Item::Enter(Section::Modify))),
        b"delete" => return Ok((!empty).then_some(Item::Enter(Section::Delete))),
        b"node" => parse_node(&Attributes::read(start)?)?,
        b"way" => Some(parse_way(&Attributes::read(start)?)?),
        b"relation" => Some(parse_relation(&Attributes::read(start)?)?),
        b"changeset" => Some(parse_changeset(&Attributes::read(start)?)?),
        b"tag" => {
            if let Some(parent) = pending.as_mut() {
                let attrs = Attributes::read(start)?;
                let key = attrs.required::<String>("tag", "k")?;
                let value = attrs.required::<String>("tag", "v")?;
                parent.tags_mut().insert(key, value);
            }
            return Ok(None);
        }
        b"nd" => {
            if let Some(Pending::Way(way, _)) = pending.as_mut() {
                way.nodes
                    .push(Attributes::read(start)?.required("nd", "ref")?);
            }
            return Ok(None);
        }
        b"member" => {
            if let Some(Pending::Relation(relation, _)) = pending.as_mut() {
                relation.members.push(parse_member(&Attributes::read(start)?)?);
            }
            return Ok(None);
        }
        _ => return Ok(None),
    };
    let Some(begun) = begun else {
        return Ok(None);
    };
    if empty {
        Ok(Some(begun.finish()))
    } else {
        *pending = Some(begun);
        Ok(None)
    }
}

fn close(pending: &mut Option<Pending>, name: &[u8]) -> Option<Item> {
    match name {
        b"create" | b"modify" | b"delete" => Some(Item::Leave),
        b"node" | b"way" | b"relation" | b"changeset" => pending.take().map(Pending::finish),
        _ => None,
    }
}

/// Nodes without coordinates (deleted nodes in change documents) are
/// skipped.
fn parse_node(attrs: &Attributes) -> Result<Option<Pending>, XmlError> {
    let id = attrs.required("node", "id")?;
    let lat: Option<f64> = attrs.optional("node", "lat")?;
    let lon: Option<f64> = attrs.optional("node", "lon")?;
    let (Some(lat), Some(lon)) = (lat, lon) else {
        debug!("node {id} has no coordinates");
        return Ok(None);
    };
    let mut node = Node::new(id, Coord { x: lon, y: lat }, Tags::new());
    node.version = attrs.optional("node", "version")?;
    Ok(Some(Pending::Node(node, attrs.visible()?)))
}

fn parse_way(attrs: &Attributes) -> Result<Pending, XmlError> {
    let mut way = Way::new(attrs.required("way", "id")?, Vec::new(), Tags::new());
    way.version = attrs.optional("way", "version")?;
    Ok(Pending::Way(way, attrs.visible()?))
}

fn parse_relation(attrs: &Attributes) -> Result<Pending, XmlError> {
    let relation = RawRelation {
        id: attrs.required("relation", "id")?,
        version: attrs.optional("relation", "version")?,
        members: Vec::new(),
        tags: Tags::new(),
    };
    Ok(Pending::Relation(relation, attrs.visible()?))
}

fn parse_member(attrs: &Attributes) -> Result<RawMember, XmlError> {
    let kind = match attrs.get("type") {
        Some("node") => ElementKind::Node,
        Some("way") => ElementKind::Way,
        Some("relation") => ElementKind::Relation,
        Some(other) => {
            return Err(XmlError::InvalidAttribute {
                element: "member",
                attribute: "type",
                value: other.to_owned(),
            });
        }
        None => {
            return Err(XmlError::MissingAttribute {
                element: "member",
                attribute: "type",
            });
        }
    };
    Ok(RawMember {
        kind,
        reference: attrs.required("member", "ref")?,
        role: attrs.get("role").unwrap_or_default().to_owned(),
    })
}

fn parse_changeset(attrs: &Attributes) -> Result<Pending, XmlError> {
    let corners: [Option<f64>; 4] = [
        attrs.optional("changeset", "min_lon")?,
        attrs.optional("changeset", "min_lat")?,
        attrs.optional("changeset", "max_lon")?,
        attrs.optional("changeset", "max_lat")?,
    ];
    let bounds = match corners {
        [Some(min_x), Some(min_y), Some(max_x), Some(max_y)] => Some(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        )),
        _ => None,
    };
    Ok(Pending::Changeset(RawChangeset {
        id: attrs.required("changeset", "id")?,
        bounds,
        tags: Tags::new(),
    }))
}

/// Unescaped attributes of one element.
struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    fn read(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut pairs = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    fn optional<T: FromStr>(
        &self,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<Option<T>, XmlError> {
        self.get(attribute)
            .map(|value| {
                value.parse().map_err(|_| XmlError::InvalidAttribute {
                    element,
                    attribute,
                    value: value.to_owned(),
                })
            })
            .transpose()
    }

    fn required<T: FromStr>(
        &self,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<T, XmlError> {
        self.optional(element, attribute)?
            .ok_or(XmlError::MissingAttribute { element, attribute })
    }

    fn visible(&self) -> Result<bool, XmlError> {
        Ok(self.optional("element", "visible")?.unwrap_or(true))
    }
}
