//! osmChange serialisation.

use std::io::Write;

use catfix_core::{Action, Change, ElementId, ElementKind, ElementRef, Tags};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use super::OscError;

/// Generator name written into every document.
pub const GENERATOR: &str = concat!("catfix/", env!("CARGO_PKG_VERSION"));

/// Document-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscOptions<'a> {
    /// Value of the `generator` attribute.
    pub generator: &'a str,
    /// Changeset every element is attributed to, required for uploads.
    pub changeset: Option<ElementId>,
}

impl Default for OscOptions<'_> {
    fn default() -> Self {
        Self {
            generator: GENERATOR,
            changeset: None,
        }
    }
}

impl OscOptions<'_> {
    /// Attribute every element to changeset `id`.
    #[must_use]
    pub const fn for_changeset(mut self, id: ElementId) -> Self {
        self.changeset = Some(id);
        self
    }
}

/// Write `changes` as an osmChange document.
///
/// Creations are written in a `<create>` block followed by modifications
/// in a `<modify>` block, each keeping the order of `changes`. Empty blocks
/// are omitted.
///
/// # Errors
/// Returns [`OscError`] when the sink fails or an element has no identity.
///
/// # Examples
/// ```
/// use catfix_core::{EditSet, Tags, Way};
/// use catfix_data::{OscOptions, write_osc};
///
/// let mut edits = EditSet::new();
/// edits.add(Way::pending(vec![1, 2, 3, 1], Tags::new()));
/// let mut document = Vec::new();
/// write_osc(&mut document, edits.exported(false), OscOptions::default())?;
/// let text = String::from_utf8(document).expect("UTF-8 output");
/// assert!(text.contains(r#"<way id="-1">"#));
/// # Ok::<(), catfix_data::OscError>(())
/// ```
pub fn write_osc<'a, W, I>(sink: W, changes: I, options: OscOptions<'_>) -> Result<(), OscError>
where
    W: Write,
    I: IntoIterator<Item = Change<'a>>,
{
    let (creates, modifies): (Vec<Change<'a>>, Vec<Change<'a>>) = changes
        .into_iter()
        .partition(|change| change.action == Action::Create);

    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("osmChange");
    root.push_attribute(("version", "0.6"));
    root.push_attribute(("generator", options.generator));
    writer.write_event(Event::Start(root))?;
    for (action, block) in [(Action::Create, creates), (Action::Modify, modifies)] {
        if block.is_empty() {
            continue;
        }
        writer.write_event(Event::Start(BytesStart::new(action.as_str())))?;
        for change in block {
            write_element(&mut writer, change.element, options.changeset)?;
        }
        writer.write_event(Event::End(BytesEnd::new(action.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new("osmChange")))?;
    Ok(())
}

/// Write the `<osm><changeset>` document used to open a changeset.
///
/// # Errors
/// Returns [`OscError::Write`] when the sink fails.
pub fn write_changeset_document<W: Write>(sink: W, tags: &Tags) -> Result<(), OscError> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("osm")))?;
    write_body(
        &mut writer,
        BytesStart::new("changeset"),
        tag_children(tags),
    )?;
    writer.write_event(Event::End(BytesEnd::new("osm")))?;
    Ok(())
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: ElementRef<'_>,
    changeset: Option<ElementId>,
) -> Result<(), OscError> {
    let (kind, version, tags) = match element {
        ElementRef::Node(node) => (ElementKind::Node, node.version, &node.tags),
        ElementRef::Way(way) => (ElementKind::Way, way.version, &way.tags),
        ElementRef::Relation(relation) => {
            (ElementKind::Relation, relation.version, &relation.tags)
        }
    };
    let id = element.id().ok_or(OscError::MissingId { kind })?;

    let mut start = BytesStart::new(kind.as_str());
    start.push_attribute(("id", id.to_string().as_str()));
    if let Some(version) = version {
        start.push_attribute(("version", version.to_string().as_str()));
    }
    if let Some(changeset) = changeset {
        start.push_attribute(("changeset", changeset.to_string().as_str()));
    }

    let mut children = Vec::new();
    match element {
        ElementRef::Node(node) => {
            start.push_attribute(("lat", format!("{:.7}", node.location.y).as_str()));
            start.push_attribute(("lon", format!("{:.7}", node.location.x).as_str()));
        }
        ElementRef::Way(way) => {
            for reference in &way.nodes {
                let mut nd = BytesStart::new("nd");
                nd.push_attribute(("ref", reference.to_string().as_str()));
                children.push(nd);
            }
        }
        ElementRef::Relation(relation) => {
            for member in &relation.members {
                let mut entry = BytesStart::new("member");
                entry.push_attribute(("type", member.kind.as_str()));
                entry.push_attribute(("ref", member.reference.to_string().as_str()));
                entry.push_attribute(("role", member.role.as_str()));
                children.push(entry);
            }
        }
    }
    children.extend(tag_children(tags));
    write_body(writer, start, children)
}

fn tag_children(tags: &Tags) -> Vec<BytesStart<'static>> {
    tags.iter()
        .map(|(key, value)| {
            let mut tag = BytesStart::new("tag");
            tag.push_attribute(("k", key.as_str()));
            tag.push_attribute(("v", value.as_str()));
            tag
        })
        .collect()
}

fn write_body<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    children: Vec<BytesStart<'static>>,
) -> Result<(), OscError> {
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    for child in children {
        writer.write_event(Event::Empty(child))?;
    }
    writer.write_event(Event::End(end))?;
    Ok(())
}
