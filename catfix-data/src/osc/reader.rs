//! osmChange parsing.

use std::io::BufRead;

use camino::Utf8Path;
use catfix_core::{Action, Change, Element, Member, Relation, Role};
use log::{debug, warn};

use super::OscError;
use crate::input::open_text;
use crate::xml::{Item, RawElement, RawRelation, Section, XmlItems};

/// One change read from an osmChange document.
#[derive(Debug, Clone, PartialEq)]
pub struct OscChange {
    /// Block the element appeared in.
    pub action: Action,
    /// The element itself.
    pub element: Element,
    /// Value of the `visible` attribute, `true` when absent.
    pub visible: bool,
}

impl OscChange {
    /// Borrow the change in the shape the writer accepts.
    #[must_use]
    pub const fn as_change(&self) -> Change<'_> {
        Change {
            action: self.action,
            element: self.element.as_ref(),
        }
    }
}

/// Read the `create` and `modify` blocks of an osmChange document.
///
/// Deleted elements are skipped. Relation members whose role is neither
/// `outer` nor `inner` are dropped with a warning.
///
/// # Errors
/// Returns [`OscError::Parse`] when the document cannot be decoded.
///
/// # Examples
/// ```
/// use catfix_core::Action;
/// use catfix_data::read_osc;
///
/// let document = r#"<osmChange version="0.6">
///   <create><node id="-1" lat="40.1" lon="-3.2"/></create>
///   <modify><way id="7" version="2"><nd ref="1"/></way></modify>
/// </osmChange>"#;
/// let changes = read_osc(document.as_bytes())?;
/// let actions: Vec<Action> = changes.iter().map(|change| change.action).collect();
/// assert_eq!(actions, vec![Action::Create, Action::Modify]);
/// # Ok::<(), catfix_data::OscError>(())
/// ```
pub fn read_osc<R: BufRead>(source: R) -> Result<Vec<OscChange>, OscError> {
    let mut changes = Vec::new();
    let mut section = None;
    for item in XmlItems::new(source) {
        match item.map_err(|source| OscError::Parse { source })? {
            Item::Enter(entered) => section = Some(entered),
            Item::Leave => section = None,
            Item::Element { element, visible } => {
                let action = match section {
                    Some(Section::Create) => Action::Create,
                    Some(Section::Modify) => Action::Modify,
                    Some(Section::Delete) | None => {
                        debug!("skipping element outside create and modify blocks");
                        continue;
                    }
                };
                changes.push(OscChange {
                    action,
                    element: convert(element),
                    visible,
                });
            }
            Item::Changeset(_) => {}
        }
    }
    Ok(changes)
}

/// Read an osmChange file, decompressing `.bz2` archives.
///
/// # Errors
/// Returns [`OscError`] when the file cannot be opened or decoded.
pub fn read_osc_file(path: &Utf8Path) -> Result<Vec<OscChange>, OscError> {
    let source = open_text(path).map_err(|source| OscError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    read_osc(source)
}

fn convert(element: RawElement) -> Element {
    match element {
        RawElement::Node(node) => Element::Node(node),
        RawElement::Way(way) => Element::Way(way),
        RawElement::Relation(relation) => Element::Relation(ring_relation(relation)),
    }
}

fn ring_relation(raw: RawRelation) -> Relation {
    let members = raw
        .members
        .into_iter()
        .filter_map(|member| {
            let role = Role::parse(&member.role);
            if role.is_none() {
                warn!(
                    "relation {} drops member {} {} with role {:?}",
                    raw.id, member.kind, member.reference, member.role
                );
            }
            role.map(|role| Member {
                kind: member.kind,
                reference: member.reference,
                role,
            })
        })
        .collect();
    let mut relation = Relation::pending(members, raw.tags);
    relation.id = Some(raw.id);
    relation.version = raw.version;
    relation
}
