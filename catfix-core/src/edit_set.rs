//! Accumulated map changes ready for export.
//!
//! Elements enter the set through [`EditSet::add`], which hands out pending
//! identities (-1, -2, ...) from a single counter shared by nodes, ways and
//! relations. Adding an element whose identity is already staged replaces
//! the staged copy, so every element appears once.
//!
//! A [`Checkpoint`] marks the state before a unit of work; rolling back to it
//! discards everything staged since, including replacements, and rewinds the
//! identity counter.

use std::collections::HashMap;

use crate::element::{
    Element, ElementId, ElementKind, ElementRef, Node, Relation, Way, is_persisted,
};

/// Upload action of an exported element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The element does not exist upstream yet.
    Create,
    /// The element exists upstream and carries changes.
    Modify,
}

impl Action {
    /// Action implied by an element identity.
    #[must_use]
    pub const fn for_id(id: ElementId) -> Self {
        if is_persisted(id) {
            Self::Modify
        } else {
            Self::Create
        }
    }

    /// Block name used by osmChange documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
        }
    }
}

/// An element selected for export together with its action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change<'a> {
    /// Upload action.
    pub action: Action,
    /// Exported element.
    pub element: ElementRef<'a>,
}

/// Opaque marker returned by [`EditSet::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    nodes: usize,
    ways: usize,
    relations: usize,
    next_id: ElementId,
    journal: usize,
}

#[derive(Debug, Clone)]
enum Replaced {
    Node(usize, Node),
    Way(usize, Way),
    Relation(usize, Relation),
}

/// Ordered collections of staged nodes, ways and relations.
#[derive(Debug, Clone)]
pub struct EditSet {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
    next_id: ElementId,
    positions: HashMap<(ElementKind, ElementId), usize>,
    journal: Vec<Replaced>,
}

impl Default for EditSet {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
            next_id: -1,
            positions: HashMap::new(),
            journal: Vec::new(),
        }
    }
}

trait Staged: Clone {
    const KIND: ElementKind;

    fn staged_id(&self) -> Option<ElementId>;
    fn assign_id(&mut self, id: ElementId);
    fn slots(set: &mut EditSet) -> &mut Vec<Self>;
    fn replaced(index: usize, previous: Self) -> Replaced;
}

impl Staged for Node {
    const KIND: ElementKind = ElementKind::Node;

    fn staged_id(&self) -> Option<ElementId> {
        self.id
    }

    fn assign_id(&mut self, id: ElementId) {
        self.id = Some(id);
    }

    fn slots(set: &mut EditSet) -> &mut Vec<Self> {
        &mut set.nodes
    }

    fn replaced(index: usize, previous: Self) -> Replaced {
        Replaced::Node(index, previous)
    }
}

impl Staged for Way {
    const KIND: ElementKind = ElementKind::Way;

    fn staged_id(&self) -> Option<ElementId> {
        self.id
    }

    fn assign_id(&mut self, id: ElementId) {
        self.id = Some(id);
    }

    fn slots(set: &mut EditSet) -> &mut Vec<Self> {
        &mut set.ways
    }

    fn replaced(index: usize, previous: Self) -> Replaced {
        Replaced::Way(index, previous)
    }
}

impl Staged for Relation {
    const KIND: ElementKind = ElementKind::Relation;

    fn staged_id(&self) -> Option<ElementId> {
        self.id
    }

    fn assign_id(&mut self, id: ElementId) {
        self.id = Some(id);
    }

    fn slots(set: &mut EditSet) -> &mut Vec<Self> {
        &mut set.relations
    }

    fn replaced(index: usize, previous: Self) -> Replaced {
        Replaced::Relation(index, previous)
    }
}

impl EditSet {
    /// Create an empty edit-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an element and return its identity.
    ///
    /// Elements without identity receive the next pending id. An element
    /// whose identity is already staged replaces the staged copy in place.
    pub fn add(&mut self, element: impl Into<Element>) -> ElementId {
        match element.into() {
            Element::Node(node) => self.stage(node),
            Element::Way(way) => self.stage(way),
            Element::Relation(relation) => self.stage(relation),
        }
    }

    fn stage<T: Staged>(&mut self, mut item: T) -> ElementId {
        let id = match item.staged_id() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id -= 1;
                item.assign_id(id);
                id
            }
        };
        let key = (T::KIND, id);
        if let Some(&index) = self.positions.get(&key) {
            if let Some(slot) = T::slots(self).get_mut(index) {
                let previous = std::mem::replace(slot, item);
                self.journal.push(T::replaced(index, previous));
            }
        } else {
            let slots = T::slots(self);
            slots.push(item);
            let index = slots.len() - 1;
            self.positions.insert(key, index);
        }
        id
    }

    /// Mark the current state for a later [`rollback`](Self::rollback).
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len(),
            ways: self.ways.len(),
            relations: self.relations.len(),
            next_id: self.next_id,
            journal: self.journal.len(),
        }
    }

    /// Keep everything staged since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.journal);
    }

    /// Discard everything staged since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        for node in self.nodes.drain(checkpoint.nodes..) {
            if let Some(id) = node.id {
                self.positions.remove(&(ElementKind::Node, id));
            }
        }
        for way in self.ways.drain(checkpoint.ways..) {
            if let Some(id) = way.id {
                self.positions.remove(&(ElementKind::Way, id));
            }
        }
        for relation in self.relations.drain(checkpoint.relations..) {
            if let Some(id) = relation.id {
                self.positions.remove(&(ElementKind::Relation, id));
            }
        }
        while self.journal.len() > checkpoint.journal {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                Replaced::Node(index, previous) => restore(&mut self.nodes, index, previous),
                Replaced::Way(index, previous) => restore(&mut self.ways, index, previous),
                Replaced::Relation(index, previous) => {
                    restore(&mut self.relations, index, previous);
                }
            }
        }
        self.next_id = checkpoint.next_id;
    }

    /// Staged nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Staged ways in insertion order.
    #[must_use]
    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    /// Staged relations in insertion order.
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Look up a staged way.
    #[must_use]
    pub fn way(&self, id: ElementId) -> Option<&Way> {
        self.positions
            .get(&(ElementKind::Way, id))
            .and_then(|&index| self.ways.get(index))
    }

    /// Whether a node with this identity is staged.
    #[must_use]
    pub fn contains_node(&self, id: ElementId) -> bool {
        self.positions.contains_key(&(ElementKind::Node, id))
    }

    /// Whether any way or relation would be exported as a change.
    ///
    /// Reused ways staged without the modified flag do not count.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        !self.relations.is_empty()
            || self
                .ways
                .iter()
                .any(|way| way.modified || way.id.is_some_and(|id| !is_persisted(id)))
    }

    /// Total number of staged elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements to write out: nodes, then ways, then relations.
    ///
    /// Pending elements are always exported; persisted ways only when
    /// flagged as modified. `include_existing` exports everything staged.
    #[must_use]
    pub fn exported(&self, include_existing: bool) -> Vec<Change<'_>> {
        let nodes = self
            .nodes
            .iter()
            .filter(|node| include_existing || node.id.is_some_and(|id| !is_persisted(id)))
            .map(ElementRef::Node);
        let ways = self
            .ways
            .iter()
            .filter(|way| {
                include_existing || way.modified || way.id.is_some_and(|id| !is_persisted(id))
            })
            .map(ElementRef::Way);
        let relations = self
            .relations
            .iter()
            .filter(|relation| {
                include_existing || relation.id.is_some_and(|id| !is_persisted(id))
            })
            .map(ElementRef::Relation);
        nodes
            .chain(ways)
            .chain(relations)
            .filter_map(|element| {
                element.id().map(|id| Change {
                    action: Action::for_id(id),
                    element,
                })
            })
            .collect()
    }
}

fn restore<T>(items: &mut [T], index: usize, previous: T) {
    if let Some(slot) = items.get_mut(index) {
        *slot = previous;
    }
}
