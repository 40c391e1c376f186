//! Joining multipolygon member ways into closed rings.
//!
//! Members of a multipolygon relation are often split into several open
//! ways. Ways are chained end to end, reversing them where needed, until
//! the chain closes.

use catfix_core::ElementId;

/// Rings recovered from a set of member ways.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct JoinedRings {
    /// Closed rings as node identity sequences.
    pub(super) rings: Vec<Vec<ElementId>>,
    /// Number of chains that could not be closed.
    pub(super) unclosed: usize,
}

fn is_ring(nodes: &[ElementId]) -> bool {
    nodes.len() >= 4 && nodes.first() == nodes.last()
}

/// Join `segments` into closed rings.
pub(super) fn join_rings<'a, I>(segments: I) -> JoinedRings
where
    I: IntoIterator<Item = &'a [ElementId]>,
{
    let mut joined = JoinedRings::default();
    let mut open: Vec<Vec<ElementId>> = Vec::new();
    for segment in segments {
        if is_ring(segment) {
            joined.rings.push(segment.to_vec());
        } else if segment.len() >= 2 {
            open.push(segment.to_vec());
        }
    }

    while !open.is_empty() {
        let mut chain = open.remove(0);
        loop {
            if is_ring(&chain) {
                joined.rings.push(chain);
                break;
            }
            let Some(&tail) = chain.last() else {
                break;
            };
            let next = open
                .iter()
                .position(|segment| segment.first() == Some(&tail) || segment.last() == Some(&tail));
            let Some(index) = next else {
                joined.unclosed += 1;
                break;
            };
            let mut segment = open.remove(index);
            if segment.first() != Some(&tail) {
                segment.reverse();
            }
            chain.extend(segment.into_iter().skip(1));
        }
    }
    joined
}
