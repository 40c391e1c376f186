//! Property-based tests for the edit-set.
//!
//! # Invariants tested
//!
//! - **Identifier monotonicity:** pending identities are handed out as
//!   -1, -2, ... across nodes, ways and relations.
//! - **Rollback:** rolling back to a checkpoint restores the staged elements
//!   and the identity counter, whatever was staged afterwards.

use catfix_core::{EditSet, ElementId, Member, Node, Relation, Role, Tags, Way};
use geo::Coord;
use proptest::prelude::*;

/// One staging operation.
#[derive(Debug, Clone)]
enum Op {
    PendingWay,
    PendingRelation,
    PersistedNode(ElementId),
    PersistedWay(ElementId, bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::PendingWay),
        Just(Op::PendingRelation),
        (1_i64..50).prop_map(Op::PersistedNode),
        (1_i64..50, any::<bool>()).prop_map(|(id, modified)| Op::PersistedWay(id, modified)),
    ]
}

fn apply(edits: &mut EditSet, op: &Op) -> ElementId {
    match op {
        Op::PendingWay => edits.add(Way::pending(vec![1, 2, 3, 1], Tags::new())),
        Op::PendingRelation => edits.add(Relation::pending(
            vec![Member::way(1, Role::Outer)],
            Tags::from([("type".into(), "multipolygon".into())]),
        )),
        Op::PersistedNode(id) => edits.add(Node::new(*id, Coord { x: 0.0, y: 0.0 }, Tags::new())),
        Op::PersistedWay(id, modified) => {
            let mut way = Way::new(*id, vec![1, 2, 3, 1], Tags::new());
            way.modified = *modified;
            edits.add(way)
        }
    }
}

fn is_pending(op: &Op) -> bool {
    matches!(op, Op::PendingWay | Op::PendingRelation)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: pending identities form the sequence -1, -2, ... in staging
    /// order, unaffected by persisted elements staged in between.
    #[test]
    fn pending_ids_strictly_decrease(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut edits = EditSet::new();
        let assigned: Vec<ElementId> = ops
            .iter()
            .filter_map(|op| {
                let id = apply(&mut edits, op);
                is_pending(op).then_some(id)
            })
            .collect();
        let expected: Vec<ElementId> = (1..=assigned.len())
            .map(|n| -i64::try_from(n).unwrap_or(i64::MAX))
            .collect();
        prop_assert_eq!(assigned, expected);
    }

    /// Property: no element is staged twice.
    #[test]
    fn staged_ids_are_unique(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut edits = EditSet::new();
        for op in &ops {
            apply(&mut edits, op);
        }
        let mut nodes: Vec<_> = edits.nodes().iter().map(|node| node.id).collect();
        let mut ways: Vec<_> = edits.ways().iter().map(|way| way.id).collect();
        let (node_count, way_count) = (nodes.len(), ways.len());
        nodes.sort_unstable();
        nodes.dedup();
        ways.sort_unstable();
        ways.dedup();
        prop_assert_eq!(nodes.len(), node_count);
        prop_assert_eq!(ways.len(), way_count);
    }

    /// Property: rollback restores the exact state at the checkpoint.
    #[test]
    fn rollback_restores_checkpoint_state(
        before in prop::collection::vec(op_strategy(), 0..20),
        after in prop::collection::vec(op_strategy(), 0..20),
    ) {
        let mut edits = EditSet::new();
        for op in &before {
            apply(&mut edits, op);
        }
        let snapshot = edits.clone();
        let checkpoint = edits.checkpoint();
        for op in &after {
            apply(&mut edits, op);
        }
        edits.rollback(checkpoint);

        prop_assert_eq!(edits.nodes(), snapshot.nodes());
        prop_assert_eq!(edits.ways(), snapshot.ways());
        prop_assert_eq!(edits.relations(), snapshot.relations());
        let mut replay = snapshot;
        prop_assert_eq!(
            edits.add(Way::pending(Vec::new(), Tags::new())),
            replay.add(Way::pending(Vec::new(), Tags::new()))
        );
    }
}
