//! Behaviour tests driven by the feature files under `tests/features`.

mod reconcile_behaviour;
