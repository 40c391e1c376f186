//! Facade crate for the catfix building-part reconciliation engine.
//!
//! This crate re-exports the core domain types and, behind the `io` feature,
//! the OSM readers and the osmChange writer.

#![forbid(unsafe_code)]

pub use catfix_core::{
    Building, BuildingPart, EditSet, Element, ElementId, ReconcileOptions, ReconcileReport,
    Snapshot, SnapshotBuilder, Tags, Warning, reconcile,
};

#[cfg(feature = "io")]
pub use catfix_data::{OscOptions, read_changeset, write_osc};
