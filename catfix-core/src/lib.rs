//! Building-part reconciliation for OpenStreetMap data.
//!
//! Given a snapshot of existing map elements, each building footprint is
//! compared with the `building:part` outlines recorded inside it. The
//! portion no part covers is turned into new or reused closed ways and
//! multipolygon relations, collected in an [`EditSet`] ready to be written
//! as an osmChange document.
//!
//! The crate performs no I/O. Readers, writers and the network client live
//! in `catfix-data`.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod builder;
pub mod catalog;
pub mod diff;
pub mod edit_set;
pub mod element;
pub mod error;
pub mod geometry;
pub mod reconcile;
pub mod snapshot;
pub mod spatial_index;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use builder::{Built, EditBuilder};
pub use catalog::Catalog;
pub use diff::{PartLayer, Residual, residual_polygons, residual_tags};
pub use edit_set::{Action, Change, Checkpoint, EditSet};
pub use element::{
    Area, AreaId, BUILDING_KEY, BUILDING_PART_KEY, Building, BuildingPart, Element, ElementId,
    ElementKind, ElementRef, LEVELS_PREFIX, Member, Node, Relation, Role, Tags, Way,
    is_persisted,
};
pub use error::{BuildError, Warning};
pub use geometry::{
    DEFAULT_ANGLE_THRESHOLD, GRID_SCALE, GridCoord, LocatedWay, NarrowVertex, ToPolygon,
    narrow_vertices, snap_multi_polygon, snap_polygon, snap_ring, vertex_angle,
};
pub use reconcile::{ReconcileOptions, ReconcileReport, reconcile};
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use spatial_index::SpatialIndex;

#[cfg(test)]
mod tests;
