//! Data access for the catfix reconciliation engine.
//!
//! Responsibilities:
//! - Read OpenStreetMap extracts (XML, bzip2-compressed XML and PBF) into a
//!   [`catfix_core::Snapshot`].
//! - Serialise edit-sets as osmChange documents and read them back.
//! - Scan changeset dumps for Cadastre import changesets.
//! - Talk to the OSM API and Overpass over HTTP.
//!
//! Boundaries:
//! - Do not encode reconciliation rules (live in `catfix-core`).
//! - Network access goes through the [`api::MapApi`] trait so workflows can
//!   be exercised without a server.
//!
//! Invariants:
//! - No global mutable state; clients are constructed by the caller.

pub mod api;
pub mod history;
mod input;
pub mod osc;
pub mod osm;
mod xml;

pub use history::{HistoryError, IMPORT_SOURCE, import_changesets, list_import_changesets};
pub use osc::{OscChange, OscError, OscOptions, read_osc, read_osc_file, write_osc};
pub use osm::{
    OsmFormat, OsmReadError, OsmReadSummary, changeset_label, parse_building_filter, read_changeset,
    read_snapshot, read_xml_snapshot,
};
pub use xml::XmlError;
