//! Reading OpenStreetMap extracts into reconciliation snapshots.
//!
//! Every node is indexed, every closed way is catalogued with its ring and
//! building or building-part areas are assembled from closed ways and from
//! `type=multipolygon` relations.

use std::collections::HashSet;
use std::io::{self, BufRead, Read};

use camino::{Utf8Path, Utf8PathBuf};
use catfix_core::{AreaId, Snapshot};
use log::info;
use osmpbf::ElementReader;
use thiserror::Error;

mod accumulator;
mod filter;
mod rings;

use accumulator::OsmAccumulator;
pub use filter::parse_building_filter;

use crate::input::{is_bzip2, open_text};
use crate::xml::{Item, XmlError, XmlItems};

/// Raw element counts seen while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OsmReadSummary {
    /// Number of nodes.
    pub nodes: u64,
    /// Number of ways.
    pub ways: u64,
    /// Number of relations.
    pub relations: u64,
}

impl OsmReadSummary {
    const fn combine(self, other: Self) -> Self {
        Self {
            nodes: self.nodes + other.nodes,
            ways: self.ways + other.ways,
            relations: self.relations + other.relations,
        }
    }
}

/// Input encodings recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsmFormat {
    /// OSM XML (`.osm`, `.xml`).
    Xml,
    /// Bzip2-compressed OSM XML (`.osm.bz2`).
    Bzip2Xml,
    /// Protocol buffer binary format (`.pbf`).
    Pbf,
}

impl OsmFormat {
    /// Detect the format of `path` from its extension.
    ///
    /// # Examples
    /// ```
    /// use camino::Utf8Path;
    /// use catfix_data::OsmFormat;
    ///
    /// assert_eq!(OsmFormat::from_path(Utf8Path::new("1.osm.pbf")), Some(OsmFormat::Pbf));
    /// assert_eq!(OsmFormat::from_path(Utf8Path::new("1.osm.bz2")), Some(OsmFormat::Bzip2Xml));
    /// assert_eq!(OsmFormat::from_path(Utf8Path::new("1.osc")), None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        if is_bzip2(path) {
            return Some(Self::Bzip2Xml);
        }
        match path.extension()? {
            "pbf" => Some(Self::Pbf),
            "osm" | "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Errors returned when reading an OpenStreetMap extract.
#[derive(Debug, Error)]
pub enum OsmReadError {
    /// The file extension names no supported format.
    #[error("unsupported OSM file format at {path:?}")]
    UnsupportedFormat {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The file could not be opened.
    #[error("failed to open OSM file at {path:?}")]
    Open {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Input path.
        path: Utf8PathBuf,
    },
    /// The building filter beside the input could not be read.
    #[error("failed to read building filter at {path:?}")]
    Filter {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Filter path.
        path: Utf8PathBuf,
    },
    /// XML decoding failed.
    #[error("failed to decode OSM XML data at {path:?}")]
    Xml {
        /// Decoding error.
        #[source]
        source: XmlError,
        /// Input path.
        path: Utf8PathBuf,
    },
    /// PBF decoding failed.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Pbf {
        /// Decoding error.
        #[source]
        source: osmpbf::Error,
        /// Input path.
        path: Utf8PathBuf,
    },
}

/// Changeset label of an input file: its name up to the first dot.
///
/// # Examples
/// ```
/// use camino::Utf8Path;
/// use catfix_data::changeset_label;
///
/// assert_eq!(changeset_label(Utf8Path::new("data/1234.osm.bz2")), Some("1234"));
/// ```
#[must_use]
pub fn changeset_label(path: &Utf8Path) -> Option<&str> {
    let name = path.file_name()?;
    let label = name.split('.').next().unwrap_or(name);
    (!label.is_empty()).then_some(label)
}

/// Read the snapshot of a downloaded changeset.
///
/// The snapshot is labelled with [`changeset_label`]. When `<label>.txt`
/// exists beside the input, only the buildings it lists are reconciled.
///
/// # Errors
/// Returns [`OsmReadError`] when the input or its filter cannot be read.
pub fn read_changeset(path: &Utf8Path) -> Result<Snapshot, OsmReadError> {
    let label = changeset_label(path).unwrap_or(path.as_str());
    let filter_path = path.with_file_name(format!("{label}.txt"));
    let filter = read_filter(&filter_path)?;
    read_snapshot(path, label, filter)
}

fn read_filter(path: &Utf8Path) -> Result<Option<HashSet<AreaId>>, OsmReadError> {
    let exists = catfix_fs::file_exists(path).map_err(|source| OsmReadError::Filter {
        source,
        path: path.to_path_buf(),
    })?;
    if !exists {
        return Ok(None);
    }
    let mut text = String::new();
    catfix_fs::open_utf8_file(path)
        .and_then(|mut file| file.read_to_string(&mut text))
        .map_err(|source| OsmReadError::Filter {
            source,
            path: path.to_path_buf(),
        })?;
    let filter = parse_building_filter(&text);
    Ok((!filter.is_empty()).then_some(filter))
}

/// Read an extract into a snapshot labelled `label`, restricting the
/// buildings to `filter` when given.
///
/// # Errors
/// Returns [`OsmReadError`] when the file cannot be opened or decoded.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use catfix_data::read_snapshot;
///
/// # fn main() -> Result<(), catfix_data::OsmReadError> {
/// let snapshot = read_snapshot(Utf8Path::new("1234.osm"), "1234", None)?;
/// println!("{} buildings", snapshot.buildings.len());
/// # Ok(())
/// # }
/// ```
pub fn read_snapshot(
    path: &Utf8Path,
    label: &str,
    filter: Option<HashSet<AreaId>>,
) -> Result<Snapshot, OsmReadError> {
    let format = OsmFormat::from_path(path).ok_or_else(|| OsmReadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let accumulator = match format {
        OsmFormat::Pbf => read_pbf(path)?,
        OsmFormat::Xml | OsmFormat::Bzip2Xml => {
            let source = open_text(path).map_err(|source| OsmReadError::Open {
                source,
                path: path.to_path_buf(),
            })?;
            read_xml(source).map_err(|source| OsmReadError::Xml {
                source,
                path: path.to_path_buf(),
            })?
        }
    };
    Ok(finish(accumulator, label, filter))
}

/// Read an OSM XML document from memory or any other buffered source.
///
/// # Errors
/// Returns [`XmlError`] when the document cannot be decoded.
///
/// # Examples
/// ```
/// use catfix_data::read_xml_snapshot;
///
/// let document = r#"<osm version="0.6">
///   <node id="1" lat="0" lon="0"/><node id="2" lat="0" lon="0.001"/>
///   <node id="3" lat="0.001" lon="0.001"/>
///   <way id="9"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
///     <tag k="building" v="yes"/></way>
/// </osm>"#;
/// let snapshot = read_xml_snapshot(document.as_bytes(), "9", None)?;
/// assert_eq!(snapshot.buildings.len(), 1);
/// # Ok::<(), catfix_data::XmlError>(())
/// ```
pub fn read_xml_snapshot<R: BufRead>(
    source: R,
    label: &str,
    filter: Option<HashSet<AreaId>>,
) -> Result<Snapshot, XmlError> {
    Ok(finish(read_xml(source)?, label, filter))
}

fn read_xml<R: BufRead>(source: R) -> Result<OsmAccumulator, XmlError> {
    let mut accumulator = OsmAccumulator::default();
    for item in XmlItems::new(source) {
        if let Item::Element { element, .. } = item? {
            accumulator.push(element);
        }
    }
    Ok(accumulator)
}

fn read_pbf(path: &Utf8Path) -> Result<OsmAccumulator, OsmReadError> {
    let file = catfix_fs::open_utf8_file(path).map_err(|source| OsmReadError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    ElementReader::new(io::BufReader::new(file))
        .par_map_reduce(
            |element| {
                let mut accumulator = OsmAccumulator::default();
                accumulator.process_element(element);
                accumulator
            },
            OsmAccumulator::default,
            OsmAccumulator::combine,
        )
        .map_err(|source| OsmReadError::Pbf {
            source,
            path: path.to_path_buf(),
        })
}

fn finish(accumulator: OsmAccumulator, label: &str, filter: Option<HashSet<AreaId>>) -> Snapshot {
    let summary = accumulator.summary();
    let snapshot = accumulator.into_snapshot(label, filter);
    info!(
        "{label}: read {} nodes, {} ways, {} relations; {} buildings and {} parts",
        summary.nodes,
        summary.ways,
        summary.relations,
        snapshot.buildings.len(),
        snapshot.parts.len()
    );
    snapshot
}

#[cfg(test)]
mod tests;
