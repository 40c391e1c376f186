//! Changeset-level reconciliation.
//!
//! Every building of a snapshot is diffed against its parts and the
//! residual is staged in one edit-set. A building whose residual cannot be
//! expressed with known nodes contributes nothing: its staged elements are
//! rolled back and the failure is counted. Any counted failure makes the
//! whole edit-set unfit for export.

use log::{error, info, warn};

use crate::builder::EditBuilder;
use crate::diff::{Residual, residual_polygons, residual_tags};
use crate::edit_set::EditSet;
use crate::element::{Building, LEVELS_PREFIX};
use crate::error::{BuildError, Warning};
use crate::geometry::DEFAULT_ANGLE_THRESHOLD;
use crate::snapshot::Snapshot;

/// Tunables of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOptions {
    /// Smallest vertex angle, in degrees, accepted without a warning.
    pub angle_threshold: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
        }
    }
}

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Staged changes.
    pub edits: EditSet,
    /// Number of counted failures.
    pub errors: usize,
    /// Non-fatal findings.
    pub warnings: Vec<Warning>,
}

impl ReconcileReport {
    /// Whether the edit-set may be written out.
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        self.errors == 0 && self.edits.has_geometry()
    }
}

/// Reconcile every building of `snapshot`.
///
/// # Examples
///
/// ```
/// use catfix_core::{ReconcileOptions, SnapshotBuilder, reconcile};
///
/// let snapshot = SnapshotBuilder::new("1").build();
/// let report = reconcile(&snapshot, ReconcileOptions::default());
/// assert_eq!(report.errors, 0);
/// assert!(!report.is_exportable());
/// ```
#[must_use]
pub fn reconcile(snapshot: &Snapshot, options: ReconcileOptions) -> ReconcileReport {
    let builder = EditBuilder::new(&snapshot.catalog, options.angle_threshold);
    let mut report = ReconcileReport::default();
    for building in &snapshot.buildings {
        let checkpoint = report.edits.checkpoint();
        let mut warnings = Vec::new();
        match reconcile_building(snapshot, &builder, building, &mut report.edits, &mut warnings) {
            Ok(()) => report.edits.commit(checkpoint),
            Err(err) => {
                report.edits.rollback(checkpoint);
                report.errors += err.error_count();
                error!("{}: {}: {err}", snapshot.label, building.id);
                if let BuildError::UnmatchedVertices { coords } = &err {
                    for coord in coords {
                        error!("{}: unmatched vertex {:.7} {:.7}", snapshot.label, coord.y, coord.x);
                    }
                }
            }
        }
        for warning in &warnings {
            warn!("{}: {}: {warning}", snapshot.label, building.id);
        }
        report.warnings.extend(warnings);
    }
    info!(
        "{}: {} buildings, {} nodes, {} ways, {} relations, {} errors, {} warnings",
        snapshot.label,
        snapshot.buildings.len(),
        report.edits.nodes().len(),
        report.edits.ways().len(),
        report.edits.relations().len(),
        report.errors,
        report.warnings.len()
    );
    report
}

fn reconcile_building(
    snapshot: &Snapshot,
    builder: &EditBuilder<'_>,
    building: &Building,
    edits: &mut EditSet,
    warnings: &mut Vec<Warning>,
) -> Result<(), BuildError> {
    let polygons = match residual_polygons(building, &snapshot.parts)? {
        Residual::Untouched | Residual::Covered => return Ok(()),
        Residual::Missing(polygons) => polygons,
    };
    if !building.tags.contains_key(LEVELS_PREFIX) {
        warnings.push(Warning::MissingLevels {
            building: building.id,
        });
    }
    let tags = residual_tags(building);
    for polygon in &polygons {
        builder.build_edits(edits, polygon, &tags, warnings)?;
    }
    Ok(())
}
