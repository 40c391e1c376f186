//! Residual footprint computation.
//!
//! For each building the recorded parts are subtracted from the footprint.
//! Whatever remains is the portion no part describes yet; it is snapped
//! onto the OSM grid and split into its constituent polygons.

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Polygon, Relate};

use crate::element::{BUILDING_PART_KEY, Building, BuildingPart, Tags};
use crate::error::BuildError;
use crate::geometry::{is_well_formed, snap_multi_polygon};
use crate::spatial_index::SpatialIndex;

/// Recorded building parts with a bounding-box index.
#[derive(Debug, Default)]
pub struct PartLayer {
    parts: Vec<BuildingPart>,
    index: SpatialIndex<usize>,
}

impl PartLayer {
    /// Index a set of parts.
    #[must_use]
    pub fn new(parts: Vec<BuildingPart>) -> Self {
        let mut index = SpatialIndex::default();
        for (position, part) in parts.iter().enumerate() {
            if let Some(bbox) = part.footprint.bounding_rect() {
                index.insert(position, bbox);
            }
        }
        Self { parts, index }
    }

    /// All parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[BuildingPart] {
        &self.parts
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the layer holds no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts whose bounding box meets the building's, ordered by identity.
    fn candidates(&self, building: &Building) -> Vec<&BuildingPart> {
        let Some(bbox) = building.footprint.bounding_rect() else {
            return Vec::new();
        };
        let mut found: Vec<&BuildingPart> = self
            .index
            .query(&bbox)
            .into_iter()
            .filter_map(|position| self.parts.get(position))
            .collect();
        found.sort_by_key(|part| part.id);
        found
    }
}

/// Outcome of subtracting the parts from one building.
#[derive(Debug, Clone, PartialEq)]
pub enum Residual {
    /// No part reduced the footprint.
    Untouched,
    /// The parts cover the whole footprint.
    Covered,
    /// Polygons of the footprint that no part covers, snapped to the grid.
    Missing(Vec<Polygon<f64>>),
}

/// Subtract every overlapping part from `building`.
///
/// # Errors
///
/// Returns [`BuildError::InvalidGeometry`] when a residual polygon has a
/// ring that no longer bounds an area once snapped to the grid.
///
/// # Examples
///
/// ```
/// use geo::{MultiPolygon, polygon};
/// use catfix_core::{AreaId, Building, BuildingPart, PartLayer, Residual, Tags, residual_polygons};
///
/// let footprint = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)];
/// let part = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
/// let building = Building {
///     id: AreaId::way(1),
///     footprint: MultiPolygon::new(vec![footprint]),
///     tags: Tags::new(),
/// };
/// let parts = PartLayer::new(vec![BuildingPart {
///     id: AreaId::way(2),
///     footprint: MultiPolygon::new(vec![part]),
/// }]);
/// let Ok(Residual::Missing(polygons)) = residual_polygons(&building, &parts) else {
///     panic!("expected a residual");
/// };
/// assert_eq!(polygons.len(), 1);
/// ```
pub fn residual_polygons(building: &Building, parts: &PartLayer) -> Result<Residual, BuildError> {
    let mut diff = building.footprint.clone();
    for part in parts.candidates(building) {
        if !part.footprint.intersects(&diff) {
            continue;
        }
        diff = diff.difference(&part.footprint);
        if diff.0.is_empty() {
            return Ok(Residual::Covered);
        }
    }
    let snapped = snap_multi_polygon(&diff);
    if snapped.0.is_empty() {
        return Ok(Residual::Covered);
    }
    let well_formed = snapped.0.iter().all(|polygon| {
        is_well_formed(polygon.exterior()) && polygon.interiors().iter().all(is_well_formed)
    });
    if !well_formed {
        return Err(BuildError::InvalidGeometry {
            building: building.id,
        });
    }
    if same_area(&snapped, &snap_multi_polygon(&building.footprint)) {
        return Ok(Residual::Untouched);
    }
    Ok(Residual::Missing(snapped.0))
}

fn same_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.relate(b).is_equal_topo()
}

/// Tags carried by the parts generated for `building`.
#[must_use]
pub fn residual_tags(building: &Building) -> Tags {
    let mut tags = building.tags.clone();
    tags.insert(BUILDING_PART_KEY.to_owned(), "yes".to_owned());
    tags
}
