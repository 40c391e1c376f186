//! Geometry adapter.
//!
//! Turns the different shapes in which footprints arrive (closed ways with
//! located nodes, multi-ring area records, raw coordinate sequences) into
//! `geo` polygons, and provides the grid snapping and vertex checks used by
//! the diff engine.
//!
//! OSM stores coordinates as fixed-point integers with a resolution of
//! 1e-7 degrees. [`GridCoord`] mirrors that representation so coordinate
//! comparisons are exact.

use std::collections::HashMap;

use geo::{Coord, Intersects, LineString, MultiPolygon, Polygon, Winding};

use crate::element::{Area, ElementId, Way};

/// Grid units per degree.
pub const GRID_SCALE: f64 = 1.0e7;

/// Default minimum angle, in degrees, accepted at a ring vertex.
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 5.0;

/// A coordinate on the OSM fixed-point grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    /// Longitude in 1e-7 degrees.
    pub x: i64,
    /// Latitude in 1e-7 degrees.
    pub y: i64,
}

impl GridCoord {
    /// Round a WGS84 coordinate onto the grid.
    #[must_use]
    pub fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            x: (coord.x * GRID_SCALE).round() as i64,
            y: (coord.y * GRID_SCALE).round() as i64,
        }
    }

    /// Convert back to degrees.
    #[must_use]
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.x as f64 / GRID_SCALE,
            y: self.y as f64 / GRID_SCALE,
        }
    }

    /// The grid position expressed in grid units, as used by the node index.
    #[must_use]
    pub fn as_units(self) -> Coord<f64> {
        Coord {
            x: self.x as f64,
            y: self.y as f64,
        }
    }
}

impl From<Coord<f64>> for GridCoord {
    fn from(coord: Coord<f64>) -> Self {
        Self::from_coord(coord)
    }
}

/// Conversion of a footprint source into polygon geometry.
pub trait ToPolygon {
    /// Polygonal output type.
    type Output;

    /// Build the polygon, or `None` when the source does not describe one.
    fn to_polygon(&self) -> Option<Self::Output>;
}

/// A way paired with the node locations needed to trace it.
#[derive(Debug, Clone, Copy)]
pub struct LocatedWay<'a> {
    /// The way to trace.
    pub way: &'a Way,
    /// Known node locations.
    pub locations: &'a HashMap<ElementId, Coord<f64>>,
}

impl ToPolygon for LocatedWay<'_> {
    type Output = Polygon<f64>;

    fn to_polygon(&self) -> Option<Polygon<f64>> {
        if !self.way.is_closed() {
            return None;
        }
        let ring = self
            .way
            .nodes
            .iter()
            .map(|id| self.locations.get(id).copied())
            .collect::<Option<Vec<_>>>()?;
        Some(Polygon::new(LineString::new(ring), Vec::new()))
    }
}

impl ToPolygon for [Coord<f64>] {
    type Output = Polygon<f64>;

    fn to_polygon(&self) -> Option<Polygon<f64>> {
        if self.is_empty() {
            return None;
        }
        Some(Polygon::new(LineString::from(self.to_vec()), Vec::new()))
    }
}

impl ToPolygon for Area {
    type Output = MultiPolygon<f64>;

    fn to_polygon(&self) -> Option<MultiPolygon<f64>> {
        let mut polygons: Vec<Polygon<f64>> = self
            .outers
            .iter()
            .filter_map(|ring| ring.as_slice().to_polygon())
            .collect();
        if polygons.is_empty() {
            return None;
        }
        for inner in &self.inners {
            let Some(first) = inner.first() else {
                continue;
            };
            if let Some(owner) = polygons
                .iter_mut()
                .find(|polygon| polygon.intersects(first))
            {
                owner.interiors_push(LineString::from(inner.clone()));
            }
        }
        Some(MultiPolygon::new(polygons))
    }
}

/// Round every vertex onto the grid and drop consecutive duplicates.
///
/// Rings keep their winding and closure.
#[must_use]
pub fn snap_ring(ring: &LineString<f64>) -> LineString<f64> {
    let mut snapped: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for coord in ring.coords() {
        let on_grid = GridCoord::from_coord(*coord).to_coord();
        if snapped.last() != Some(&on_grid) {
            snapped.push(on_grid);
        }
    }
    LineString::new(snapped)
}

/// Snap every ring of a polygon onto the grid.
#[must_use]
pub fn snap_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    Polygon::new(
        snap_ring(polygon.exterior()),
        polygon.interiors().iter().map(snap_ring).collect(),
    )
}

/// Snap every polygon of a multipolygon onto the grid.
#[must_use]
pub fn snap_multi_polygon(polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.iter().map(snap_polygon).collect())
}

/// Whether a ring has enough vertices to bound an area.
#[must_use]
pub fn is_well_formed(ring: &LineString<f64>) -> bool {
    ring.is_closed() && ring.0.len() >= 4
}

/// Counter-clockwise angle in degrees, `[0, 360)`, swept from `prev` to
/// `next` around `vertex`.
#[must_use]
pub fn vertex_angle(prev: Coord<f64>, vertex: Coord<f64>, next: Coord<f64>) -> f64 {
    let outgoing = (next.y - vertex.y).atan2(next.x - vertex.x);
    let incoming = (prev.y - vertex.y).atan2(prev.x - vertex.x);
    let angle = (outgoing - incoming).to_degrees();
    if angle < 0.0 { angle + 360.0 } else { angle }
}

/// A vertex whose angle falls below the accepted threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowVertex {
    /// Vertex location.
    pub location: Coord<f64>,
    /// Measured angle in degrees.
    pub angle: f64,
}

/// Vertices of a closed ring whose interior angle is below `threshold`
/// degrees.
///
/// The interior side of [`vertex_angle`] follows the ring orientation, so
/// sliver tips are reported in either winding while the reflex tip of a
/// notch is not. Neighbours wrap around the ring ends, so the closing
/// vertex is measured against the last distinct vertex.
#[must_use]
pub fn narrow_vertices(ring: &LineString<f64>, threshold: f64) -> Vec<NarrowVertex> {
    let coords = &ring.0;
    let Some(distinct) = coords.len().checked_sub(1) else {
        return Vec::new();
    };
    if distinct < 3 {
        return Vec::new();
    }
    let counter_clockwise = ring.is_ccw();
    let mut narrow = Vec::new();
    for index in 0..distinct {
        let prev = if index == 0 {
            coords.get(distinct - 1)
        } else {
            coords.get(index - 1)
        };
        let next = coords.get(index + 1);
        let (Some(&prev), Some(&vertex), Some(&next)) = (prev, coords.get(index), next) else {
            continue;
        };
        let swept = vertex_angle(prev, vertex, next);
        let angle = if counter_clockwise {
            (360.0 - swept) % 360.0
        } else {
            swept
        };
        if angle < threshold {
            narrow.push(NarrowVertex {
                location: vertex,
                angle,
            });
        }
    }
    narrow
}
