//! Conversion of residual polygons into map elements.

use geo::Polygon;

use crate::catalog::Catalog;
use crate::edit_set::EditSet;
use crate::element::{ElementId, Member, Relation, Role, Tags};
use crate::error::{BuildError, Warning};

/// Tag key and value carried by every generated multipolygon.
const MULTIPOLYGON: (&str, &str) = ("type", "multipolygon");

/// Element produced for one residual polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Built {
    /// A simple polygon staged as a closed way.
    Way(ElementId),
    /// A holed polygon staged as a multipolygon relation.
    Relation(ElementId),
}

/// Stages residual polygons as ways and relations.
#[derive(Debug, Clone, Copy)]
pub struct EditBuilder<'a> {
    catalog: &'a Catalog,
    angle_threshold: f64,
}

impl<'a> EditBuilder<'a> {
    /// Build against `catalog`, warning about vertices narrower than
    /// `angle_threshold` degrees.
    #[must_use]
    pub const fn new(catalog: &'a Catalog, angle_threshold: f64) -> Self {
        Self {
            catalog,
            angle_threshold,
        }
    }

    /// Stage `polygon` in `edits` carrying `tags`.
    ///
    /// A polygon without holes becomes a single tagged way. A holed polygon
    /// becomes an untagged outer way, one untagged way per hole and a new
    /// relation carrying `tags` plus `type=multipolygon`.
    ///
    /// # Errors
    ///
    /// Fails when a ring cannot be resolved against the catalog or when the
    /// resulting way or relation would be empty.
    pub fn build_edits(
        &self,
        edits: &mut EditSet,
        polygon: &Polygon<f64>,
        tags: &Tags,
        warnings: &mut Vec<Warning>,
    ) -> Result<Built, BuildError> {
        if polygon.interiors().is_empty() {
            let way = self.catalog.get_or_create_ring(
                edits,
                polygon.exterior(),
                Some(tags),
                self.angle_threshold,
                warnings,
            )?;
            if way.nodes.is_empty() {
                return Err(BuildError::EmptyWay);
            }
            if way.tags.is_empty() {
                return Err(BuildError::EmptyTags);
            }
            return Ok(Built::Way(edits.add(way)));
        }

        let rings = std::iter::once((polygon.exterior(), Role::Outer))
            .chain(polygon.interiors().iter().map(|ring| (ring, Role::Inner)));
        let mut members = Vec::with_capacity(polygon.interiors().len() + 1);
        for (ring, role) in rings {
            let way = self.catalog.get_or_create_ring(
                edits,
                ring,
                None,
                self.angle_threshold,
                warnings,
            )?;
            if way.nodes.is_empty() {
                return Err(BuildError::EmptyWay);
            }
            members.push(Member::way(edits.add(way), role));
        }
        if members.is_empty() {
            return Err(BuildError::EmptyRelation);
        }
        let mut relation_tags = tags.clone();
        relation_tags.insert(MULTIPOLYGON.0.to_owned(), MULTIPOLYGON.1.to_owned());
        Ok(Built::Relation(
            edits.add(Relation::pending(members, relation_tags)),
        ))
    }
}
