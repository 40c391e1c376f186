//! Failures and warnings raised while reconciling a building.

use std::fmt;

use geo::Coord;
use thiserror::Error;

use crate::element::AreaId;

/// Fatal problem that aborts the contribution of a single building.
///
/// The reconciler rolls back everything staged for the building, counts the
/// failure and moves on to the next building.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    /// A residual constituent has no usable outer ring.
    #[error("residual of {building} has no valid boundary")]
    InvalidGeometry {
        /// Building whose residual is degenerate.
        building: AreaId,
    },
    /// Residual vertices that match no known node.
    #[error("{} vertices match no known node", .coords.len())]
    UnmatchedVertices {
        /// Every unmatched vertex, in ring order.
        coords: Vec<Coord<f64>>,
    },
    /// A multipolygon ended up without members.
    #[error("multipolygon relation has no members")]
    EmptyRelation,
    /// A ring ended up without node references.
    #[error("way has no nodes")]
    EmptyWay,
    /// A ring ended up without tags.
    #[error("way has no tags")]
    EmptyTags,
}

impl BuildError {
    /// Number of problems this failure accounts for.
    ///
    /// Each unmatched vertex counts on its own; every other failure counts
    /// once.
    #[must_use]
    pub fn error_count(&self) -> usize {
        match self {
            Self::UnmatchedVertices { coords } => coords.len().max(1),
            _ => 1,
        }
    }
}

/// Non-fatal finding that is logged for manual review.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A ring vertex forms an angle below the accepted threshold.
    NarrowVertex {
        /// Vertex location.
        location: Coord<f64>,
        /// Measured angle in degrees.
        angle: f64,
    },
    /// A building carries no `building:levels` tag.
    MissingLevels {
        /// The building.
        building: AreaId,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NarrowVertex { location, angle } => write!(
                f,
                "narrow vertex ({angle:.2} degrees) at {:.7} {:.7}",
                location.y, location.x
            ),
            Self::MissingLevels { building } => {
                write!(f, "{building} has no building:levels tag")
            }
        }
    }
}
