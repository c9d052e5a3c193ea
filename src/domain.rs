//! Domain model for the road network and its integrated points.
//!
//! - [`Edge`]: one road polyline with at least two distinct vertices
//! - [`SnappedPoint`]: a point of interest after integration into the network

use serde::{Deserialize, Serialize};

use crate::error::{Result, TspError};
use crate::geometry::{polyline_length, Coord};

/// A road segment as an ordered polyline.
///
/// # Examples
///
/// ```
/// use network_tsp::domain::Edge;
/// use network_tsp::geometry::Coord;
///
/// let edge = Edge::new(vec![Coord::new(0.0, 0.0), Coord::new(0.0, 1.0)]).unwrap();
/// assert_eq!(edge.vertex_count(), 2);
///
/// // A polyline that never leaves its start is rejected
/// assert!(Edge::new(vec![Coord::new(1.0, 1.0), Coord::new(1.0, 1.0)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coord>", into = "Vec<Coord>")]
pub struct Edge {
    coords: Vec<Coord>,
}

impl Edge {
    /// Creates an edge, requiring at least two distinct finite vertices.
    pub fn new(coords: Vec<Coord>) -> Result<Self> {
        if coords.len() < 2 {
            return Err(TspError::Precondition(format!(
                "an edge needs at least 2 vertices, got {}",
                coords.len()
            )));
        }
        if let Some(bad) = coords.iter().find(|c| !c.is_finite()) {
            return Err(TspError::Precondition(format!(
                "edge vertex {} is not a finite coordinate",
                bad
            )));
        }
        if coords.iter().all(|c| *c == coords[0]) {
            return Err(TspError::Precondition(
                "an edge needs at least 2 distinct vertices".to_string(),
            ));
        }
        Ok(Self { coords })
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }

    pub fn first(&self) -> Coord {
        self.coords[0]
    }

    pub fn last(&self) -> Coord {
        self.coords[self.coords.len() - 1]
    }

    /// Great-circle length in meters.
    pub fn length_meters(&self) -> f64 {
        polyline_length(&self.coords)
    }
}

impl TryFrom<Vec<Coord>> for Edge {
    type Error = TspError;

    fn try_from(coords: Vec<Coord>) -> Result<Self> {
        Edge::new(coords)
    }
}

impl From<Edge> for Vec<Coord> {
    fn from(edge: Edge) -> Self {
        edge.coords
    }
}

/// A point of interest integrated into the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnappedPoint {
    /// External identifier from the upload.
    pub id: String,
    /// Coordinate as uploaded.
    pub original: Coord,
    /// Projection onto the chosen edge; always a vertex of the network.
    pub snapped: Coord,
    /// Index of the chosen edge at integration time.
    pub edge_index: usize,
    /// Planar perpendicular distance in degrees.
    pub distance_to_edge: f64,
    /// Same distance in meters.
    pub distance_meters: f64,
}
