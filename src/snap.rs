//! Point-to-network snapping.
//!
//! A point is integrated by projecting it onto the nearest edge and splitting
//! that edge at the projection, so the point becomes a real vertex of the
//! road graph. The search is a linear scan over all edges.

use tracing::debug;

use crate::domain::Edge;
use crate::error::{Result, TspError};
use crate::geometry::{project_onto_polyline, Coord, PolylineProjection};

/// Projections closer than this (planar degrees, ~0.1 µm) to an existing
/// vertex are moved onto that vertex instead of producing a sliver edge.
const VERTEX_TOLERANCE_DEG: f64 = 1e-12;

/// Outcome of snapping one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Snap {
    /// Index of the chosen edge in the collection that was searched.
    pub edge_index: usize,
    /// Projected coordinate on the chosen edge.
    pub projected: Coord,
    /// Planar distance from the point to `projected`, in degrees.
    pub distance: f64,
    /// Sub-edges replacing the chosen edge, or `None` when the projection
    /// already is a vertex of that edge.
    pub replacement: Option<Vec<Edge>>,
}

/// Finds the edge nearest to `point` and prepares its split.
///
/// Ties are broken by the lowest edge index. Edges without any segment of
/// non-zero length are skipped.
///
/// # Examples
///
/// ```
/// use network_tsp::domain::Edge;
/// use network_tsp::geometry::Coord;
/// use network_tsp::snap::snap_to_network;
///
/// let edges = vec![Edge::new(vec![Coord::new(0.0, 0.0), Coord::new(0.0, 1.0)]).unwrap()];
/// let snap = snap_to_network(&edges, Coord::new(0.1, 0.5)).unwrap();
///
/// assert_eq!(snap.edge_index, 0);
/// assert_eq!(snap.projected, Coord::new(0.0, 0.5));
/// assert_eq!(snap.replacement.map(|parts| parts.len()), Some(2));
/// ```
pub fn snap_to_network(edges: &[Edge], point: Coord) -> Result<Snap> {
    if edges.is_empty() {
        return Err(TspError::Precondition(
            "cannot snap a point onto an empty network".to_string(),
        ));
    }
    if !point.is_finite() {
        return Err(TspError::Precondition(format!(
            "point {} is not a finite coordinate",
            point
        )));
    }

    let mut best: Option<(usize, PolylineProjection)> = None;
    for (idx, edge) in edges.iter().enumerate() {
        let Some(projection) = project_onto_polyline(point, edge.coords()) else {
            debug!(edge = idx, "skipping zero-length edge");
            continue;
        };
        if best.map_or(true, |(_, b)| projection.distance < b.distance) {
            best = Some((idx, projection));
        }
    }

    let (edge_index, mut projection) = best.ok_or_else(|| {
        TspError::Precondition("network has no edge of non-zero length".to_string())
    })?;

    // A point already on the edge keeps its own coordinate rather than the
    // recomputed projection, which can be off by an ulp on diagonal segments
    if projection.distance <= VERTEX_TOLERANCE_DEG {
        projection.point = point;
        projection.distance = 0.0;
    }

    let edge = &edges[edge_index];
    let (projected, replacement) = match split_point(edge.coords(), &projection) {
        SplitPoint::Vertex(vertex) => (vertex, None),
        SplitPoint::Interior(at) => (at, split_edge(edge, projection.segment, at)),
    };

    debug!(
        edge = edge_index,
        distance = projection.distance,
        split = replacement.is_some(),
        "snapped point {} to {}",
        point,
        projected
    );

    Ok(Snap {
        edge_index,
        projected,
        distance: point.planar_distance(&projected),
        replacement,
    })
}

/// Replaces the snapped edge with its sub-edges, keeping the order of the rest.
///
/// Returns true if the collection changed.
pub fn apply_snap(edges: &mut Vec<Edge>, snap: &Snap) -> bool {
    match &snap.replacement {
        Some(parts) if snap.edge_index < edges.len() => {
            edges.splice(snap.edge_index..=snap.edge_index, parts.iter().cloned());
            true
        }
        _ => false,
    }
}

enum SplitPoint {
    Vertex(Coord),
    Interior(Coord),
}

fn split_point(coords: &[Coord], projection: &PolylineProjection) -> SplitPoint {
    let at = projection.point;
    if let Some(&vertex) = coords.iter().find(|&&c| c == at) {
        return SplitPoint::Vertex(vertex);
    }

    let a = coords[projection.segment];
    let b = coords[projection.segment + 1];
    if at.planar_distance(&a) <= VERTEX_TOLERANCE_DEG {
        SplitPoint::Vertex(a)
    } else if at.planar_distance(&b) <= VERTEX_TOLERANCE_DEG {
        SplitPoint::Vertex(b)
    } else {
        SplitPoint::Interior(at)
    }
}

/// Splits `edge` at `at`, which lies inside segment `segment`.
///
/// Pieces that are not valid edges are dropped; `None` unless two remain.
fn split_edge(edge: &Edge, segment: usize, at: Coord) -> Option<Vec<Edge>> {
    let (head, tail) = edge.coords().split_at(segment + 1);

    let mut first = Vec::with_capacity(head.len() + 1);
    first.extend_from_slice(head);
    first.push(at);

    let mut second = Vec::with_capacity(tail.len() + 1);
    second.push(at);
    second.extend_from_slice(tail);

    let parts: Vec<Edge> = [first, second]
        .into_iter()
        .filter_map(|coords| Edge::new(coords).ok())
        .collect();

    (parts.len() >= 2).then_some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(coords: &[(f64, f64)]) -> Edge {
        Edge::new(coords.iter().map(|&(lon, lat)| Coord::new(lon, lat)).collect()).unwrap()
    }

    fn total_vertices(edges: &[Edge]) -> usize {
        edges.iter().map(Edge::vertex_count).sum()
    }

    fn total_length(edges: &[Edge]) -> f64 {
        edges.iter().map(Edge::length_meters).sum()
    }

    #[test]
    fn test_empty_network_is_precondition_error() {
        let err = snap_to_network(&[], Coord::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, TspError::Precondition(_)));
    }

    #[test]
    fn test_point_on_edge_has_zero_distance() {
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)])];
        let p = Coord::new(0.0, 0.25);
        let snap = snap_to_network(&edges, p).unwrap();
        assert_eq!(snap.distance, 0.0);
        assert_eq!(snap.projected, p);
    }

    #[test]
    fn test_point_on_diagonal_edge_keeps_its_coordinate() {
        let a = Coord::new(-75.1635, 39.9526);
        let b = Coord::new(-75.1503, 39.9496);
        let edges = vec![Edge::new(vec![a, b]).unwrap()];
        for step in 1..100 {
            let t = step as f64 / 100.0;
            let p = Coord::new(a.lon + t * (b.lon - a.lon), a.lat + t * (b.lat - a.lat));
            let snap = snap_to_network(&edges, p).unwrap();
            assert_eq!(snap.projected, p, "t = {}", t);
            assert_eq!(snap.distance, 0.0, "t = {}", t);

            let parts = snap.replacement.unwrap();
            assert_eq!(parts[0].last(), p);
            assert_eq!(parts[1].first(), p);
        }
    }

    #[test]
    fn test_interior_split_conserves_length_and_vertices() {
        let mut edges = vec![
            edge(&[(5.0, 5.0), (6.0, 5.0)]),
            edge(&[(0.0, 0.0), (0.0, 0.4), (0.1, 1.0)]),
            edge(&[(9.0, 9.0), (9.0, 8.0)]),
        ];
        let before_len = total_length(&edges);
        let before_vertices = total_vertices(&edges);
        let originals: Vec<Coord> = edges[1].coords().to_vec();

        let snap = snap_to_network(&edges, Coord::new(-0.2, 0.2)).unwrap();
        assert_eq!(snap.edge_index, 1);
        assert!(apply_snap(&mut edges, &snap));

        assert_eq!(edges.len(), 4);
        // Split vertex appears once at the end of the head and once at the start of the tail
        assert_eq!(total_vertices(&edges), before_vertices + 2);
        assert!((total_length(&edges) - before_len).abs() < 1e-6);

        // Neighbouring edges keep their order
        assert_eq!(edges[0].first(), Coord::new(5.0, 5.0));
        assert_eq!(edges[3].first(), Coord::new(9.0, 9.0));

        // The pieces join at the projection and keep every original vertex
        assert_eq!(edges[1].last(), snap.projected);
        assert_eq!(edges[2].first(), snap.projected);
        let rejoined: Vec<Coord> = edges[1]
            .coords()
            .iter()
            .chain(edges[2].coords().iter().skip(1))
            .copied()
            .filter(|c| *c != snap.projected)
            .collect();
        assert_eq!(rejoined, originals);
    }

    #[test]
    fn test_snap_to_endpoint_leaves_network_unchanged() {
        let mut edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)]), edge(&[(0.0, 1.0), (1.0, 1.0)])];
        let before = edges.clone();

        let snap = snap_to_network(&edges, Coord::new(0.0, 1.0)).unwrap();
        assert_eq!(snap.projected, Coord::new(0.0, 1.0));
        assert!(snap.replacement.is_none());
        assert!(!apply_snap(&mut edges, &snap));
        assert_eq!(edges, before);
    }

    #[test]
    fn test_snap_to_interior_vertex_does_not_split() {
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)])];
        let snap = snap_to_network(&edges, Coord::new(0.5, 1.0)).unwrap();
        assert_eq!(snap.projected, Coord::new(0.0, 1.0));
        assert!(snap.replacement.is_none());
        assert!((snap.distance - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_projection_beyond_end_clamps_to_endpoint() {
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)])];
        let snap = snap_to_network(&edges, Coord::new(0.0, 3.0)).unwrap();
        assert_eq!(snap.projected, Coord::new(0.0, 1.0));
        assert!(snap.replacement.is_none());
    }

    #[test]
    fn test_tie_keeps_first_edge() {
        // Point equidistant from two parallel edges
        let edges = vec![edge(&[(-1.0, 0.0), (-1.0, 2.0)]), edge(&[(1.0, 0.0), (1.0, 2.0)])];
        let snap = snap_to_network(&edges, Coord::new(0.0, 1.0)).unwrap();
        assert_eq!(snap.edge_index, 0);
    }

    #[test]
    fn test_near_vertex_projection_collapses_onto_vertex() {
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)])];
        let snap = snap_to_network(&edges, Coord::new(0.3, 1e-15)).unwrap();
        assert_eq!(snap.projected, Coord::new(0.0, 0.0));
        assert!(snap.replacement.is_none());
    }

    #[test]
    fn test_repeated_snaps_on_same_edge() {
        let mut edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)])];
        for lat in [0.25, 0.75, 0.5] {
            let snap = snap_to_network(&edges, Coord::new(0.01, lat)).unwrap();
            apply_snap(&mut edges, &snap);
        }
        assert_eq!(edges.len(), 4);
        let expected = [0.0, 0.25, 0.5, 0.75];
        for (e, lat) in edges.iter().zip(expected) {
            assert!((e.first().lat - lat).abs() < 1e-12);
        }
        // Consecutive pieces share their split vertex exactly
        for pair in edges.windows(2) {
            assert_eq!(pair[0].last(), pair[1].first());
        }
    }
}
