//! Turning a visiting order into a drawable polyline.

use crate::geometry::Coord;
use crate::routing::PathMatrix;

/// Stitches the network paths between consecutive route stops.
///
/// Each leg after the first drops its leading coordinate, which repeats the
/// previous leg's last one. A single-stop route yields that stop's own
/// (singleton) path.
///
/// # Examples
///
/// ```
/// use network_tsp::domain::{Edge, SnappedPoint};
/// use network_tsp::geometry::Coord;
/// use network_tsp::route::materialize;
/// use network_tsp::routing::RoadGraph;
///
/// let a = Coord::new(0.0, 0.0);
/// let b = Coord::new(0.0, 1.0);
/// let c = Coord::new(1.0, 1.0);
/// let graph = RoadGraph::build(&[Edge::new(vec![a, b, c]).unwrap()]).unwrap();
///
/// let point = |id: &str, at: Coord| SnappedPoint {
///     id: id.to_string(),
///     original: at,
///     snapped: at,
///     edge_index: 0,
///     distance_to_edge: 0.0,
///     distance_meters: 0.0,
/// };
/// let matrix = graph.compute_matrix(&[point("a", a), point("c", c)]).unwrap();
///
/// assert_eq!(materialize(&[0, 1], &matrix), vec![a, b, c]);
/// assert_eq!(materialize(&[1, 0], &matrix), vec![c, b, a]);
/// ```
pub fn materialize(route: &[usize], matrix: &PathMatrix) -> Vec<Coord> {
    match route {
        [] => Vec::new(),
        [only] => matrix.path(*only, *only).to_vec(),
        _ => {
            let mut coords = Vec::new();
            for (leg, pair) in route.windows(2).enumerate() {
                let path = matrix.path(pair[0], pair[1]);
                let skip = if leg == 0 { 0 } else { 1 };
                coords.extend(path.iter().skip(skip).copied());
            }
            coords
        }
    }
}
