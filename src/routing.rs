//! Road graph construction and all-pairs shortest paths between snapped points.
//!
//! Builds an undirected petgraph graph from the edge collection, runs one
//! Dijkstra search per snapped point for distances and A* for vertex paths.
//! Graphs are rebuilt for every evaluation because the network and the point
//! set may change between requests.

use ordered_float::OrderedFloat;
use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::{Edge, SnappedPoint};
use crate::error::{Result, TspError};
use crate::geometry::{haversine_distance, Coord};

/// Exact-match lookup key for a coordinate.
type CoordKey = (OrderedFloat<f64>, OrderedFloat<f64>);

fn coord_key(c: Coord) -> CoordKey {
    (OrderedFloat(c.lon), OrderedFloat(c.lat))
}

/// Undirected road graph weighted by great-circle distance in meters.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    graph: UnGraph<Coord, f64>,
    coord_to_node: HashMap<CoordKey, NodeIndex>,
}

impl RoadGraph {
    /// Builds the graph from an edge collection.
    ///
    /// Every pair of consecutive polyline vertices becomes a connection; when
    /// several polylines connect the same two vertices the shortest wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use network_tsp::domain::Edge;
    /// use network_tsp::geometry::Coord;
    /// use network_tsp::routing::RoadGraph;
    ///
    /// let a = Coord::new(0.0, 0.0);
    /// let b = Coord::new(0.0, 1.0);
    /// let edges = vec![
    ///     Edge::new(vec![a, b]).unwrap(),
    ///     Edge::new(vec![b, a]).unwrap(),
    /// ];
    /// let graph = RoadGraph::build(&edges).unwrap();
    /// assert_eq!(graph.node_count(), 2);
    /// assert_eq!(graph.edge_count(), 1);
    /// ```
    pub fn build(edges: &[Edge]) -> Result<Self> {
        if edges.is_empty() {
            return Err(TspError::Precondition(
                "cannot build a graph from an empty network".to_string(),
            ));
        }

        let mut network = Self {
            graph: UnGraph::default(),
            coord_to_node: HashMap::new(),
        };

        for edge in edges {
            for w in edge.coords().windows(2) {
                if w[0] == w[1] {
                    continue;
                }
                let a = network.get_or_create_node(w[0]);
                let b = network.get_or_create_node(w[1]);
                let weight = haversine_distance(w[0], w[1]);

                match network.graph.find_edge(a, b) {
                    Some(existing) => {
                        let current = &mut network.graph[existing];
                        if weight < *current {
                            *current = weight;
                        }
                    }
                    None => {
                        network.graph.add_edge(a, b, weight);
                    }
                }
            }
        }

        debug!(
            nodes = network.graph.node_count(),
            edges = network.graph.edge_count(),
            polylines = edges.len(),
            "built road graph"
        );

        Ok(network)
    }

    fn get_or_create_node(&mut self, c: Coord) -> NodeIndex {
        let key = coord_key(c);
        if let Some(&idx) = self.coord_to_node.get(&key) {
            idx
        } else {
            let idx = self.graph.add_node(c);
            self.coord_to_node.insert(key, idx);
            idx
        }
    }

    /// Returns the vertex at exactly this coordinate, if any.
    pub fn node_at(&self, c: Coord) -> Option<NodeIndex> {
        self.coord_to_node.get(&coord_key(c)).copied()
    }

    /// Weight of the direct connection between two coordinates.
    pub fn connection_weight(&self, a: Coord, b: Coord) -> Option<f64> {
        let edge = self.graph.find_edge(self.node_at(a)?, self.node_at(b)?)?;
        self.graph.edge_weight(edge).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertex sequence of a shortest path, via A* with a zero heuristic.
    fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<Coord>> {
        let (_, nodes) = astar(
            &self.graph,
            from,
            |n| n == to,
            |e| OrderedFloat(*e.weight()),
            |_| OrderedFloat(0.0),
        )?;
        Some(nodes.into_iter().map(|n| self.graph[n]).collect())
    }

    /// Computes shortest-path distances and vertex paths between all points.
    ///
    /// Matrix rows and columns follow the order of `points`.
    ///
    /// # Errors
    ///
    /// - [`TspError::Precondition`] for fewer than two points
    /// - [`TspError::InternalConsistency`] if a snapped coordinate is not a vertex
    /// - [`TspError::Connectivity`] for the first unreachable pair
    ///
    /// # Examples
    ///
    /// ```
    /// use network_tsp::domain::{Edge, SnappedPoint};
    /// use network_tsp::geometry::Coord;
    /// use network_tsp::routing::RoadGraph;
    ///
    /// let a = Coord::new(0.0, 0.0);
    /// let b = Coord::new(0.0, 1.0);
    /// let graph = RoadGraph::build(&[Edge::new(vec![a, b]).unwrap()]).unwrap();
    ///
    /// let point = |id: &str, c: Coord| SnappedPoint {
    ///     id: id.to_string(),
    ///     original: c,
    ///     snapped: c,
    ///     edge_index: 0,
    ///     distance_to_edge: 0.0,
    ///     distance_meters: 0.0,
    /// };
    /// let matrix = graph.compute_matrix(&[point("a", a), point("b", b)]).unwrap();
    /// assert_eq!(matrix.len(), 2);
    /// assert_eq!(matrix.path(0, 1), &[a, b]);
    /// assert_eq!(matrix.distance(0, 0), 0.0);
    /// ```
    pub fn compute_matrix(&self, points: &[SnappedPoint]) -> Result<PathMatrix> {
        let n = points.len();
        if n < 2 {
            return Err(TspError::Precondition(format!(
                "at least 2 points are required to build a distance matrix, got {}",
                n
            )));
        }

        let nodes = points
            .iter()
            .map(|p| {
                self.node_at(p.snapped).ok_or_else(|| {
                    TspError::InternalConsistency(format!(
                        "snapped point '{}' at {} is not a vertex of the road graph",
                        p.id, p.snapped
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut distances = vec![vec![0.0; n]; n];
        let mut paths = vec![vec![Vec::new(); n]; n];

        for i in 0..n {
            let costs = dijkstra(&self.graph, nodes[i], None, |e| OrderedFloat(*e.weight()));
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = costs.get(&nodes[j]).ok_or_else(|| TspError::Connectivity {
                    from: i,
                    to: j,
                    from_id: points[i].id.clone(),
                    to_id: points[j].id.clone(),
                })?;
                distances[i][j] = d.0;
            }
        }

        // Reachability is settled above; walk each unordered pair once
        for i in 0..n {
            paths[i][i] = vec![points[i].snapped];
            for j in (i + 1)..n {
                let path = self.shortest_path(nodes[i], nodes[j]).ok_or_else(|| {
                    TspError::InternalConsistency(format!(
                        "no path between '{}' and '{}' although both are reachable",
                        points[i].id, points[j].id
                    ))
                })?;
                paths[j][i] = path.iter().rev().copied().collect();
                paths[i][j] = path;
            }
        }

        info!(
            points = n,
            nodes = self.node_count(),
            "computed shortest-path matrix"
        );

        Ok(PathMatrix { distances, paths })
    }
}

/// Pairwise shortest-path distances (meters) and vertex paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrix {
    distances: Vec<Vec<f64>>,
    paths: Vec<Vec<Vec<Coord>>>,
}

impl PathMatrix {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from][to]
    }

    /// Vertex sequence from point `from` to point `to`, both endpoints included.
    pub fn path(&self, from: usize, to: usize) -> &[Coord] {
        &self.paths[from][to]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(coords: &[(f64, f64)]) -> Edge {
        Edge::new(coords.iter().map(|&(lon, lat)| Coord::new(lon, lat)).collect()).unwrap()
    }

    fn point(id: &str, lon: f64, lat: f64) -> SnappedPoint {
        let c = Coord::new(lon, lat);
        SnappedPoint {
            id: id.to_string(),
            original: c,
            snapped: c,
            edge_index: 0,
            distance_to_edge: 0.0,
            distance_meters: 0.0,
        }
    }

    /// A small grid-like network: square with one diagonal and a spur.
    fn sample_network() -> Vec<Edge> {
        vec![
            edge(&[(0.0, 0.0), (0.0, 0.01), (0.01, 0.01)]),
            edge(&[(0.01, 0.01), (0.01, 0.0), (0.0, 0.0)]),
            edge(&[(0.0, 0.0), (0.01, 0.01)]),
            edge(&[(0.01, 0.0), (0.02, 0.0)]),
        ]
    }

    fn sample_points() -> Vec<SnappedPoint> {
        vec![
            point("a", 0.0, 0.0),
            point("b", 0.01, 0.01),
            point("c", 0.02, 0.0),
            point("d", 0.0, 0.01),
        ]
    }

    #[test]
    fn test_empty_network() {
        assert!(matches!(RoadGraph::build(&[]), Err(TspError::Precondition(_))));
    }

    #[test]
    fn test_shared_vertices_are_merged() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn test_duplicate_connection_keeps_minimum_weight() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(0.0, 0.01);
        let direct = haversine_distance(a, b);
        // Same pair listed by two polylines, once in each direction
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 0.01)]), edge(&[(0.0, 0.01), (0.0, 0.0)])];
        let graph = RoadGraph::build(&edges).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!((graph.connection_weight(a, b).unwrap() - direct).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_vertex_adds_no_self_loop() {
        let graph = RoadGraph::build(&[edge(&[(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)])]).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_matrix_symmetric_with_zero_diagonal() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let m = graph.compute_matrix(&sample_points()).unwrap();
        for i in 0..m.len() {
            assert_eq!(m.distance(i, i), 0.0);
            assert_eq!(m.path(i, i).len(), 1);
            for j in 0..m.len() {
                assert!((m.distance(i, j) - m.distance(j, i)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_matrix_triangle_inequality() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let m = graph.compute_matrix(&sample_points()).unwrap();
        let n = m.len();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    assert!(m.distance(i, k) <= m.distance(i, j) + m.distance(j, k) + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_paths_follow_network_and_match_distance() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let points = sample_points();
        let m = graph.compute_matrix(&points).unwrap();

        // a -> b uses the diagonal rather than going around the square
        assert_eq!(m.path(0, 1), &[Coord::new(0.0, 0.0), Coord::new(0.01, 0.01)]);

        for i in 0..m.len() {
            for j in 0..m.len() {
                let path = m.path(i, j);
                assert_eq!(path[0], points[i].snapped);
                assert_eq!(path[path.len() - 1], points[j].snapped);
                let length: f64 = path
                    .windows(2)
                    .map(|w| graph.connection_weight(w[0], w[1]).unwrap())
                    .sum();
                assert!((length - m.distance(i, j)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_reverse_path_mirrors_forward_path() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let m = graph.compute_matrix(&sample_points()).unwrap();
        // c -> d has to cross the square: c, (0.01, 0), then via a or b to d
        assert_eq!(m.path(2, 3).len(), 4);
        for i in 0..m.len() {
            for j in 0..m.len() {
                let mut back = m.path(j, i).to_vec();
                back.reverse();
                assert_eq!(m.path(i, j), back.as_slice());
            }
        }
    }

    #[test]
    fn test_points_sharing_a_vertex() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let m = graph
            .compute_matrix(&[point("a", 0.0, 0.0), point("a2", 0.0, 0.0), point("c", 0.02, 0.0)])
            .unwrap();
        assert_eq!(m.distance(0, 1), 0.0);
        assert_eq!(m.path(0, 1), &[Coord::new(0.0, 0.0)]);
        assert_eq!(m.distance(0, 2), m.distance(1, 2));
    }

    #[test]
    fn test_disconnected_pair_is_reported() {
        let edges = vec![edge(&[(0.0, 0.0), (0.0, 1.0)]), edge(&[(5.0, 0.0), (5.0, 1.0)])];
        let graph = RoadGraph::build(&edges).unwrap();
        let err = graph
            .compute_matrix(&[point("west", 0.0, 0.5), point("east", 5.0, 1.0)])
            .unwrap_err();
        // (0, 0.5) was never snapped in, so it is not a vertex
        assert!(matches!(err, TspError::InternalConsistency(_)));

        let err = graph
            .compute_matrix(&[point("west", 0.0, 1.0), point("east", 5.0, 1.0)])
            .unwrap_err();
        assert_eq!(
            err,
            TspError::Connectivity {
                from: 0,
                to: 1,
                from_id: "west".into(),
                to_id: "east".into()
            }
        );
    }

    #[test]
    fn test_single_point_is_precondition_error() {
        let graph = RoadGraph::build(&sample_network()).unwrap();
        let err = graph.compute_matrix(&[point("a", 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, TspError::Precondition(_)));
    }
}
