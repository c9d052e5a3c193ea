//! In-memory state: the loaded network and the points integrated into it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::{Edge, SnappedPoint};
use crate::error::{Result, TspError};
use crate::formats::{to_wkt, PointRow};
use crate::geometry::Coord;
use crate::route::materialize;
use crate::routing::RoadGraph;
use crate::snap::{apply_snap, snap_to_network};
use crate::tsp::{AnnealingConfig, TspMethod};

/// Above this many points brute force is skipped by default.
pub const DEFAULT_BRUTE_FORCE_MAX_POINTS: usize = 10;

/// Solver knobs for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub annealing: AnnealingConfig,
    pub brute_force_max_points: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            annealing: AnnealingConfig::default(),
            brute_force_max_points: DEFAULT_BRUTE_FORCE_MAX_POINTS,
        }
    }
}

/// One solver's answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResult {
    /// Point indices in visiting order.
    pub route: Vec<usize>,
    /// Point ids in visiting order.
    pub route_ids: Vec<String>,
    /// Network distance in meters.
    pub distance: f64,
    pub elapsed_seconds: f64,
    /// Network polyline following the route.
    pub route_geometry: Vec<Coord>,
}

/// All solver answers for the current point set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TspEvaluation {
    pub point_count: usize,
    /// Keyed by [`TspMethod::as_str`].
    pub results: BTreeMap<String, MethodResult>,
    /// Methods not run, e.g. brute force over its point limit.
    pub skipped: Vec<String>,
}

/// The network and its snapped points.
///
/// Loading a network discards previously integrated points, since their
/// snapped positions belong to the old geometry.
#[derive(Debug, Clone, Default)]
pub struct NetworkStore {
    edges: Vec<Edge>,
    points: Vec<SnappedPoint>,
}

impl NetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_network(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Replaces the network and clears all points. Returns the edge count.
    pub fn load_network(&mut self, edges: Vec<Edge>) -> Result<usize> {
        if edges.is_empty() {
            return Err(TspError::Precondition(
                "network must contain at least one edge".to_string(),
            ));
        }
        let dropped = self.points.len();
        self.edges = edges;
        self.points.clear();
        info!(edges = self.edges.len(), dropped_points = dropped, "network loaded");
        Ok(self.edges.len())
    }

    /// Snaps one point into the network, splitting the nearest edge.
    ///
    /// # Examples
    ///
    /// ```
    /// use network_tsp::domain::Edge;
    /// use network_tsp::geometry::Coord;
    /// use network_tsp::store::NetworkStore;
    ///
    /// let mut store = NetworkStore::new();
    /// store
    ///     .load_network(vec![Edge::new(vec![Coord::new(0.0, 0.0), Coord::new(0.0, 1.0)]).unwrap()])
    ///     .unwrap();
    ///
    /// let p = store.snap_point("a", 0.2, 0.5).unwrap();
    /// assert_eq!(p.snapped, Coord::new(0.0, 0.5));
    /// assert_eq!(store.edge_count(), 2);
    /// ```
    pub fn snap_point(&mut self, id: &str, lon: f64, lat: f64) -> Result<SnappedPoint> {
        if self.edges.is_empty() {
            return Err(TspError::Precondition(
                "no network loaded; upload a network first".to_string(),
            ));
        }
        let original = Coord::new(lon, lat);
        let snap = snap_to_network(&self.edges, original)?;
        apply_snap(&mut self.edges, &snap);

        let point = SnappedPoint {
            id: id.to_string(),
            original,
            snapped: snap.projected,
            edge_index: snap.edge_index,
            distance_to_edge: snap.distance,
            distance_meters: original.distance_meters(&snap.projected),
        };
        self.points.push(point.clone());
        Ok(point)
    }

    /// Snaps a batch of points in order. Returns how many were integrated.
    ///
    /// Stops at the first failing row; rows before it stay integrated.
    pub fn snap_points(&mut self, rows: &[PointRow]) -> Result<usize> {
        if rows.is_empty() {
            return Err(TspError::Precondition(
                "no points to integrate".to_string(),
            ));
        }
        for row in rows {
            self.snap_point(&row.id, row.lon, row.lat)?;
        }
        info!(
            integrated = rows.len(),
            total = self.points.len(),
            edges = self.edges.len(),
            "points integrated"
        );
        Ok(rows.len())
    }

    pub fn export_network(&self) -> Result<&[Edge]> {
        if self.edges.is_empty() {
            return Err(TspError::NotFound("no network loaded".to_string()));
        }
        Ok(&self.edges)
    }

    pub fn export_network_wkt(&self) -> Result<String> {
        self.export_network().map(to_wkt)
    }

    pub fn export_snapped_points(&self) -> Result<&[SnappedPoint]> {
        if self.points.is_empty() {
            return Err(TspError::NotFound("no points integrated".to_string()));
        }
        Ok(&self.points)
    }

    /// Runs every solver over the current points.
    pub fn evaluate_tsp(&self, config: &EvaluationConfig) -> Result<TspEvaluation> {
        if self.edges.is_empty() {
            return Err(TspError::Precondition("no network loaded".to_string()));
        }
        if self.points.len() < 2 {
            return Err(TspError::Precondition(format!(
                "at least 2 points are needed for a tour, have {}",
                self.points.len()
            )));
        }
        config.annealing.validate()?;

        let graph = RoadGraph::build(&self.edges)?;
        let matrix = graph.compute_matrix(&self.points)?;
        let n = self.points.len();

        let mut results = BTreeMap::new();
        let mut skipped = Vec::new();
        for method in TspMethod::ALL {
            if method == TspMethod::BruteForce && n > config.brute_force_max_points {
                warn!(
                    points = n,
                    limit = config.brute_force_max_points,
                    "skipping brute force"
                );
                skipped.push(method.as_str().to_string());
                continue;
            }

            let solution = method.solve(matrix.distances(), &config.annealing);
            info!(
                method = method.as_str(),
                distance = solution.distance,
                elapsed_ms = solution.elapsed.as_millis() as u64,
                "tsp solved"
            );
            let route_ids = solution
                .route
                .iter()
                .map(|&i| self.points[i].id.clone())
                .collect();
            let route_geometry = materialize(&solution.route, &matrix);
            results.insert(
                method.as_str().to_string(),
                MethodResult {
                    route: solution.route,
                    route_ids,
                    distance: solution.distance,
                    elapsed_seconds: solution.elapsed.as_secs_f64(),
                    route_geometry,
                },
            );
        }

        Ok(TspEvaluation {
            point_count: n,
            results,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::haversine_distance;

    fn edge(coords: &[(f64, f64)]) -> Edge {
        Edge::new(coords.iter().map(|&(lon, lat)| Coord::new(lon, lat)).collect()).unwrap()
    }

    fn seeded() -> EvaluationConfig {
        EvaluationConfig {
            annealing: AnnealingConfig::default().with_seed(42),
            ..EvaluationConfig::default()
        }
    }

    #[test]
    fn test_load_network_rejects_empty() {
        let mut store = NetworkStore::new();
        assert!(matches!(
            store.load_network(vec![]),
            Err(TspError::Precondition(_))
        ));
    }

    #[test]
    fn test_load_network_clears_points() {
        let mut store = NetworkStore::new();
        store.load_network(vec![edge(&[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        store.snap_point("a", 0.0, 0.5).unwrap();
        assert_eq!(store.point_count(), 1);

        store.load_network(vec![edge(&[(5.0, 5.0), (5.0, 6.0)])]).unwrap();
        assert_eq!(store.point_count(), 0);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_snap_without_network() {
        let mut store = NetworkStore::new();
        let err = store.snap_point("a", 0.0, 0.0).unwrap_err();
        assert!(matches!(err, TspError::Precondition(_)));
    }

    #[test]
    fn test_snap_points_requires_rows() {
        let mut store = NetworkStore::new();
        store.load_network(vec![edge(&[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        assert!(store.snap_points(&[]).is_err());
        let n = store
            .snap_points(&[PointRow::new("a", 0.0, 0.2), PointRow::new("b", 0.0, 0.8)])
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_exports_when_empty() {
        let store = NetworkStore::new();
        assert!(matches!(store.export_network(), Err(TspError::NotFound(_))));
        assert!(matches!(store.export_network_wkt(), Err(TspError::NotFound(_))));
        assert!(matches!(store.export_snapped_points(), Err(TspError::NotFound(_))));
    }

    #[test]
    fn test_evaluate_needs_two_points() {
        let mut store = NetworkStore::new();
        assert!(matches!(
            store.evaluate_tsp(&seeded()),
            Err(TspError::Precondition(_))
        ));
        store.load_network(vec![edge(&[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        store.snap_point("only", 0.0, 0.5).unwrap();
        assert!(matches!(
            store.evaluate_tsp(&seeded()),
            Err(TspError::Precondition(_))
        ));
    }

    #[test]
    fn test_two_points_on_one_edge() {
        let mut store = NetworkStore::new();
        store.load_network(vec![edge(&[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        let a = store.snap_point("a", 0.0, 0.25).unwrap().snapped;
        let b = store.snap_point("b", 0.0, 0.75).unwrap().snapped;

        let eval = store.evaluate_tsp(&seeded()).unwrap();
        let expected = haversine_distance(Coord::new(0.0, 0.25), Coord::new(0.0, 0.75));
        assert_eq!(eval.point_count, 2);
        assert!(eval.skipped.is_empty());
        assert_eq!(eval.results.len(), 3);
        for method in TspMethod::ALL {
            let r = &eval.results[method.as_str()];
            assert_eq!(r.route, vec![0, 1]);
            assert_eq!(r.route_ids, vec!["a", "b"]);
            assert!((r.distance - expected).abs() < 1e-6 * expected);
            assert_eq!(r.route_geometry, vec![a, b]);
        }
    }

    #[test]
    fn test_disconnected_points() {
        let mut store = NetworkStore::new();
        store
            .load_network(vec![
                edge(&[(0.0, 0.0), (0.0, 1.0)]),
                edge(&[(5.0, 0.0), (5.0, 1.0)]),
            ])
            .unwrap();
        store.snap_point("west", 0.1, 0.5).unwrap();
        store.snap_point("east", 5.1, 0.5).unwrap();

        let err = store.evaluate_tsp(&seeded()).unwrap_err();
        assert!(matches!(err, TspError::Connectivity { .. }));
    }

    #[test]
    fn test_brute_force_skipped_over_limit() {
        let mut store = NetworkStore::new();
        store.load_network(vec![edge(&[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        for i in 1..=4 {
            store.snap_point(&format!("p{}", i), 0.0, i as f64 * 0.2).unwrap();
        }
        let config = EvaluationConfig {
            brute_force_max_points: 3,
            ..seeded()
        };
        let eval = store.evaluate_tsp(&config).unwrap();
        assert_eq!(eval.skipped, vec!["brute_force"]);
        assert!(!eval.results.contains_key("brute_force"));

        // Points along a single line: greedy walks straight up
        let nn = &eval.results["nearest_neighbor"];
        assert_eq!(nn.route, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_evaluation_does_not_change_store() {
        let mut store = NetworkStore::new();
        store.load_network(vec![edge(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])]).unwrap();
        store.snap_point("a", 0.2, 0.1).unwrap();
        store.snap_point("b", 1.1, 0.6).unwrap();
        store.snap_point("c", 0.9, 0.1).unwrap();
        let edges_before = store.export_network().unwrap().to_vec();

        let eval = store.evaluate_tsp(&seeded()).unwrap();
        assert_eq!(store.export_network().unwrap(), edges_before.as_slice());

        let exact = eval.results["brute_force"].distance;
        for r in eval.results.values() {
            assert!(exact <= r.distance + 1e-6);
            assert_eq!(r.route[0], 0);
        }
    }
}
