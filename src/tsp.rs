//! Travelling salesman solvers over a precomputed distance matrix.
//!
//! All solvers return an open path that starts at point 0 and visits every
//! other point exactly once. They only see the matrix, never the network.
//!
//! - [`brute_force`]: exact, enumerates all `(n-1)!` orders
//! - [`nearest_neighbor`]: greedy, O(n²)
//! - [`simulated_annealing`]: swap moves with Metropolis acceptance

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::error::{Result, TspError};

/// Default starting temperature for annealing.
pub const DEFAULT_INITIAL_TEMPERATURE: f64 = 1000.0;

/// Default multiplicative cooling factor applied after every step.
pub const DEFAULT_COOLING_RATE: f64 = 0.995;

/// Default step budget for annealing.
pub const DEFAULT_STEPS: u64 = 5000;

/// Annealing stops once the temperature falls below this.
const MIN_TEMPERATURE: f64 = 1e-6;

/// A visiting order with its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct TspSolution {
    /// Matrix indices in visiting order; `route[0] == 0`.
    pub route: Vec<usize>,
    /// Sum of consecutive distances (no return leg).
    pub distance: f64,
    /// Wall-clock solve time.
    pub elapsed: Duration,
}

impl TspSolution {
    fn trivial(n: usize) -> Self {
        Self {
            route: (0..n).collect(),
            distance: 0.0,
            elapsed: Duration::ZERO,
        }
    }
}

/// The available solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TspMethod {
    BruteForce,
    NearestNeighbor,
    SimulatedAnnealing,
}

impl TspMethod {
    /// Every method, cheapest first.
    pub const ALL: [TspMethod; 3] = [
        TspMethod::NearestNeighbor,
        TspMethod::SimulatedAnnealing,
        TspMethod::BruteForce,
    ];

    /// ```
    /// use network_tsp::tsp::TspMethod;
    ///
    /// assert_eq!(TspMethod::BruteForce.as_str(), "brute_force");
    /// assert_eq!(TspMethod::SimulatedAnnealing.as_str(), "simulated_annealing");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            TspMethod::BruteForce => "brute_force",
            TspMethod::NearestNeighbor => "nearest_neighbor",
            TspMethod::SimulatedAnnealing => "simulated_annealing",
        }
    }

    /// Runs this method on `matrix`.
    pub fn solve(self, matrix: &[Vec<f64>], annealing: &AnnealingConfig) -> TspSolution {
        match self {
            TspMethod::BruteForce => brute_force(matrix),
            TspMethod::NearestNeighbor => nearest_neighbor(matrix),
            TspMethod::SimulatedAnnealing => simulated_annealing(matrix, annealing),
        }
    }
}

/// Simulated annealing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub steps: u64,
    /// Fixed RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: DEFAULT_INITIAL_TEMPERATURE,
            cooling_rate: DEFAULT_COOLING_RATE,
            steps: DEFAULT_STEPS,
            seed: None,
        }
    }
}

impl AnnealingConfig {
    /// Same parameters with a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks that the schedule actually cools.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(TspError::Precondition(format!(
                "initial temperature must be positive, got {}",
                self.initial_temperature
            )));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(TspError::Precondition(format!(
                "cooling rate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        Ok(())
    }
}

/// Length of an open path through `route`.
///
/// # Examples
///
/// ```
/// use network_tsp::tsp::route_distance;
///
/// let m = vec![
///     vec![0.0, 1.0, 5.0],
///     vec![1.0, 0.0, 2.0],
///     vec![5.0, 2.0, 0.0],
/// ];
/// assert_eq!(route_distance(&m, &[0, 1, 2]), 3.0);
/// assert_eq!(route_distance(&m, &[0]), 0.0);
/// ```
pub fn route_distance(matrix: &[Vec<f64>], route: &[usize]) -> f64 {
    route.windows(2).map(|w| matrix[w[0]][w[1]]).sum()
}

/// Exact solver: tries every order of `1..n` after the fixed start.
///
/// Permutations are generated in lexicographic order and the first one
/// reaching the minimum is kept.
pub fn brute_force(matrix: &[Vec<f64>]) -> TspSolution {
    let n = matrix.len();
    if n <= 1 {
        return TspSolution::trivial(n);
    }

    let start = Instant::now();
    let mut best_route: Vec<usize> = (0..n).collect();
    let mut best_distance = f64::INFINITY;

    for perm in (1..n).permutations(n - 1) {
        let mut distance = matrix[0][perm[0]];
        for w in perm.windows(2) {
            distance += matrix[w[0]][w[1]];
        }
        if distance < best_distance {
            best_distance = distance;
            best_route.truncate(1);
            best_route.extend(perm);
        }
    }

    TspSolution {
        route: best_route,
        distance: best_distance,
        elapsed: start.elapsed(),
    }
}

/// Greedy solver: always moves to the closest unvisited point.
///
/// Ties go to the smallest index.
///
/// # Examples
///
/// ```
/// use network_tsp::tsp::nearest_neighbor;
///
/// let m = vec![
///     vec![0.0, 4.0, 1.0],
///     vec![4.0, 0.0, 2.0],
///     vec![1.0, 2.0, 0.0],
/// ];
/// let solution = nearest_neighbor(&m);
/// assert_eq!(solution.route, vec![0, 2, 1]);
/// assert_eq!(solution.distance, 3.0);
/// ```
pub fn nearest_neighbor(matrix: &[Vec<f64>]) -> TspSolution {
    let n = matrix.len();
    if n <= 1 {
        return TspSolution::trivial(n);
    }

    let start = Instant::now();
    let mut unvisited: BTreeSet<usize> = (1..n).collect();
    let mut route = Vec::with_capacity(n);
    route.push(0);
    let mut current = 0;
    let mut distance = 0.0;

    // BTreeSet iterates in ascending order and min_by keeps the first minimum
    while let Some(next) = unvisited
        .iter()
        .copied()
        .min_by(|&a, &b| matrix[current][a].total_cmp(&matrix[current][b]))
    {
        distance += matrix[current][next];
        unvisited.remove(&next);
        route.push(next);
        current = next;
    }

    TspSolution {
        route,
        distance,
        elapsed: start.elapsed(),
    }
}

/// Simulated annealing over orders of `1..n`, with point 0 pinned first.
///
/// Each step swaps two random positions after the start, accepts
/// improvements always and regressions with probability `exp(-delta / T)`,
/// then cools `T`. Returns the best order seen.
///
/// # Examples
///
/// ```
/// use network_tsp::tsp::{simulated_annealing, AnnealingConfig};
///
/// let m = vec![
///     vec![0.0, 1.0, 9.0, 9.0],
///     vec![1.0, 0.0, 1.0, 9.0],
///     vec![9.0, 1.0, 0.0, 1.0],
///     vec![9.0, 9.0, 1.0, 0.0],
/// ];
/// let solution = simulated_annealing(&m, &AnnealingConfig::default().with_seed(7));
/// assert_eq!(solution.route[0], 0);
/// assert_eq!(solution.route.len(), 4);
/// ```
pub fn simulated_annealing(matrix: &[Vec<f64>], config: &AnnealingConfig) -> TspSolution {
    let n = matrix.len();
    if n <= 1 {
        return TspSolution::trivial(n);
    }

    let start = Instant::now();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut route: Vec<usize> = (0..n).collect();
    route[1..].shuffle(&mut rng);
    let mut current_distance = route_distance(matrix, &route);
    let mut best_route = route.clone();
    let mut best_distance = current_distance;

    // With fewer than two free positions there is nothing to swap
    if n > 2 {
        let mut temperature = config.initial_temperature;
        for _ in 0..config.steps {
            let picked = index::sample(&mut rng, n - 1, 2);
            let (i, j) = (picked.index(0) + 1, picked.index(1) + 1);

            route.swap(i, j);
            let new_distance = route_distance(matrix, &route);
            let delta = new_distance - current_distance;

            if delta < 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                current_distance = new_distance;
                if new_distance < best_distance {
                    best_distance = new_distance;
                    best_route.copy_from_slice(&route);
                }
            } else {
                route.swap(i, j);
            }

            temperature *= config.cooling_rate;
            if temperature < MIN_TEMPERATURE {
                break;
            }
        }
    }

    TspSolution {
        route: best_route,
        distance: best_distance,
        elapsed: start.elapsed(),
    }
}
