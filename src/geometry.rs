//! Geometry primitives for snapping and routing.
//!
//! Coordinates are `(longitude, latitude)` pairs in degrees, in GeoJSON axis
//! order. Nearest-edge search and projection work in the planar lon/lat space;
//! edge weights and reported lengths use the haversine great-circle distance.

use geo::{Closest, ClosestPoint, Distance, Euclidean, Haversine, Line, LineLocatePoint, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic coordinate.
///
/// Serialized as a `[lon, lat]` array. Equality is exact: two coordinates are
/// the same graph vertex only if both components match bit for bit (modulo
/// signed zero).
///
/// # Examples
///
/// ```
/// use network_tsp::geometry::Coord;
///
/// let c = Coord::new(2.35, 48.85);
/// assert_eq!(serde_json::to_string(&c).unwrap(), "[2.35,48.85]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both components are finite.
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Planar distance in degrees, treating lon as x and lat as y.
    pub fn planar_distance(&self, other: &Coord) -> f64 {
        Euclidean.distance(Point::from(*self), Point::from(*other))
    }

    /// Great-circle distance in meters.
    pub fn distance_meters(&self, other: &Coord) -> f64 {
        haversine_distance(*self, *other)
    }
}

impl From<[f64; 2]> for Coord {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coord> for [f64; 2] {
    fn from(c: Coord) -> Self {
        [c.lon, c.lat]
    }
}

impl From<Coord> for geo::Coord {
    fn from(c: Coord) -> Self {
        geo::coord! { x: c.lon, y: c.lat }
    }
}

impl From<Coord> for Point {
    fn from(c: Coord) -> Self {
        Point::new(c.lon, c.lat)
    }
}

impl From<Point> for Coord {
    fn from(p: Point) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

/// Haversine distance between two coordinates in meters.
///
/// # Examples
///
/// ```
/// use network_tsp::geometry::{haversine_distance, Coord};
///
/// // 1 degree of latitude is about 111 km
/// let d = haversine_distance(Coord::new(0.0, 0.0), Coord::new(0.0, 1.0));
/// assert!(d > 111_000.0 && d < 111_400.0);
/// ```
pub fn haversine_distance(a: Coord, b: Coord) -> f64 {
    if a == b {
        return 0.0;
    }
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Total great-circle length of a polyline in meters.
pub fn polyline_length(coords: &[Coord]) -> f64 {
    coords
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

/// Projects `p` onto the segment `a`-`b`.
///
/// Returns the closest point on the segment and the clamped parameter `t` in
/// `[0, 1]`. A zero-length segment projects everything onto `a`.
pub fn project_onto_segment(p: Coord, a: Coord, b: Coord) -> (Coord, f64) {
    if a == b {
        return (a, 0.0);
    }

    let line = Line::new(a, b);
    let query = Point::from(p);
    let t = line.line_locate_point(&query).unwrap_or(0.0);
    let projected = if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        match line.closest_point(&query) {
            Closest::Intersection(c) | Closest::SinglePoint(c) => Coord::from(c),
            Closest::Indeterminate => a,
        }
    };
    (projected, t.clamp(0.0, 1.0))
}

/// Planar perpendicular distance from `p` to the segment `a`-`b`.
///
/// # Examples
///
/// ```
/// use network_tsp::geometry::{distance_to_segment, Coord};
///
/// let d = distance_to_segment(Coord::new(1.0, 0.5), Coord::new(0.0, 0.0), Coord::new(0.0, 1.0));
/// assert!((d - 1.0).abs() < 1e-12);
/// ```
pub fn distance_to_segment(p: Coord, a: Coord, b: Coord) -> f64 {
    let (projected, _) = project_onto_segment(p, a, b);
    p.planar_distance(&projected)
}

/// Closest point on a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineProjection {
    /// Projected coordinate.
    pub point: Coord,
    /// Planar distance from the query point to `point`.
    pub distance: f64,
    /// Index of the segment (`coords[segment]`-`coords[segment + 1]`) holding `point`.
    pub segment: usize,
    /// Position of `point` along that segment, in `[0, 1]`.
    pub t: f64,
}

/// Projects `p` onto a polyline.
///
/// Zero-length segments are skipped. Ties keep the earliest segment. Returns
/// `None` when the polyline has no segment of non-zero length.
pub fn project_onto_polyline(p: Coord, coords: &[Coord]) -> Option<PolylineProjection> {
    let mut best: Option<PolylineProjection> = None;

    for (segment, w) in coords.windows(2).enumerate() {
        if w[0] == w[1] {
            continue;
        }
        let (point, t) = project_onto_segment(p, w[0], w[1]);
        let distance = p.planar_distance(&point);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(PolylineProjection {
                point,
                distance,
                segment,
                t,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_symmetry_and_zero() {
        let a = Coord::new(-75.1635, 39.9526);
        let b = Coord::new(-75.1503, 39.9496);
        assert_eq!(haversine_distance(a, a), 0.0);
        assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-9);
        // Philadelphia City Hall to Liberty Bell, ~1.2 km
        assert!((haversine_distance(a, b) - 1200.0).abs() < 100.0);
    }

    #[test]
    fn test_projection_interior() {
        let (p, t) = project_onto_segment(
            Coord::new(0.5, 0.25),
            Coord::new(0.0, 0.0),
            Coord::new(0.0, 1.0),
        );
        assert_eq!(p, Coord::new(0.0, 0.25));
        assert_eq!(t, 0.25);
    }

    #[test]
    fn test_projection_onto_diagonal_is_perpendicular_foot() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(2.0, 2.0);
        let (p, t) = project_onto_segment(Coord::new(0.0, 2.0), a, b);
        assert!((p.lon - 1.0).abs() < 1e-12 && (p.lat - 1.0).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);
        let d = distance_to_segment(Coord::new(0.0, 2.0), a, b);
        assert!((d - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_projection_clamps_to_endpoints() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 0.0);
        assert_eq!(project_onto_segment(Coord::new(-3.0, 1.0), a, b).0, a);
        assert_eq!(project_onto_segment(Coord::new(4.0, -1.0), a, b).0, b);
    }

    #[test]
    fn test_zero_length_segment() {
        let a = Coord::new(1.0, 1.0);
        let (p, t) = project_onto_segment(Coord::new(2.0, 2.0), a, a);
        assert_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_polyline_projection_picks_closest_segment() {
        let line = [
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 1.0),
        ];
        let proj = project_onto_polyline(Coord::new(1.2, 0.6), &line).unwrap();
        assert_eq!(proj.segment, 1);
        assert!((proj.point.lat - 0.6).abs() < 1e-12);
        assert!((proj.distance - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_projection_skips_degenerate() {
        let a = Coord::new(3.0, 3.0);
        assert!(project_onto_polyline(Coord::new(0.0, 0.0), &[a, a, a]).is_none());
    }

    #[test]
    fn test_polyline_length() {
        let line = [
            Coord::new(0.0, 0.0),
            Coord::new(0.0, 0.5),
            Coord::new(0.0, 1.0),
        ];
        let whole = haversine_distance(line[0], line[2]);
        assert!((polyline_length(&line) - whole).abs() < 1e-6);
    }

    #[test]
    fn test_coord_json_array() {
        let c: Coord = serde_json::from_str("[1.5, -2.25]").unwrap();
        assert_eq!(c, Coord::new(1.5, -2.25));
    }
}
