//! Upload parsing and export encoding.
//!
//! Networks travel as GeoJSON `FeatureCollection`s of `LineString`s (or WKT
//! for export), points as CSV with a header row.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::domain::{Edge, SnappedPoint};
use crate::error::{Result, TspError};
use crate::geometry::Coord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One uploaded point before integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

impl PointRow {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            lon,
            lat,
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Parses a GeoJSON `FeatureCollection` of `LineString` features.
///
/// # Examples
///
/// ```
/// use network_tsp::formats::parse_network_geojson;
///
/// let body = br#"{"type":"FeatureCollection","features":[
///     {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[0,1]]}}
/// ]}"#;
/// let edges = parse_network_geojson(body).unwrap();
/// assert_eq!(edges.len(), 1);
/// assert_eq!(edges[0].vertex_count(), 2);
/// ```
pub fn parse_network_geojson(bytes: &[u8]) -> Result<Vec<Edge>> {
    let text = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| TspError::Format(format!("network file is not valid UTF-8: {}", e)))?;

    let geojson: GeoJson = text
        .parse()
        .map_err(|e| TspError::Format(format!("invalid GeoJSON: {}", e)))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(TspError::Format(
            "network must be a GeoJSON FeatureCollection".to_string(),
        ));
    };
    if collection.features.is_empty() {
        return Err(TspError::Format(
            "FeatureCollection has no features".to_string(),
        ));
    }

    collection
        .features
        .iter()
        .enumerate()
        .map(|(idx, feature)| feature_to_edge(idx, feature))
        .collect()
}

fn feature_to_edge(idx: usize, feature: &Feature) -> Result<Edge> {
    let invalid = |why: &str| TspError::Format(format!("feature {}: {}", idx, why));

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| invalid("missing geometry"))?;
    let Value::LineString(positions) = &geometry.value else {
        return Err(invalid("geometry must be a LineString"));
    };
    if positions.len() < 2 {
        return Err(invalid("LineString needs at least 2 coordinates"));
    }

    let coords = positions
        .iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat, ..] => Ok(Coord::new(*lon, *lat)),
            _ => Err(invalid("position needs longitude and latitude")),
        })
        .collect::<Result<Vec<_>>>()?;

    Edge::new(coords).map_err(|e| invalid(&e.to_string()))
}

fn line_string(coords: &[Coord]) -> Geometry {
    Geometry::new(Value::LineString(
        coords.iter().map(|c| vec![c.lon, c.lat]).collect(),
    ))
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Encodes the network as a `FeatureCollection` of `LineString`s.
pub fn network_to_geojson(edges: &[Edge]) -> FeatureCollection {
    collection(
        edges
            .iter()
            .map(|e| feature(line_string(e.coords()), JsonObject::new()))
            .collect(),
    )
}

/// Encodes snapped positions as `Point` features carrying `id` and
/// `distance_to_edge`.
pub fn points_to_geojson(points: &[SnappedPoint]) -> FeatureCollection {
    collection(
        points
            .iter()
            .map(|p| {
                let mut props = JsonObject::new();
                props.insert("id".to_string(), p.id.clone().into());
                props.insert("distance_to_edge".to_string(), p.distance_to_edge.into());
                props.insert("distance_meters".to_string(), p.distance_meters.into());
                let point = Geometry::new(Value::Point(vec![p.snapped.lon, p.snapped.lat]));
                feature(point, props)
            })
            .collect(),
    )
}

/// Encodes a single route polyline as a GeoJSON `LineString` geometry.
pub fn route_to_geojson(coords: &[Coord]) -> Geometry {
    line_string(coords)
}

/// Column positions resolved from a CSV header.
struct PointColumns {
    id: usize,
    lat: usize,
    lon: usize,
}

impl PointColumns {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        match (
            find(&["id", "point_id"]),
            find(&["lat", "latitude"]),
            find(&["lon", "lng", "longitude"]),
        ) {
            (Some(id), Some(lat), Some(lon)) => Ok(Self { id, lat, lon }),
            _ => Err(TspError::Format(
                "CSV must have id, lat and lon columns (e.g. id,lat,lon)".to_string(),
            )),
        }
    }
}

/// Parses a points CSV.
///
/// Header names are matched case-insensitively: `id`/`point_id`,
/// `lat`/`latitude` and `lon`/`lng`/`longitude`. Other columns are ignored.
///
/// # Examples
///
/// ```
/// use network_tsp::formats::parse_points_csv;
///
/// let rows = parse_points_csv(b"ID,Latitude,Lng\nshop,0.5,0.1\n").unwrap();
/// assert_eq!(rows[0].id, "shop");
/// assert_eq!(rows[0].lat, 0.5);
/// assert_eq!(rows[0].lon, 0.1);
/// ```
pub fn parse_points_csv(bytes: &[u8]) -> Result<Vec<PointRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(strip_bom(bytes));

    let header = reader
        .headers()
        .map_err(|e| TspError::Format(format!("unreadable CSV header: {}", e)))?
        .clone();
    let columns = PointColumns::from_header(&header)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| TspError::Format(format!("unreadable CSV row {}: {}", line + 1, e)))?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let id = field(columns.id);
        if id.is_empty() {
            return Err(TspError::Format(format!("CSV row {} has an empty id", line + 1)));
        }
        let (lat, lon) = match (field(columns.lat).parse::<f64>(), field(columns.lon).parse::<f64>()) {
            (Ok(lat), Ok(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
            _ => {
                return Err(TspError::Format(format!(
                    "invalid coordinates for id={} (lat={}, lon={})",
                    id,
                    field(columns.lat),
                    field(columns.lon)
                )))
            }
        };
        rows.push(PointRow::new(id, lon, lat));
    }
    Ok(rows)
}

/// Encodes the network as WKT.
///
/// ```
/// use network_tsp::domain::Edge;
/// use network_tsp::formats::to_wkt;
/// use network_tsp::geometry::Coord;
///
/// let edge = Edge::new(vec![Coord::new(0.0, 0.0), Coord::new(0.5, 1.0)]).unwrap();
/// assert_eq!(to_wkt(&[edge]), "MULTILINESTRING ((0 0, 0.5 1))");
/// assert_eq!(to_wkt(&[]), "MULTILINESTRING EMPTY");
/// ```
pub fn to_wkt(edges: &[Edge]) -> String {
    if edges.is_empty() {
        return "MULTILINESTRING EMPTY".to_string();
    }
    let mut out = String::from("MULTILINESTRING (");
    for (i, edge) in edges.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for (j, c) in edge.coords().iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{} {}", c.lon, c.lat);
        }
        out.push(')');
    }
    out.push(')');
    out
}
