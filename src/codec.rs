use geo::{Geometry, LineString, MultiLineString};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, Value};
use itertools::Itertools;
use thiserror::Error;
use wkt::TryFromWkt;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
	#[error("malformed WKT: {0}")]
	Malformed(String),
	#[error("expected a line geometry, got {0}")]
	Unsupported(&'static str),
	#[error("a line needs at least 2 positions, got {0}")]
	Degenerate(usize),
	#[error("malformed GeoJSON: {0}")]
	GeoJson(String),
}

/// Encode a drawn line as a WKT `LINESTRING`.
///
/// Positions keep their order and are printed with the shortest text that parses back to the same `f64`,
/// so `18.0` goes on the wire as `18`.
pub fn to_wkt(line: &LineString<f64>) -> String {
	if line.0.is_empty() {
		return "LINESTRING EMPTY".to_string();
	}
	format!("LINESTRING({})", line.coords().map(|c| format!("{} {}", c.x, c.y)).join(","))
}

/// Parse a `LINESTRING` or `MULTILINESTRING`, always as a list of lines in input order.
pub fn lines_from_wkt(wkt: &str) -> Result<MultiLineString<f64>, CodecError> {
	let geometry = Geometry::<f64>::try_from_wkt_str(wkt.trim()).map_err(|e| CodecError::Malformed(e.to_string()))?;
	match geometry {
		Geometry::LineString(line) => Ok(MultiLineString::new(vec![line])),
		Geometry::MultiLineString(lines) => Ok(lines),
		other => Err(CodecError::Unsupported(wkt_type_name(&other))),
	}
}

/// Like `lines_from_wkt`, but for geometry that has to be drawn: at least one line, each with at least 2 positions.
pub fn drawable_lines_from_wkt(wkt: &str) -> Result<MultiLineString<f64>, CodecError> {
	let lines = lines_from_wkt(wkt)?;
	if lines.0.is_empty() {
		return Err(CodecError::Degenerate(0));
	}
	if let Some(short) = lines.0.iter().find(|l| l.0.len() < 2) {
		return Err(CodecError::Degenerate(short.0.len()));
	}
	Ok(lines)
}

/// WKT to a collection of individually renderable line features with empty properties.
pub fn from_wkt(wkt: &str) -> Result<FeatureCollection, CodecError> {
	Ok(lines_to_features(&lines_from_wkt(wkt)?, &JsonObject::new()))
}

pub fn lines_to_features(lines: &MultiLineString<f64>, properties: &JsonObject) -> FeatureCollection {
	FeatureCollection {
		bbox: None,
		features: lines.0.iter().map(|line| line_feature(line, properties.clone())).collect(),
		foreign_members: None,
	}
}

pub fn line_feature(line: &LineString<f64>, properties: JsonObject) -> Feature {
	Feature {
		bbox: None,
		geometry: Some(geojson::Geometry::new(Value::LineString(line.coords().map(|c| vec![c.x, c.y]).collect()))),
		id: None,
		properties: Some(properties),
		foreign_members: None,
	}
}

/// Build a drawable line, rejecting non-finite positions and lines shorter than 2 positions.
pub fn line_from_coords(coords: Vec<(f64, f64)>) -> Result<LineString<f64>, CodecError> {
	if coords.len() < 2 {
		return Err(CodecError::Degenerate(coords.len()));
	}
	if let Some((x, y)) = coords.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
		return Err(CodecError::GeoJson(format!("non-finite position ({}, {})", x, y)));
	}
	Ok(LineString::from(coords))
}

/// Extract the single drawn line from a GeoJSON document.
///
/// Accepts a bare `LineString` geometry, a `Feature` holding one, or a `FeatureCollection` with exactly one such feature.
pub fn line_from_geojson(gj: &GeoJson) -> Result<LineString<f64>, CodecError> {
	match gj {
		GeoJson::Geometry(g) => line_from_value(&g.value),
		GeoJson::Feature(f) => line_from_feature(f),
		GeoJson::FeatureCollection(fc) => {
			let f = fc.features.iter().exactly_one().map_err(|rest| CodecError::GeoJson(format!("expected exactly one feature, got {}", rest.count())))?;
			line_from_feature(f)
		}
	}
}

fn line_from_feature(f: &Feature) -> Result<LineString<f64>, CodecError> {
	let g = f.geometry.as_ref().ok_or_else(|| CodecError::GeoJson("feature has no geometry".to_string()))?;
	line_from_value(&g.value)
}

fn line_from_value(value: &Value) -> Result<LineString<f64>, CodecError> {
	match value {
		Value::LineString(positions) => {
			let coords = positions.iter().map(|p| match p.as_slice() {
				[x, y, ..] => Ok((*x, *y)),
				_ => Err(CodecError::GeoJson(format!("position with {} ordinates", p.len()))),
			}).collect::<Result<Vec<_>, _>>()?;
			line_from_coords(coords)
		}
		Value::Point(_) => Err(CodecError::Unsupported("Point")),
		Value::MultiPoint(_) => Err(CodecError::Unsupported("MultiPoint")),
		Value::MultiLineString(_) => Err(CodecError::Unsupported("MultiLineString")),
		Value::Polygon(_) => Err(CodecError::Unsupported("Polygon")),
		Value::MultiPolygon(_) => Err(CodecError::Unsupported("MultiPolygon")),
		Value::GeometryCollection(_) => Err(CodecError::Unsupported("GeometryCollection")),
	}
}

fn wkt_type_name(g: &Geometry<f64>) -> &'static str {
	match g {
		Geometry::Point(_) => "POINT",
		Geometry::Line(_) => "LINE",
		Geometry::LineString(_) => "LINESTRING",
		Geometry::Polygon(_) => "POLYGON",
		Geometry::MultiPoint(_) => "MULTIPOINT",
		Geometry::MultiLineString(_) => "MULTILINESTRING",
		Geometry::MultiPolygon(_) => "MULTIPOLYGON",
		Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
		Geometry::Rect(_) => "RECT",
		Geometry::Triangle(_) => "TRIANGLE",
	}
}
