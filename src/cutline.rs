//! Cutline polygons given as GeoJSON, validated when the request is read.
//!
//! A cutline both masks the output (pixels outside become no-data) and
//! defines the output extent through its bounding box; both happen on the
//! GDAL side once the normalized document is read back by the vector driver.
//! Accepted inputs are a bare `Polygon` or `MultiPolygon` geometry, a
//! `Feature` wrapping one, or a `FeatureCollection` of such features.

use serde_json::{json, Value};

use crate::error::{HeightmapError, Result};

pub type Ring = Vec<(f64, f64)>;

/// One polygon: an exterior ring followed by zero or more holes.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CutlinePolygon {
    pub polygons: Vec<Polygon>,
    /// CRS named by the document's `crs` member, if any.
    pub crs: Option<String>,
}

impl CutlinePolygon {
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let crs = value
            .pointer("/crs/properties/name")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut polygons = Vec::new();
        collect_polygons(value, &mut polygons)?;
        if polygons.is_empty() {
            return Err(HeightmapError::invalid("cutline contains no polygons"));
        }

        Ok(Self { polygons, crs })
    }

    /// Normalized single-feature collection, as handed to the vector driver.
    pub fn to_geojson(&self) -> Value {
        let coordinates: Vec<Value> = self
            .polygons
            .iter()
            .map(|p| {
                let rings: Vec<Value> = std::iter::once(&p.exterior)
                    .chain(p.holes.iter())
                    .map(|ring| {
                        closed(ring)
                            .iter()
                            .map(|&(x, y)| json!([x, y]))
                            .collect::<Value>()
                    })
                    .collect();
                Value::Array(rings)
            })
            .collect();

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "MultiPolygon", "coordinates": coordinates }
            }]
        });
        if let Some(crs) = &self.crs {
            collection["crs"] = json!({ "type": "name", "properties": { "name": crs } });
        }
        collection
    }
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon>) -> Result<()> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| HeightmapError::invalid("cutline is missing a GeoJSON type"))?;

    match kind {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| HeightmapError::invalid("cutline features are missing"))?;
            for feature in features {
                collect_polygons(feature, out)?;
            }
        }
        "Feature" => {
            let geometry = value
                .get("geometry")
                .filter(|g| !g.is_null())
                .ok_or_else(|| HeightmapError::invalid("cutline feature has no geometry"))?;
            collect_polygons(geometry, out)?;
        }
        "Polygon" => out.push(parse_polygon(coordinates(value)?)?),
        "MultiPolygon" => {
            let parts = coordinates(value)?
                .as_array()
                .ok_or_else(|| HeightmapError::invalid("MultiPolygon coordinates must be an array"))?;
            for part in parts {
                out.push(parse_polygon(part)?);
            }
        }
        other => {
            return Err(HeightmapError::invalid(format!(
                "cutline geometry must be polygonal, got {}",
                other
            )))
        }
    }
    Ok(())
}

fn coordinates(value: &Value) -> Result<&Value> {
    value
        .get("coordinates")
        .ok_or_else(|| HeightmapError::invalid("cutline geometry has no coordinates"))
}

fn parse_polygon(value: &Value) -> Result<Polygon> {
    let rings = value
        .as_array()
        .ok_or_else(|| HeightmapError::invalid("Polygon coordinates must be an array of rings"))?;
    let mut rings = rings.iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(HeightmapError::invalid("Polygon has no rings"));
    }
    let exterior = rings.remove(0);
    Ok(Polygon {
        exterior,
        holes: rings,
    })
}

fn parse_ring(value: &Value) -> Result<Ring> {
    let positions = value
        .as_array()
        .ok_or_else(|| HeightmapError::invalid("ring must be an array of positions"))?;

    let mut ring = Ring::with_capacity(positions.len());
    for position in positions {
        let x = position.get(0).and_then(Value::as_f64);
        let y = position.get(1).and_then(Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => ring.push((x, y)),
            _ => return Err(HeightmapError::invalid("ring position must be [x, y]")),
        }
    }
    if ring.first() == ring.last() && ring.len() > 1 {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(HeightmapError::invalid("ring needs at least three distinct positions"));
    }
    Ok(ring)
}

fn closed(ring: &Ring) -> Ring {
    let mut ring = ring.clone();
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}
