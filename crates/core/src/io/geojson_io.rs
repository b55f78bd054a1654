//! GeoJSON reading (boundary masks) and writing (flood polygons)

use crate::error::{Error, Result};
use crate::vector::{Feature, FeatureCollection};
use geo_types::{MultiPolygon, Polygon};
use geojson::feature::Id;
use geojson::{GeoJson, Geometry, JsonObject, PolygonType, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Read every Polygon / MultiPolygon of a GeoJSON file into one MultiPolygon.
///
/// Accepts a FeatureCollection, a single Feature or a bare geometry
/// (including GeometryCollection). Other geometry types are skipped.
pub fn read_geojson_polygons<P: AsRef<Path>>(path: P) -> Result<MultiPolygon<f64>> {
    let text = fs::read_to_string(path.as_ref())?;
    read_geojson_polygons_from_str(&text)
}

/// Same as [`read_geojson_polygons`] for an in-memory document
pub fn read_geojson_polygons_from_str(text: &str) -> Result<MultiPolygon<f64>> {
    let geojson: GeoJson = text.parse()?;

    let mut polygons = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.into_iter().filter_map(|f| f.geometry) {
                collect_polygons(geometry.value, &mut polygons)?;
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = feature.geometry {
                collect_polygons(geometry.value, &mut polygons)?;
            }
        }
        GeoJson::Geometry(geometry) => collect_polygons(geometry.value, &mut polygons)?,
    }

    if polygons.is_empty() {
        return Err(Error::Vector("GeoJSON contains no polygon geometry".into()));
    }
    Ok(MultiPolygon::new(polygons))
}

fn collect_polygons(value: Value, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    match value {
        Value::Polygon(rings) => out.push(to_polygon(rings)?),
        Value::MultiPolygon(parts) => {
            for rings in parts {
                out.push(to_polygon(rings)?);
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_polygons(geometry.value, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// The geo-types conversion indexes x and y directly, so short positions
/// and degenerate rings are rejected first.
fn to_polygon(rings: PolygonType) -> Result<Polygon<f64>> {
    if rings.is_empty() {
        return Err(Error::Vector("Polygon without exterior ring".into()));
    }
    for ring in &rings {
        if ring.len() < 3 {
            return Err(Error::Vector(format!(
                "ring needs at least 3 positions, got {}",
                ring.len()
            )));
        }
        if let Some(position) = ring.iter().find(|p| p.len() < 2) {
            return Err(Error::Vector(format!("invalid position: {:?}", position)));
        }
    }
    Ok(Polygon::<f64>::try_from(Value::Polygon(rings))?)
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: feature.geometry.as_ref().map(|g| Geometry::new(Value::from(g))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert a collection to a GeoJSON FeatureCollection
pub fn to_feature_collection(collection: &FeatureCollection) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: collection.iter().map(to_geojson_feature).collect(),
        foreign_members: None,
    }
}

/// Write a collection as a GeoJSON FeatureCollection file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let fc = to_feature_collection(collection);
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(&mut writer, &fc)?;
    writer.flush()?;
    Ok(())
}
