//! Geometric measurements: area, perimeter

use geo::{Area as GeoArea, Euclidean, Length, Polygon};

/// Unsigned area of a polygon, holes excluded, in map units squared.
pub fn area(polygon: &Polygon<f64>) -> f64 {
    polygon.unsigned_area()
}

/// Total area of a set of polygons.
pub fn total_area<'a>(polygons: impl IntoIterator<Item = &'a Polygon<f64>>) -> f64 {
    polygons.into_iter().map(area).sum()
}

/// Total length of exterior and interior rings.
pub fn perimeter(polygon: &Polygon<f64>) -> f64 {
    let ext = Euclidean.length(polygon.exterior());
    let int: f64 = polygon
        .interiors()
        .iter()
        .map(|r| Euclidean.length(r))
        .sum();
    ext + int
}
