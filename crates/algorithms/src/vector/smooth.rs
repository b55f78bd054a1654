//! Polygon smoothing
//!
//! Polygons traced from raster cells follow the stair-step pattern of the
//! grid. Chaikin corner cutting rounds them off: every iteration replaces
//! each vertex by two points at 1/4 and 3/4 along its adjacent segments.

use geo::{ChaikinSmoothing, Polygon};

/// Parameters for polygon smoothing
#[derive(Debug, Clone)]
pub struct SmoothParams {
    /// Number of corner-cutting passes. 0 leaves the polygon unchanged.
    pub iterations: usize,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self { iterations: 2 }
    }
}

/// Smooth a polygon's rings with Chaikin's algorithm.
///
/// Interior rings that end up with fewer than 4 coordinates are dropped.
pub fn smooth_polygon(polygon: &Polygon<f64>, params: SmoothParams) -> Polygon<f64> {
    if params.iterations == 0 {
        return polygon.clone();
    }

    let smoothed = polygon.chaikin_smoothing(params.iterations);
    let (exterior, interiors) = smoothed.into_inner();
    let interiors = interiors
        .into_iter()
        .filter(|ring| ring.0.len() >= 4)
        .collect();

    Polygon::new(exterior, interiors)
}
