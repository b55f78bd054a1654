//! Vector algorithms
//!
//! - Polygonize: raster regions to polygons
//! - Smooth: Chaikin corner cutting of traced outlines
//! - Area / Perimeter: geometric measurements

mod measurements;
mod polygonize;
mod smooth;

pub use measurements::{area, perimeter, total_area};
pub use polygonize::{polygonize, PolygonizeParams};
pub use smooth::{smooth_polygon, SmoothParams};
