//! # handflood core
//!
//! Core types and I/O for HAND flood mapping.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `d8`: The D8 flow direction encoding shared by all hydrology steps
//! - `Feature` / `FeatureCollection`: Attributed vector output
//! - I/O for GeoTIFF rasters and GeoJSON vectors

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{d8, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{d8, GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
