//! I/O operations for reading and writing geospatial data
//!
//! - GeoTIFF rasters through the `tiff` crate
//! - GeoJSON vectors through the `geojson` crate

mod geojson_io;
mod geotiff;

pub use geojson_io::{
    read_geojson_polygons, read_geojson_polygons_from_str, to_feature_collection,
    write_geojson,
};
pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    GeoTiffOptions,
};
