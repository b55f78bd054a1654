//! # handflood algorithms
//!
//! Raster and vector algorithms for HAND flood mapping.
//!
//! ## Algorithm Categories
//!
//! - **mask**: Extract a region of interest from a raster by polygon
//! - **hydrology**: Depression filling, D8 flow direction, flow accumulation,
//!   stream network extraction, flow distance / HAND
//! - **flood**: Flood extent and flood depth at a water level
//! - **vector**: Raster to polygon conversion, smoothing, measurements

pub mod flood;
pub mod hydrology;
pub mod mask;
mod maybe_rayon;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::flood::{flood_depth, flood_extent, FloodLevel, DEFAULT_FLOOD_DEPTHS};
    pub use crate::hydrology::{
        flow_accumulation, flow_accumulation_masked, flow_direction, flow_distance, hand,
        priority_flood, stream_network, stream_threshold, FlowDistanceKind, FlowDistanceParams,
        HandParams, PriorityFloodParams, StreamNetworkParams,
    };
    pub use crate::mask::extract_by_mask;
    pub use crate::vector::{area, polygonize, smooth_polygon, PolygonizeParams, SmoothParams};
    pub use handflood_core::prelude::*;
}
