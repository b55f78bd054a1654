//! Hydrological analysis algorithms
//!
//! The D8 chain that turns a DEM into a HAND raster:
//! - Priority-Flood: O(n log n) depression filling (Barnes 2014)
//! - Flow direction: D8 single flow direction
//! - Flow accumulation: upstream contributing cells
//! - Stream network: drainage cells by accumulation threshold
//! - Flow distance: vertical or along-path distance to the drainage network
//! - HAND: Height Above Nearest Drainage (flood mapping)

mod flow_accumulation;
mod flow_direction;
mod flow_distance;
mod hand;
mod priority_flood;
mod stream_network;

pub use flow_accumulation::{flow_accumulation, flow_accumulation_masked};
pub use flow_direction::flow_direction;
pub use flow_distance::{flow_distance, FlowDistanceKind, FlowDistanceParams};
pub use hand::{hand, HandParams};
pub use priority_flood::{priority_flood, priority_flood_flat, PriorityFloodParams};
pub use stream_network::{stream_network, stream_threshold, StreamNetworkParams};
