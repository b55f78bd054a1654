//! HAND: Height Above Nearest Drainage
//!
//! For each cell, traces the D8 flow path downstream until reaching a
//! stream cell (flow accumulation >= threshold), then computes the
//! elevation difference between the cell and that stream cell.
//!
//! HAND = 0 for stream cells themselves, and increases with distance
//! from the drainage network. It is a fundamental flood-mapping index.
//!
//! Reference:
//! Nobre, A.D. et al. (2011). HAND, a new terrain descriptor using
//! SRTM-DEM. *Mapping Ecology and Conservation*, 275–287.

use handflood_core::raster::Raster;
use handflood_core::Result;

use super::flow_distance::{flow_distance, FlowDistanceKind, FlowDistanceParams};
use super::stream_network::{stream_network, StreamNetworkParams};

/// Parameters for HAND computation
#[derive(Debug, Clone)]
pub struct HandParams {
    /// Flow accumulation threshold to define stream cells.
    /// Cells with accumulation >= this value are considered streams.
    /// Default: 1000.0 (cells)
    pub stream_threshold: f64,
}

impl Default for HandParams {
    fn default() -> Self {
        Self {
            stream_threshold: 1000.0,
        }
    }
}

/// Compute Height Above Nearest Drainage (HAND).
///
/// Thresholds `flow_acc` into a stream network and measures the vertical
/// flow distance of every cell to it.
///
/// # Arguments
/// * `dem` - DEM the flow directions were derived from
/// * `flow_dir` - D8 flow direction raster (from `flow_direction`)
/// * `flow_acc` - Flow accumulation raster (from `flow_accumulation`)
/// * `params` - HAND parameters (stream threshold)
///
/// # Returns
/// Raster<f64> with HAND values (meters). Stream cells have HAND = 0.
/// Cells that cannot reach a stream (e.g., pits) get NaN.
pub fn hand(
    dem: &Raster<f64>,
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    params: HandParams,
) -> Result<Raster<f64>> {
    dem.ensure_same_shape(flow_acc)?;

    let streams = stream_network(
        flow_acc,
        StreamNetworkParams {
            threshold: params.stream_threshold,
        },
    )?;

    flow_distance(
        dem,
        flow_dir,
        &streams,
        FlowDistanceParams {
            kind: FlowDistanceKind::Vertical,
        },
    )
}
