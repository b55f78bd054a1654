//! Stream network extraction
//!
//! Extracts a stream network from a flow accumulation raster by
//! thresholding: cells with accumulation >= threshold are classified
//! as stream cells (1), all others as non-stream (0).
//!
//! The threshold is usually derived from the highest accumulation in the
//! study area: between 0.3% and 1% of the maximum gives a stream network of
//! useful density for HAND.

use ndarray::Zip;
use handflood_core::raster::Raster;
use handflood_core::{Error, Result};

/// Parameters for stream network extraction
#[derive(Debug, Clone)]
pub struct StreamNetworkParams {
    /// Flow accumulation threshold (in cell counts).
    /// Cells with accumulation >= this value are classified as streams.
    /// Default: 1000.0
    pub threshold: f64,
}

impl Default for StreamNetworkParams {
    fn default() -> Self {
        Self { threshold: 1000.0 }
    }
}

/// Accumulation threshold as a fraction of the maximum accumulation.
///
/// `fraction` must lie in (0, 1]. The maximum is truncated to whole cells
/// before scaling and the result rounded to the nearest cell count, ties
/// to even.
pub fn stream_threshold(max_accumulation: f64, fraction: f64) -> Result<f64> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::invalid_param(
            "stream_fraction",
            fraction,
            "must be in (0, 1]",
        ));
    }
    if !max_accumulation.is_finite() || max_accumulation < 0.0 {
        return Err(Error::invalid_param(
            "max_accumulation",
            max_accumulation,
            "must be finite and >= 0",
        ));
    }

    Ok((max_accumulation.trunc() * fraction).round_ties_even())
}

/// Extract stream network from flow accumulation.
///
/// # Returns
/// Raster<u8> with 1 = stream cell, 0 = non-stream cell (NaN accumulation
/// is never a stream)
pub fn stream_network(flow_acc: &Raster<f64>, params: StreamNetworkParams) -> Result<Raster<u8>> {
    if params.threshold.is_nan() {
        return Err(Error::invalid_param("threshold", params.threshold, "must be a number"));
    }

    let (rows, cols) = flow_acc.shape();
    let threshold = params.threshold;

    let mut output = flow_acc.with_same_meta::<u8>(rows, cols);
    Zip::from(output.data_mut())
        .and(flow_acc.data())
        .for_each(|s, &acc| {
            if !acc.is_nan() && acc >= threshold {
                *s = 1;
            }
        });
    output.set_nodata(Some(0));

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::{flow_accumulation, flow_direction, priority_flood_flat};
    use handflood_core::GeoTransform;

    fn south_slope(n: usize) -> Raster<f64> {
        let mut dem = Raster::new(n, n);
        dem.set_transform(GeoTransform::new(0.0, n as f64, 1.0, -1.0));
        for row in 0..n {
            for col in 0..n {
                dem.set(row, col, (n - row) as f64 * 10.0).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_stream_threshold() {
        assert_eq!(stream_threshold(12345.0, 0.01).unwrap(), 123.0);
        assert_eq!(stream_threshold(12345.9, 0.003).unwrap(), 37.0);
        assert_eq!(stream_threshold(99.0, 1.0).unwrap(), 99.0);
        assert_eq!(stream_threshold(40.0, 0.01).unwrap(), 0.0);
        assert_eq!(stream_threshold(5.0, 0.5).unwrap(), 2.0);
        assert_eq!(stream_threshold(7.0, 0.5).unwrap(), 4.0);
    }

    #[test]
    fn test_stream_threshold_rejects_bad_fraction() {
        assert!(stream_threshold(100.0, 0.0).is_err());
        assert!(stream_threshold(100.0, 1.5).is_err());
        assert!(stream_threshold(100.0, f64::NAN).is_err());
        assert!(stream_threshold(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_stream_network_threshold() {
        let dem = south_slope(10);
        let filled = priority_flood_flat(&dem).unwrap();
        let fdir = flow_direction(&filled).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();

        let streams = stream_network(&facc, StreamNetworkParams { threshold: 5.0 }).unwrap();

        for col in 0..10 {
            assert_eq!(streams.get(0, col).unwrap(), 0, "Top row is not a stream at col {}", col);
        }
        assert_eq!(streams.get(9, 5).unwrap(), 1, "Bottom center should be stream");
    }

    #[test]
    fn test_stream_network_binary_output() {
        let dem = south_slope(5);
        let fdir = flow_direction(&dem).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();
        let streams = stream_network(&facc, StreamNetworkParams { threshold: 2.0 }).unwrap();

        assert!(streams.data().iter().all(|&v| v == 0 || v == 1));
    }

    #[test]
    fn test_stream_network_high_threshold_no_streams() {
        let dem = south_slope(5);
        let fdir = flow_direction(&dem).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();

        let streams = stream_network(&facc, StreamNetworkParams::default()).unwrap();
        assert!(streams.data().iter().all(|&v| v == 0), "No streams expected");
    }

    #[test]
    fn test_stream_network_ignores_nan() {
        let facc = Raster::from_vec(vec![f64::NAN, 10.0, 0.0, 3.0], 2, 2).unwrap();
        let streams = stream_network(&facc, StreamNetworkParams { threshold: 0.0 }).unwrap();
        assert_eq!(streams.data().iter().copied().collect::<Vec<_>>(), vec![0, 1, 1, 1]);
    }
}
