//! Flood extent and flood depth from HAND
//!
//! A cell is flooded at water level `depth` when its height above the
//! nearest drainage is at most `depth`. The water depth over a flooded
//! cell is `depth - hand`.

use ndarray::Array2;
use handflood_core::raster::Raster;
use handflood_core::{Error, Result};

use crate::maybe_rayon::*;

/// Default water levels above the drainage network, in meters
pub const DEFAULT_FLOOD_DEPTHS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// A water level above the drainage network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodLevel {
    pub depth: f64,
}

impl FloodLevel {
    pub fn new(depth: f64) -> Self {
        Self { depth }
    }

    /// Depth formatted for file names: one decimal, point replaced by an
    /// underscore (0.5 → `0_5`, 2 → `2_0`)
    pub fn label(&self) -> String {
        format!("{:.1}", self.depth).replace('.', "_")
    }
}

impl From<f64> for FloodLevel {
    fn from(depth: f64) -> Self {
        Self::new(depth)
    }
}

fn check_depth(depth: f64) -> Result<()> {
    if !depth.is_finite() || depth < 0.0 {
        return Err(Error::invalid_param("depth", depth, "must be finite and >= 0"));
    }
    Ok(())
}

fn map_rows<T, F>(hand: &Raster<f64>, f: F) -> Result<Array2<T>>
where
    T: Send,
    F: Fn(f64) -> T + Sync,
{
    let (rows, cols) = hand.shape();
    let values: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| f(unsafe { hand.get_unchecked(row, col) }))
                .collect::<Vec<T>>()
        })
        .collect();

    Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::Other(e.to_string()))
}

/// Flood extent at water level `depth`.
///
/// # Returns
/// Raster<u8> with 1 where `hand <= depth`, 0 elsewhere. Nodata and NaN
/// cells are never flooded. Output nodata is 0.
pub fn flood_extent(hand: &Raster<f64>, depth: f64) -> Result<Raster<u8>> {
    check_depth(depth)?;

    let data = map_rows(hand, |h| u8::from(!hand.is_nodata(h) && h <= depth))?;

    let (rows, cols) = hand.shape();
    let mut output = hand.with_same_meta::<u8>(rows, cols);
    *output.data_mut() = data;
    output.set_nodata(Some(0));
    Ok(output)
}

/// Water depth at water level `depth`.
///
/// # Returns
/// Raster<f64> with `depth - hand` inside the flood extent and NaN
/// elsewhere.
pub fn flood_depth(hand: &Raster<f64>, depth: f64) -> Result<Raster<f64>> {
    check_depth(depth)?;

    let data = map_rows(hand, |h| {
        if !hand.is_nodata(h) && h <= depth {
            depth - h
        } else {
            f64::NAN
        }
    })?;

    let (rows, cols) = hand.shape();
    let mut output = hand.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = data;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hand_raster() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.0, 0.4, 0.5, 1.2, f64::NAN, 3.0], 2, 3).unwrap();
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_label() {
        assert_eq!(FloodLevel::new(0.5).label(), "0_5");
        assert_eq!(FloodLevel::new(1.0).label(), "1_0");
        assert_eq!(FloodLevel::new(1.5).label(), "1_5");
        assert_eq!(FloodLevel::from(2.0).label(), "2_0");
    }

    #[test]
    fn test_flood_extent_threshold_inclusive() {
        let extent = flood_extent(&hand_raster(), 0.5).unwrap();
        let values: Vec<u8> = extent.data().iter().copied().collect();
        assert_eq!(values, vec![1, 1, 1, 0, 0, 0]);
        assert_eq!(extent.nodata(), Some(0));
    }

    #[test]
    fn test_flood_extent_grows_with_depth() {
        let hand = hand_raster();
        let mut previous = 0;
        for &depth in &DEFAULT_FLOOD_DEPTHS {
            let count = flood_extent(&hand, depth)
                .unwrap()
                .data()
                .iter()
                .filter(|&&v| v == 1)
                .count();
            assert!(count >= previous, "Extent shrank at depth {}", depth);
            previous = count;
        }
        assert_eq!(previous, 4);
    }

    #[test]
    fn test_flood_depth() {
        let depth = flood_depth(&hand_raster(), 1.5).unwrap();
        assert_relative_eq!(depth.get(0, 0).unwrap(), 1.5);
        assert_relative_eq!(depth.get(0, 1).unwrap(), 1.1, epsilon = 1e-12);
        assert_relative_eq!(depth.get(1, 0).unwrap(), 0.3, epsilon = 1e-12);
        assert!(depth.get(1, 1).unwrap().is_nan());
        assert!(depth.get(1, 2).unwrap().is_nan());
    }

    #[test]
    fn test_rejects_bad_depth() {
        assert!(flood_extent(&hand_raster(), -0.5).is_err());
        assert!(flood_extent(&hand_raster(), f64::INFINITY).is_err());
        assert!(flood_depth(&hand_raster(), f64::NAN).is_err());
    }
}
