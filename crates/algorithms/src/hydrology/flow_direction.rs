//! D8 flow direction algorithm
//!
//! Calculates the direction of flow from each cell to its steepest
//! downslope neighbor using the D8 (deterministic eight-node) method.
//!
//! Flow direction encoding (see [`handflood_core::d8`]):
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = pit/flat/nodata (no outflow), 1-8 = direction to steepest neighbor

use ndarray::Array2;
use crate::maybe_rayon::*;
use handflood_core::d8;
use handflood_core::raster::Raster;
use handflood_core::{Error, Result};

/// Calculate D8 flow direction from a DEM.
///
/// The input DEM should be hydrologically conditioned (depressions
/// filled) for meaningful results. The drop to each neighbor is divided by
/// the distance to it (cell size, or cell size * sqrt(2) on diagonals);
/// the steepest strictly positive drop wins, ties go to the lower code.
///
/// # Returns
/// Raster<u8> with flow direction codes; 0 for pits, flats and nodata
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();

    if cell_size.is_nan() || cell_size <= 0.0 {
        return Err(Error::invalid_param(
            "cell_size",
            cell_size,
            "raster transform must have a positive cell size",
        ));
    }

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![d8::NONE; cols];

            for col in 0..cols {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                let mut best_dir = d8::NONE;

                for dir in 1..=8u8 {
                    let Some((nr, nc)) = d8::step(row, col, dir, rows, cols) else {
                        continue;
                    };

                    let neighbor = unsafe { dem.get_unchecked(nr, nc) };
                    if dem.is_nodata(neighbor) {
                        continue;
                    }

                    let distance = d8::DISTANCES[dir as usize] * cell_size;
                    let drop = (center - neighbor) / distance;

                    if drop > max_drop {
                        max_drop = drop;
                        best_dir = dir;
                    }
                }

                row_data[col] = best_dir;
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(d8::NONE));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
