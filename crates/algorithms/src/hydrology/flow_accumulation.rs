//! Flow accumulation algorithm
//!
//! Calculates the number of upstream cells flowing into each cell
//! based on D8 flow direction (upstream contributing area in cells).

use ndarray::Array2;
use handflood_core::d8;
use handflood_core::raster::Raster;
use handflood_core::Result;

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Each cell receives a count of all upstream cells that flow into it;
/// the cell itself is not counted, so headwater cells have 0.
///
/// # Algorithm
/// 1. Count incoming flows for each cell (in-degree)
/// 2. Start from cells with in-degree 0 (headwaters)
/// 3. Propagate downstream in topological order, accumulating counts
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();

    let downstream = |row: usize, col: usize| {
        let dir = unsafe { flow_dir.get_unchecked(row, col) };
        d8::step(row, col, dir, rows, cols)
    };

    // Step 1: in-degree (how many cells flow INTO each cell)
    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if let Some(target) = downstream(row, col) {
                in_degree[target] += 1;
            }
        }
    }

    // Step 2: headwaters
    let mut queue: Vec<(usize, usize)> = Vec::new();
    let mut accumulation = Array2::<f64>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            if in_degree[(row, col)] == 0 {
                queue.push((row, col));
            }
        }
    }

    // Step 3: topological propagation. Cells on a cycle never reach
    // in-degree 0 and keep only what arrived from outside the cycle.
    while let Some((row, col)) = queue.pop() {
        let Some(target) = downstream(row, col) else {
            continue;
        };

        accumulation[target] += accumulation[(row, col)] + 1.0;

        in_degree[target] -= 1;
        if in_degree[target] == 0 {
            queue.push(target);
        }
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = accumulation;

    Ok(output)
}

/// Flow accumulation with nodata carried over from the DEM.
///
/// Cells that are nodata in `dem` become NaN, so statistics on the result
/// (e.g. the maximum used for a stream threshold) only see valid cells.
pub fn flow_accumulation_masked(flow_dir: &Raster<u8>, dem: &Raster<f64>) -> Result<Raster<f64>> {
    dem.ensure_same_shape(flow_dir)?;

    let mut output = flow_accumulation(flow_dir)?;
    ndarray::Zip::from(output.data_mut())
        .and(dem.data())
        .for_each(|acc, &z| {
            if dem.is_nodata(z) {
                *acc = f64::NAN;
            }
        });
    output.set_nodata(Some(f64::NAN));

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction::flow_direction;
    use handflood_core::GeoTransform;

    #[test]
    fn test_flow_accumulation_linear() {
        // 1x5 strip sloping east: 0 → 1 → 2 → 3 → 4
        let mut dem = Raster::new(1, 5);
        dem.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));

        for col in 0..5 {
            dem.set(0, col, (5 - col) as f64).unwrap();
        }

        let fdir = flow_direction(&dem).unwrap();
        let acc = flow_accumulation(&fdir).unwrap();

        assert_eq!(acc.get(0, 0).unwrap(), 0.0); // Headwater
        assert_eq!(acc.get(0, 1).unwrap(), 1.0);
        assert_eq!(acc.get(0, 2).unwrap(), 2.0);
        assert_eq!(acc.get(0, 3).unwrap(), 3.0);
        assert_eq!(acc.get(0, 4).unwrap(), 4.0); // Outlet
    }

    #[test]
    fn test_flow_accumulation_convergent() {
        //  5 5 5
        //  5 1 5
        //  5 5 5
        let mut dem = Raster::filled(3, 3, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        dem.set(1, 1, 1.0).unwrap();

        let fdir = flow_direction(&dem).unwrap();
        let acc = flow_accumulation(&fdir).unwrap();

        assert_eq!(acc.get(1, 1).unwrap(), 8.0, "Center should accumulate all 8 neighbors");
    }

    #[test]
    fn test_flow_accumulation_plane() {
        // 5x5 plane sloping south: each cell collects the column above it
        let mut dem = Raster::new(5, 5);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));

        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, (5 - row) as f64 * 10.0).unwrap();
            }
        }

        let fdir = flow_direction(&dem).unwrap();
        let acc = flow_accumulation(&fdir).unwrap();

        for col in 0..5 {
            assert_eq!(acc.get(0, col).unwrap(), 0.0, "Top row should have 0 accumulation");
            assert_eq!(acc.get(4, col).unwrap(), 4.0, "Bottom row collects its column");
        }
    }

    #[test]
    fn test_flow_accumulation_two_cell_cycle_terminates() {
        // 1x3: cells 0 and 1 point at each other, cell 2 points into 1
        let fdir = Raster::from_vec(vec![1u8, 5, 5], 1, 3).unwrap();
        let acc = flow_accumulation(&fdir).unwrap();

        assert_eq!(acc.get(0, 2).unwrap(), 0.0);
        assert_eq!(acc.get(0, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_flow_accumulation_masked() {
        let mut dem = Raster::new(1, 4);
        dem.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));
        for col in 0..4 {
            dem.set(0, col, (4 - col) as f64).unwrap();
        }
        dem.set(0, 3, f64::NAN).unwrap();

        let fdir = flow_direction(&dem).unwrap();
        let acc = flow_accumulation_masked(&fdir, &dem).unwrap();

        assert_eq!(acc.get(0, 2).unwrap(), 2.0);
        assert!(acc.get(0, 3).unwrap().is_nan());
        assert_eq!(acc.statistics().max, Some(2.0));
    }

    #[test]
    fn test_flow_accumulation_masked_size_mismatch() {
        let fdir = Raster::<u8>::new(3, 3);
        let dem = Raster::<f64>::new(4, 3);
        assert!(flow_accumulation_masked(&fdir, &dem).is_err());
    }
}
