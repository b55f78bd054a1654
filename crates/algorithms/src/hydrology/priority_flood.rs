//! Priority-Flood depression filling
//!
//! O(n log n) depression filling. Cells are processed in elevation order
//! from a min-heap seeded with the edge of the valid data: the raster
//! border and every cell next to nodata. A DEM clipped to an irregular
//! boundary therefore drains to its own outline, not just to the
//! bounding box.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use ndarray::Array2;
use handflood_core::d8;
use handflood_core::raster::Raster;
use handflood_core::{Error, Result};

/// A cell in the priority queue, ordered by elevation (min-heap).
#[derive(Debug, Clone)]
struct Cell {
    elevation: f64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.elevation == other.elevation
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: lower elevation has higher priority
        other.elevation.partial_cmp(&self.elevation)
            .unwrap_or(Ordering::Equal)
    }
}

/// Parameters for Priority-Flood filling
#[derive(Debug, Clone)]
pub struct PriorityFloodParams {
    /// Minimum elevation increment enforced between a cell and the cell
    /// it was reached from. A small positive value leaves filled areas
    /// with a gradient toward their outlet so every cell gets a D8
    /// direction; 0.0 produces perfectly flat fills.
    pub epsilon: f64,
}

impl Default for PriorityFloodParams {
    fn default() -> Self {
        Self { epsilon: 1e-5 }
    }
}

/// Fill depressions in a DEM using the Priority-Flood algorithm.
///
/// # Algorithm
/// 1. Seed a min-heap with every valid cell on the raster border or
///    next to a nodata cell
/// 2. Pop the lowest cell
/// 3. For each unvisited valid neighbor:
///    output = max(neighbor_elevation, popped_elevation + epsilon)
/// 4. Repeat until the heap is empty
///
/// Filled values are never lower than the input. Nodata is preserved.
pub fn priority_flood(dem: &Raster<f64>, params: PriorityFloodParams) -> Result<Raster<f64>> {
    if !params.epsilon.is_finite() || params.epsilon < 0.0 {
        return Err(Error::invalid_param(
            "epsilon",
            params.epsilon,
            "must be finite and >= 0",
        ));
    }

    let (rows, cols) = dem.shape();
    let epsilon = params.epsilon;

    let mut output = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    let mut visited = Array2::<bool>::from_elem((rows, cols), false);
    let mut heap = BinaryHeap::new();

    let is_nd = |v: f64| dem.is_nodata(v);

    // Step 1: Seed the queue with the edge of the valid data
    for row in 0..rows {
        for col in 0..cols {
            let val = unsafe { dem.get_unchecked(row, col) };

            if is_nd(val) {
                visited[(row, col)] = true;
                continue;
            }

            let on_border = row == 0 || row == rows - 1 || col == 0 || col == cols - 1;
            let touches_nodata = !on_border
                && (1..=8u8).any(|dir| {
                    d8::step(row, col, dir, rows, cols)
                        .is_some_and(|(nr, nc)| is_nd(unsafe { dem.get_unchecked(nr, nc) }))
                });

            if on_border || touches_nodata {
                heap.push(Cell { elevation: val, row, col });
                visited[(row, col)] = true;
                output[(row, col)] = val;
            }
        }
    }

    // Step 2: Process cells in order of increasing elevation
    while let Some(cell) = heap.pop() {
        for dir in 1..=8u8 {
            let Some((nr, nc)) = d8::step(cell.row, cell.col, dir, rows, cols) else {
                continue;
            };

            if visited[(nr, nc)] {
                continue;
            }
            visited[(nr, nc)] = true;

            let neighbor_elev = unsafe { dem.get_unchecked(nr, nc) };

            // Raise cells lower than the spill elevation; keep the rest.
            let filled_elev = if neighbor_elev < cell.elevation + epsilon {
                cell.elevation + epsilon
            } else {
                neighbor_elev
            };

            output[(nr, nc)] = filled_elev;
            heap.push(Cell {
                elevation: filled_elev,
                row: nr,
                col: nc,
            });
        }
    }

    let mut result = dem.with_same_meta::<f64>(rows, cols);
    result.set_nodata(Some(f64::NAN));
    *result.data_mut() = output;

    Ok(result)
}

/// Priority-Flood with epsilon=0: filled depressions become perfectly flat.
pub fn priority_flood_flat(dem: &Raster<f64>) -> Result<Raster<f64>> {
    priority_flood(dem, PriorityFloodParams { epsilon: 0.0 })
}
