//! Flow distance to a stream network
//!
//! For each cell, follows the D8 flow path downstream until it reaches a
//! stream cell and measures either the vertical drop to that stream cell
//! (Height Above Nearest Drainage) or the length of the path.
//!
//! With single flow direction there is exactly one downstream path per
//! cell, so the "minimum over all paths" and "the path" coincide.
//!
//! Every path is traced once: cells resolved while tracing one start cell
//! are cached and end later traces early, so the whole raster is resolved
//! in O(n).

use handflood_core::d8;
use handflood_core::raster::Raster;
use handflood_core::Result;

/// What to measure along the flow path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowDistanceKind {
    /// Elevation difference between the cell and the stream cell it drains to
    #[default]
    Vertical,
    /// Length of the D8 path to the stream, in map units
    Horizontal,
}

/// Parameters for flow distance computation
#[derive(Debug, Clone, Default)]
pub struct FlowDistanceParams {
    pub kind: FlowDistanceKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Unvisited,
    OnPath,
    Reached { stream_elev: f64, length: f64 },
    Unreachable,
}

/// Compute the flow distance from every cell to the stream network.
///
/// # Arguments
/// * `dem` - Elevation raster the flow directions were derived from
///   (normally the filled DEM)
/// * `flow_dir` - D8 flow direction raster
/// * `streams` - Stream raster, non-zero = stream cell
/// * `params` - Which distance to measure
///
/// # Returns
/// Raster<f64>: 0 on stream cells, the distance elsewhere, NaN where the
/// flow path leaves the grid, ends in a pit, runs into nodata or loops
/// before reaching a stream. Vertical distances are clamped at 0.
pub fn flow_distance(
    dem: &Raster<f64>,
    flow_dir: &Raster<u8>,
    streams: &Raster<u8>,
    params: FlowDistanceParams,
) -> Result<Raster<f64>> {
    dem.ensure_same_shape(flow_dir)?;
    dem.ensure_same_shape(streams)?;

    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();
    let mut state = vec![State::Unvisited; rows * cols];
    let mut path: Vec<(usize, usize)> = Vec::new();

    for start_row in 0..rows {
        for start_col in 0..cols {
            if state[start_row * cols + start_col] != State::Unvisited {
                continue;
            }

            path.clear();
            let (mut row, mut col) = (start_row, start_col);

            let outcome = loop {
                let idx = row * cols + col;
                match state[idx] {
                    State::Reached { stream_elev, length } => break Some((stream_elev, length)),
                    State::Unreachable | State::OnPath => break None,
                    State::Unvisited => {}
                }

                let z = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(z) {
                    state[idx] = State::Unreachable;
                    break None;
                }

                if unsafe { streams.get_unchecked(row, col) } != 0 {
                    state[idx] = State::Reached { stream_elev: z, length: 0.0 };
                    break Some((z, 0.0));
                }

                state[idx] = State::OnPath;
                path.push((row, col));

                let dir = unsafe { flow_dir.get_unchecked(row, col) };
                match d8::step(row, col, dir, rows, cols) {
                    Some((nr, nc)) => {
                        row = nr;
                        col = nc;
                    }
                    None => break None,
                }
            };

            // Resolve the traced path back to front
            match outcome {
                Some((stream_elev, mut length)) => {
                    for &(r, c) in path.iter().rev() {
                        let dir = unsafe { flow_dir.get_unchecked(r, c) };
                        length += d8::DISTANCES[dir as usize] * cell_size;
                        state[r * cols + c] = State::Reached { stream_elev, length };
                    }
                }
                None => {
                    for &(r, c) in &path {
                        state[r * cols + c] = State::Unreachable;
                    }
                }
            }
        }
    }

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));

    for (idx, cell) in output.data_mut().iter_mut().enumerate() {
        *cell = match state[idx] {
            State::Reached { stream_elev, length } => match params.kind {
                FlowDistanceKind::Vertical => {
                    let z = unsafe { dem.get_unchecked(idx / cols, idx % cols) };
                    (z - stream_elev).max(0.0)
                }
                FlowDistanceKind::Horizontal => length,
            },
            _ => f64::NAN,
        };
    }

    Ok(output)
}
